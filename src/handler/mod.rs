pub mod connections;
pub mod contractors;
pub mod jobs;
pub mod tickets;
