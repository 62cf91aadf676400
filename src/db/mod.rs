pub mod db;
pub mod localdb;
pub mod pgdb;
pub mod snapshot;
