pub mod error;
pub mod lifecycle;
pub mod matching_service;
pub mod projection;
pub mod ticket_service;
