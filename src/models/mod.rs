pub mod usermodel;
pub mod ticketmodel;
pub mod jobmodel;
pub mod contractormodel;
pub mod connectionmodel;
