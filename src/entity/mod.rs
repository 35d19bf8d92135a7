pub mod performance;
pub mod user;
