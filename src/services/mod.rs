pub mod booking;
pub mod catalog;
pub mod clients;
pub mod import;
pub mod realtime;
