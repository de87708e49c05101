pub mod config;
pub mod csv;
pub mod email_checker;
pub mod spreadsheet;
