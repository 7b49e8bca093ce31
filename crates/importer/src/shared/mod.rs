pub mod config;
pub mod format;
pub mod formula;
pub mod table;
