pub mod common;
pub mod file_cache;
pub mod tasks;
