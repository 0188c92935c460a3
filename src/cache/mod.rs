pub mod cache_key;
pub mod token;
pub mod token_cache;
