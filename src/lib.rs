pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod fuzzy;
pub mod indexer;
pub mod models;
pub mod provider;
pub mod ranker;
pub mod utils;
