pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod ingest;
pub mod server;
