pub mod arena;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod high_score_store;
pub mod rng;
pub mod server_protocol;
pub mod server_utils;
pub mod session;
pub mod types;
