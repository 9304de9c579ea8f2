pub mod alignment;
pub mod config;
pub mod encoding;
pub mod errors;
pub mod inference;
pub mod infra;
pub mod runner;
pub mod state;
