//! Distribution endpoint
//!
//! Read and mutate the fleet state over HTTP, long-poll for the next change,
//! or hold a WebSocket open to have every change pushed.

pub mod config;
pub mod error;
pub mod listener;
pub mod routes;
pub mod ws;

pub use config::ServerConfig;
pub use error::ApiError;
pub use listener::ConfigServer;
pub use routes::{router, AppState, RadioView};
