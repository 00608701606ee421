pub mod bridge;
pub mod cli;
pub mod config;
pub mod error;
pub mod server;
pub mod state;
pub mod telemetry;

pub use bridge::MessagingBridge;
pub use cli::Cli;
pub use config::ServerConfig;
pub use error::{Error, Result};
pub use server::*;
pub use state::AppState;
