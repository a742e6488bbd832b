//! Library half of the `timelock` binary: configuration and the command
//! handlers, kept out of `main.rs` so they can be tested against a
//! temporary LMDB environment.

pub mod app;
pub mod config;

pub use app::{App, PositionView, StatusReport};
pub use config::{CliConfig, ConfigError};
