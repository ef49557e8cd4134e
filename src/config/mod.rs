//! Application configuration, read once at startup from the environment.

mod server_config;
pub use server_config::*;
