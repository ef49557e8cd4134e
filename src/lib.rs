//! Content Job Processing Library
//!
//! This library provides the asynchronous job-processing backbone of a
//! content-marketing service: generating article ideas for a business and
//! publishing finished articles to the business's CMS. It includes:
//!
//! - A queue abstraction over a lease-based message broker
//! - A polling worker pool with retries, backoff, and lease extension
//! - Clients for the content agent and WordPress
//!
//! # Module Structure
//!
//! - `config`: Configuration management
//! - `constants`: Shared constant values
//! - `init`: Startup wiring for state, queue, and workers
//! - `jobs`: Job envelopes and the producer
//! - `logging`: Logging setup
//! - `models`: Domain entities and their state machines
//! - `queue`: Queue service trait and backends
//! - `repositories`: Storage traits and in-memory implementations
//! - `services`: Content agent and CMS clients
//! - `utils`: Encryption, encoding, and markdown helpers
//! - `workers`: Queue consumers

pub mod config;
pub mod constants;
pub mod init;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod queue;
pub mod repositories;
pub mod services;
pub mod utils;
pub mod workers;
