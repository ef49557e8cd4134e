//! Queue consumers.
//!
//! Each queue is polled by a set of identical workers. A worker pulls a
//! batch of messages, decodes each envelope, and drives the handler for
//! that queue through the retry protocol in [`retry`]: leases are extended
//! before every attempt, failed attempts back off exponentially, and a
//! message is deleted once its outcome is settled.

mod generator;
mod pool;
mod publisher;
mod retry;

pub use generator::*;
pub use pool::*;
pub use publisher::*;
pub use retry::*;
