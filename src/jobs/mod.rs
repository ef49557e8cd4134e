//! Job definitions and the producer used to enqueue them.
//!
//! Every job travels as a tagged JSON envelope; the tag tells the consumer
//! which message type follows, so decoding is a single step with no
//! second-guessing about payload shape.

mod envelope;
mod producer;

pub use envelope::*;
pub use producer::*;
