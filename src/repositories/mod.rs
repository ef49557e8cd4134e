//! Storage traits and their in-memory implementations.
//!
//! Workers and the mock queue backend depend only on the traits; the
//! in-memory implementations back local development and tests. Each store
//! is a `Mutex`-protected `HashMap` for thread safety in async contexts.

mod article;
mod business;
mod idea;
mod integration;
mod job;

pub use article::*;
pub use business::*;
pub use idea::*;
pub use integration::*;
pub use job::*;
