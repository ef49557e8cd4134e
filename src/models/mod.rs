//! Domain entities and shared application state.

mod app_state;
pub use app_state::*;

mod article;
pub use article::*;

mod business;
pub use business::*;

mod error;
pub use error::*;

mod idea;
pub use idea::*;

mod integration;
pub use integration::*;

mod job;
pub use job::*;
