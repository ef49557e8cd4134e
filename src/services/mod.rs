//! External service clients.
//!
//! `ai` talks to the content agent that drafts ideas and articles; `cms`
//! pushes finished posts to the user's WordPress site. Both expose traits
//! so workers can be tested against mocks.

mod ai;
mod cms;

pub use ai::*;
pub use cms::*;
