//! This module contains all the constant values used in the system
mod content;
pub use content::*;

mod worker;
pub use worker::*;
