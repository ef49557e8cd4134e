mod base64;
pub use base64::*;

mod encryption;
pub use encryption::*;

mod markdown;
pub use markdown::*;
