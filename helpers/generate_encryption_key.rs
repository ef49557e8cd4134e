//! Encryption Key Generation Tool
//!
//! Generates a random 32-byte base64-encoded encryption key for the
//! `STORAGE_ENCRYPTION_KEY` environment variable and prints it.
//!
//! Equivalent to:
//!
//! ```bash
//! openssl rand -base64 32
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --example generate_encryption_key
//! ```
use draftpress::utils::FieldEncryption;
use eyre::Result;

fn main() -> Result<()> {
    println!(
        "Generated new encryption key: {}",
        FieldEncryption::generate_key()
    );
    Ok(())
}
