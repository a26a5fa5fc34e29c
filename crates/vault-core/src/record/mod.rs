//! Credential records and the collection the vault encrypts

mod duplicates;
mod types;

pub use duplicates::{duplicate_urls, DuplicateUrls};
pub use types::{Record, VaultCollection};
