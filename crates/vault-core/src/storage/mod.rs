//! Key-value backends for vault persistence
//!
//! This module provides three backends:
//! 1. In-memory (tests and throwaway sessions)
//! 2. JSON file in the user's data directory
//! 3. OS keychain

mod traits;
mod memory;
mod file;
mod keychain;

pub use traits::KeyValueStore;
pub use memory::MemoryStore;
pub use file::FileStore;
pub use keychain::KeychainStore;
