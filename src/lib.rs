//! sdrsync: keeps two RigCTL frequency endpoints in agreement
//!
//! Polls a panadapter front-end and a receiver controller over the RigCTL
//! line protocol and pushes the most-recently-changed frequency to the other
//! side, reconnecting as needed until cancelled.

pub mod core;
pub mod network;
pub mod protocol;
pub mod sync;

// Re-export commonly used items
pub use self::core::{Config, Error, Result};
pub use self::sync::SyncEngine;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
