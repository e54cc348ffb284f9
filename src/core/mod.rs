//! Core types shared across sdrsync
//!
//! This module contains the fundamental building blocks used throughout the library.

pub mod config;
pub mod error;
pub mod types;

pub use self::config::{Config, EndpointConfig};
pub use self::error::{Error, Result};
pub use self::types::{Hz, Side};

/// Largest reply read in one receive call
pub const MAX_REPLY_BYTES: usize = 1024;

/// Floor for the poll interval, so a misconfigured near-zero value
/// cannot turn the loop into a busy spin
pub const MIN_POLL_INTERVAL_MS: u64 = 20;
