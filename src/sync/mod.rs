//! Synchronization module
//!
//! This module holds the change-tracking bookkeeping and the engine loop that
//! keeps the two endpoints tuned to the same frequency.

pub mod engine;
pub mod tracker;

pub use self::engine::SyncEngine;
pub use self::tracker::ChangeTracker;
