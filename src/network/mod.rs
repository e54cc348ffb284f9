//! Network management module
//!
//! This module owns the TCP plumbing: opening a connection with a bounded
//! connect, timed line send/receive, and best-effort close.

mod connection;

pub use self::connection::Connection;
