//! Protocol implementation module
//!
//! This module implements the RigCTL line protocol: one newline-terminated
//! command per exchange, `f` to query the frequency and `F <hz>` to set it.

pub mod codec;

pub use self::codec::{
    encode_get_frequency, encode_set_frequency, is_set_acknowledged, parse_frequency,
};
