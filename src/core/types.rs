use std::fmt;

/// Frequency in Hz. Radio frequencies fit comfortably in 64 bits.
pub type Hz = u64;

/// One logical side of the sync pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The panadapter front-end; queried first every tick and the
    /// tie-break winner when neither side has a recorded change.
    Primary,
    /// The receiver controller
    Secondary,
}

impl Side {
    /// Returns the opposite side
    pub fn other(&self) -> Side {
        match self {
            Side::Primary => Side::Secondary,
            Side::Secondary => Side::Primary,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Primary => write!(f, "primary"),
            Side::Secondary => write!(f, "secondary"),
        }
    }
}
