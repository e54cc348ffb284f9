use crate::core::{Hz, Side};
use tracing::debug;

/// Per-side slot: last observed value and the stamp of its last real change
#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    /// Last observed frequency, if any
    last: Option<Hz>,
    /// Tick stamp of the last change; 0 means "never changed"
    last_change: u64,
}

/// Tracks the last known frequency and last-change stamp per side and
/// decides, when the two sides diverge, which one moved most recently.
///
/// Stamps are tick numbers rather than wall-clock instants: the engine calls
/// [`begin_tick`](Self::begin_tick) once per poll iteration and every change
/// observed within that iteration carries the same stamp. Two sides changing
/// in the same tick is therefore a true tie and resolves to the primary,
/// which keeps the sync direction deterministic even on the very first pair
/// of samples after startup.
#[derive(Debug)]
pub struct ChangeTracker {
    /// Minimum Hz delta that counts as a change
    threshold: Hz,
    primary: Slot,
    secondary: Slot,
    /// Current tick number; 0 until the first `begin_tick`
    tick: u64,
}

impl ChangeTracker {
    /// Creates a tracker with both sides unknown
    pub fn new(threshold: Hz) -> Self {
        ChangeTracker {
            threshold,
            primary: Slot::default(),
            secondary: Slot::default(),
            tick: 0,
        }
    }

    /// Advances the tick clock; call once per poll iteration, before any
    /// `record` of that iteration
    pub fn begin_tick(&mut self) {
        self.tick += 1;
    }

    /// Records an observation for one side. The slot's change stamp advances
    /// iff there was no previous value or the delta reaches the threshold;
    /// the stored value is always overwritten.
    pub fn record(&mut self, side: Side, value: Hz) {
        let stamp = self.tick.max(1);
        let threshold = self.threshold;

        let slot = self.slot_mut(side);
        let changed = match slot.last {
            None => true,
            Some(old) => value.abs_diff(old) >= threshold,
        };
        if changed {
            debug!(
                "{} changed: {:?} -> {} ({:?} Hz)",
                side,
                slot.last,
                value,
                slot.last.map(|old| value.abs_diff(old))
            );
            slot.last_change = stamp;
        }
        slot.last = Some(value);
    }

    /// The side whose last change is most recent, or `None` when neither side
    /// has ever changed. Ties resolve to the primary, which is checked first.
    pub fn side_of_most_recent_change(&self) -> Option<Side> {
        if self.primary.last_change == 0 && self.secondary.last_change == 0 {
            return None;
        }
        if self.primary.last_change >= self.secondary.last_change {
            Some(Side::Primary)
        } else {
            Some(Side::Secondary)
        }
    }

    fn slot_mut(&mut self, side: Side) -> &mut Slot {
        match side {
            Side::Primary => &mut self.primary,
            Side::Secondary => &mut self.secondary,
        }
    }
}
