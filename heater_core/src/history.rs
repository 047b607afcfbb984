//! Fixed-capacity temperature history feeding the derivative term.

use crate::fixed_point::TH_COUNT;

/// Ring buffer of the last `TH_COUNT` accepted samples.
///
/// Cold start: the first push fills every slot with that sample, so the
/// derivative reads zero until real history accumulates instead of seeing a
/// jump from 0 qC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempHistory {
    slots: [u16; TH_COUNT],
    pos: usize,
    primed: bool,
}

impl Default for TempHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl TempHistory {
    pub const fn new() -> Self {
        Self {
            slots: [0; TH_COUNT],
            pos: 0,
            primed: false,
        }
    }

    /// Store `sample`, returning the sample it evicted (the one taken
    /// `TH_COUNT` pushes ago).
    #[inline]
    pub fn push(&mut self, sample: u16) -> u16 {
        if !self.primed {
            self.slots = [sample; TH_COUNT];
            self.primed = true;
        }
        let oldest = self.slots[self.pos];
        self.slots[self.pos] = sample;
        self.pos = (self.pos + 1) % TH_COUNT;
        oldest
    }

    pub const fn is_primed(&self) -> bool {
        self.primed
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}
