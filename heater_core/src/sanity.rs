//! Plausibility watchdog: does the temperature follow what we command?
//!
//! Each tick is classified against the output just computed for it and the
//! previous reading:
//!
//! - heating up (output on, target more than `band` above the reading): the
//!   reading must climb, otherwise the tick is suspect. A climbing reading
//!   becomes the new sane temperature, capped at the target;
//! - commanded off: a reading that keeps climbing more than `band` above the
//!   sane temperature is suspect; cooling moves the sane temperature down;
//! - regulating near target: the reading is accepted as sane.
//!
//! More than `tolerance_ticks` suspect ticks in a row latch the fault. Only
//! [`SanityWatchdog::reset`] clears it.

use core::fmt;

use crate::fixed_point::ticks_for_ms;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanityState {
    Sane,
    Suspect,
    Faulted,
}

impl SanityState {
    pub const fn as_str(self) -> &'static str {
        match self {
            SanityState::Sane => "sane",
            SanityState::Suspect => "suspect",
            SanityState::Faulted => "faulted",
        }
    }
}

impl fmt::Display for SanityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanityWatchdog {
    counter: u32,
    sane_temperature: Option<u16>,
    last_reading: Option<u16>,
    tolerance_ticks: u32,
    band: u16,
    faulted: bool,
}

impl SanityWatchdog {
    pub const fn new(tolerance_ticks: u32, band: u16) -> Self {
        Self {
            counter: 0,
            sane_temperature: None,
            last_reading: None,
            tolerance_ticks,
            band,
            faulted: false,
        }
    }

    /// Tolerance sized from the heater's dead-time: the number of ticks it
    /// covers, rounded up and at least `min_ticks`, plus `margin_ticks`.
    pub fn for_dead_time(
        dead_time_ms: u64,
        tick_ms: u64,
        min_ticks: u32,
        margin_ticks: u32,
        band: u16,
    ) -> Self {
        let ticks = ticks_for_ms(dead_time_ms, tick_ms, min_ticks).saturating_add(margin_ticks);
        Self::new(ticks, band)
    }

    /// Classify one accepted reading. `commanded` is the output freshly
    /// computed for this tick, before any fault override.
    pub fn observe(&mut self, current: u16, target: u16, commanded: u8) -> SanityState {
        if self.faulted {
            return SanityState::Faulted;
        }
        let sane = *self.sane_temperature.get_or_insert(current);
        let rising = self.last_reading.is_some_and(|last| current > last);
        self.last_reading = Some(current);
        let band = i32::from(self.band);
        let (cur, tgt) = (i32::from(current), i32::from(target));

        if commanded > 0 && tgt > cur + band {
            if rising {
                self.accept(current.min(target));
            } else {
                self.suspect();
            }
        } else if commanded == 0 {
            if rising && cur > i32::from(sane) + band {
                self.suspect();
            } else {
                self.accept(current.min(sane));
            }
        } else {
            self.accept(current.min(target));
        }
        self.state()
    }

    /// A rejected sample gives no evidence the heater is under control.
    pub fn observe_invalid(&mut self) -> SanityState {
        if !self.faulted {
            self.suspect();
        }
        self.state()
    }

    fn accept(&mut self, temperature: u16) {
        self.sane_temperature = Some(temperature);
        self.counter = 0;
    }

    fn suspect(&mut self) {
        self.counter = self.counter.saturating_add(1);
        if self.counter > self.tolerance_ticks {
            self.faulted = true;
        }
    }

    pub const fn state(&self) -> SanityState {
        if self.faulted {
            SanityState::Faulted
        } else if self.counter == 0 {
            SanityState::Sane
        } else {
            SanityState::Suspect
        }
    }

    pub const fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub const fn counter(&self) -> u32 {
        self.counter
    }

    pub const fn sane_temperature(&self) -> Option<u16> {
        self.sane_temperature
    }

    pub const fn tolerance_ticks(&self) -> u32 {
        self.tolerance_ticks
    }

    /// Forget all history and clear a latched fault. Tolerance and band stay.
    pub fn reset(&mut self) {
        self.counter = 0;
        self.sane_temperature = None;
        self.last_reading = None;
        self.faulted = false;
    }
}
