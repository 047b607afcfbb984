//! Mutable per-heater state and the per-tick control step.

use heater_traits::TempSample;

use crate::bang_bang;
use crate::config::HeaterSpec;
use crate::error::HeaterError;
use crate::gains::{GainKind, PidGains};
use crate::pid::{PidState, PidTerms};
use crate::sanity::{SanityState, SanityWatchdog};

/// Result of [`HeaterRuntime::step`], before the array attaches the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub output: u8,
    pub accepted: bool,
    pub sanity: SanityState,
    pub fault_raised: bool,
}

/// Everything that changes while a heater runs. Gains live here too, so a
/// gain update and the arithmetic that consumes it are serialized by the
/// same per-heater lock.
#[derive(Debug, Clone)]
pub struct HeaterRuntime {
    gains: PidGains,
    pid: PidState,
    output: u8,
    last_temperature: Option<u16>,
    last_terms: Option<PidTerms>,
    sanity: Option<SanityWatchdog>,
}

impl HeaterRuntime {
    pub fn new(gains: PidGains, sanity: Option<SanityWatchdog>) -> Self {
        Self {
            gains,
            pid: PidState::new(),
            output: 0,
            last_temperature: None,
            last_terms: None,
            sanity,
        }
    }

    /// Run one control step for `sample`. Never blocks or allocates.
    pub fn step(
        &mut self,
        spec: &HeaterSpec,
        bang_bang_threshold: u16,
        sample: TempSample,
        target: u16,
    ) -> Step {
        let was_faulted = self.is_faulted();

        let Some(current) = sample.usable() else {
            if let Some(w) = self.sanity.as_mut() {
                w.observe_invalid();
            }
            if self.is_faulted() {
                self.output = 0;
            }
            return self.finish(false, was_faulted);
        };

        self.last_temperature = Some(current);
        let computed = if spec.pwm {
            let terms = self.pid.step(&self.gains, current, target);
            self.last_terms = Some(terms);
            terms.output
        } else {
            bang_bang::decide(current, target, bang_bang_threshold, self.output)
        };

        if let Some(w) = self.sanity.as_mut() {
            w.observe(current, target, computed);
        }
        self.output = if self.is_faulted() { 0 } else { computed };
        self.finish(true, was_faulted)
    }

    fn finish(&self, accepted: bool, was_faulted: bool) -> Step {
        Step {
            output: self.output,
            accepted,
            sanity: self.sanity_state(),
            fault_raised: !was_faulted && self.is_faulted(),
        }
    }

    /// Store an externally chosen output, bounded to what the channel takes.
    /// A faulted heater stays off.
    pub fn force_output(&mut self, value: u8, max: u8) -> u8 {
        self.output = if self.is_faulted() { 0 } else { value.min(max) };
        self.output
    }

    /// Replace one gain. Lowering `i_limit` pulls the integrator inside the
    /// new bound immediately.
    pub fn set_gain(&mut self, kind: GainKind, value: i64) -> Result<(), HeaterError> {
        self.gains = self.gains.with(kind, value)?;
        if kind == GainKind::ILimit {
            self.pid.clamp_integrator(self.gains.i_limit);
        }
        Ok(())
    }

    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
        self.pid.clamp_integrator(gains.i_limit);
    }

    /// Clear integrator, history, output and sanity state. Gains are kept.
    pub fn reset(&mut self) {
        self.pid.reset();
        self.output = 0;
        self.last_temperature = None;
        self.last_terms = None;
        if let Some(w) = self.sanity.as_mut() {
            w.reset();
        }
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn output(&self) -> u8 {
        self.output
    }

    pub fn integrator(&self) -> i16 {
        self.pid.integrator()
    }

    pub fn last_temperature(&self) -> Option<u16> {
        self.last_temperature
    }

    pub fn last_terms(&self) -> Option<PidTerms> {
        self.last_terms
    }

    pub fn sanity(&self) -> Option<&SanityWatchdog> {
        self.sanity.as_ref()
    }

    /// Without a watchdog a heater is always reported sane.
    pub fn sanity_state(&self) -> SanityState {
        self.sanity
            .as_ref()
            .map_or(SanityState::Sane, SanityWatchdog::state)
    }

    pub fn is_faulted(&self) -> bool {
        self.sanity.as_ref().is_some_and(SanityWatchdog::is_faulted)
    }
}
