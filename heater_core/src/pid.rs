//! Fixed-point PID step for graduated (PWM) channels.
//!
//! Per accepted sample:
//! 1. `error = target - current`
//! 2. `p = error * P / SCALE_P`
//! 3. `integrator = clamp(integrator + error, ±i_limit)`, the anti-windup
//! 4. `i = integrator * I / SCALE_I`
//! 5. `d = (oldest_in_window - current) * D / SCALE_D`
//! 6. `output = clamp(p + i + d, 0, 255)`
//!
//! Saturating the output in step 6 never feeds back into step 3; only the
//! integrator clamp limits windup.

use crate::fixed_point::{SCALE_D, SCALE_I, SCALE_P, clamp_output, scaled_term};
use crate::gains::PidGains;
use crate::history::TempHistory;

/// Terms of the most recent computation, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PidTerms {
    pub error: i32,
    pub p: i64,
    pub i: i64,
    pub d: i64,
    pub output: u8,
}

impl PidTerms {
    /// Unclamped controller sum.
    pub const fn raw(&self) -> i64 {
        self.p + self.i + self.d
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PidState {
    integrator: i16,
    history: TempHistory,
}

impl PidState {
    pub const fn new() -> Self {
        Self {
            integrator: 0,
            history: TempHistory::new(),
        }
    }

    #[inline]
    pub const fn integrator(&self) -> i16 {
        self.integrator
    }

    /// True when the integrator sits on either clamp.
    pub const fn integrator_saturated(&self, i_limit: i16) -> bool {
        self.integrator == i_limit || self.integrator == -i_limit
    }

    pub fn step(&mut self, gains: &PidGains, current: u16, target: u16) -> PidTerms {
        let error = i32::from(target) - i32::from(current);
        let p = scaled_term(error, gains.p, SCALE_P);

        let limit = i32::from(gains.i_limit.max(0));
        let integ = (i32::from(self.integrator) + error).clamp(-limit, limit);
        // |integ| <= i16::MAX
        self.integrator = integ as i16;
        let i = scaled_term(integ, gains.i, SCALE_I);

        let oldest = self.history.push(current);
        let d = scaled_term(i32::from(oldest) - i32::from(current), gains.d, SCALE_D);

        PidTerms {
            error,
            p,
            i,
            d,
            output: clamp_output(p + i + d),
        }
    }

    /// Bring the integrator inside a (possibly reduced) limit.
    pub fn clamp_integrator(&mut self, i_limit: i16) {
        let limit = i_limit.max(0);
        self.integrator = self.integrator.clamp(-limit, limit);
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
