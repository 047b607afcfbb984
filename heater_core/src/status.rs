//! Per-tick reports and operator-facing snapshots.

use core::fmt;

use crate::fixed_point::qc_to_celsius;
use crate::gains::PidGains;
use crate::pid::PidTerms;
use crate::sanity::SanityState;
use crate::types::HeaterId;

/// Outcome of one heater's tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub heater: HeaterId,
    /// Logical output after any fault override (before polarity inversion).
    pub output: u8,
    /// False when the sample was rejected and the previous output held.
    pub accepted: bool,
    pub sanity: SanityState,
    /// This tick moved the heater into `Faulted`.
    pub fault_raised: bool,
}

/// Aggregate of one pass over every heater.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub ticked: usize,
    pub rejected_samples: usize,
    pub faulted: usize,
    pub faults_raised: usize,
    /// Heaters whose tick failed (actuator write); the others still ran.
    pub errors: usize,
}

/// Sent upward once, when a heater enters `Faulted`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultReport {
    pub heater: HeaterId,
    pub name: String,
    /// Last accepted reading, qC.
    pub temperature: Option<u16>,
    pub sane_temperature: Option<u16>,
    /// Suspect ticks counted when the fault latched.
    pub ticks: u32,
}

impl fmt::Display for FaultReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "heater {} ({}) faulted after {} implausible ticks",
            self.name, self.heater, self.ticks
        )?;
        if let Some(t) = self.temperature {
            write!(f, " at {:.2}C", qc_to_celsius(t))?;
        }
        Ok(())
    }
}

/// Point-in-time view of one heater for reporting surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaterStatus {
    pub id: HeaterId,
    pub name: String,
    pub temperature: Option<u16>,
    pub target: u16,
    pub output: u8,
    pub pwm: bool,
    pub integrator: i16,
    pub sanity: SanityState,
    pub sanity_counter: u32,
    pub sane_temperature: Option<u16>,
    pub gains: PidGains,
    /// Last PID computation, kept even while the output is forced off.
    pub last_terms: Option<PidTerms>,
}

impl HeaterStatus {
    /// Output as a fraction of full scale.
    pub fn duty(&self) -> f32 {
        let max = if self.pwm { 255.0 } else { 1.0 };
        f32::from(self.output) / max
    }
}

impl fmt::Display for HeaterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.temperature {
            Some(t) => write!(f, "{} T:{:.2}", self.name, qc_to_celsius(t))?,
            None => write!(f, "{} T:--", self.name)?,
        }
        write!(
            f,
            " /{:.2} @:{} I:{} sanity:{}",
            qc_to_celsius(self.target),
            self.output,
            self.integrator,
            self.sanity
        )?;
        if self.sanity_counter > 0 {
            write!(f, "({})", self.sanity_counter)?;
        }
        Ok(())
    }
}
