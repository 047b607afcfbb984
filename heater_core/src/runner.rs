//! Periodic tick loop.
//!
//! One pass over all heaters per tick period. Deadlines are absolute
//! (`start + k * period`), so a slow pass is followed by a shorter sleep
//! instead of drifting; a pass that ends past its deadline is counted as a
//! missed deadline and the next pass starts immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use heater_traits::{Actuator, Clock, TemperatureSource};

use crate::array::HeaterArray;
use crate::status::TickSummary;
use crate::util::{as_micros_u64, tick_period};

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Stop after this many passes; `None` runs until shutdown.
    pub max_ticks: Option<u64>,
    /// Sleep to the next deadline. Off for faster-than-real-time simulation.
    pub paced: bool,
    /// Command every heater off when the loop exits.
    pub off_on_exit: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_ticks: None,
            paced: true,
            off_on_exit: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub missed_deadlines: u64,
    pub max_latency: Duration,
    pub mean_latency: Duration,
    /// Heaters faulted at the end of the run.
    pub faulted: usize,
    /// Faults raised during the run.
    pub faults_raised: u64,
    pub rejected_samples: u64,
    pub errors: u64,
}

/// Drive `array` until `shutdown` is set or `opts.max_ticks` passes ran.
///
/// `on_tick` sees every pass summary; the CLI uses it for progress output.
pub fn run<S, A, C, F>(
    array: &HeaterArray,
    sensors: &mut S,
    actuator: &mut A,
    clock: &C,
    shutdown: &AtomicBool,
    opts: RunOptions,
    mut on_tick: F,
) -> LoopStats
where
    S: TemperatureSource + ?Sized,
    A: Actuator + ?Sized,
    C: Clock + ?Sized,
    F: FnMut(u64, &TickSummary),
{
    let period = tick_period(array.control().tick_ms);
    let mut stats = LoopStats::default();
    let mut total_latency_us: u128 = 0;
    let mut deadline = clock.now() + period;

    tracing::info!(heaters = array.len(), period_ms = array.control().tick_ms, paced = opts.paced, "tick loop start");

    while !shutdown.load(Ordering::Relaxed) && opts.max_ticks.is_none_or(|n| stats.ticks < n) {
        let started = clock.now();
        let summary = array.tick_all(sensors, actuator);
        let finished = clock.now();

        let latency = finished.saturating_duration_since(started);
        stats.ticks += 1;
        stats.max_latency = stats.max_latency.max(latency);
        total_latency_us += u128::from(as_micros_u64(latency));
        stats.faults_raised += summary.faults_raised as u64;
        stats.rejected_samples += summary.rejected_samples as u64;
        stats.errors += summary.errors as u64;
        on_tick(stats.ticks, &summary);

        if opts.paced {
            if finished > deadline {
                stats.missed_deadlines += 1;
                tracing::debug!(tick = stats.ticks, late_us = as_micros_u64(finished - deadline), "tick deadline missed");
                deadline = finished;
            } else {
                clock.sleep_until(deadline);
            }
            deadline += period;
        }
    }

    if stats.ticks > 0 {
        let mean_us = total_latency_us / u128::from(stats.ticks);
        stats.mean_latency = Duration::from_micros(u64::try_from(mean_us).unwrap_or(u64::MAX));
    }
    stats.faulted = array.faulted().count();

    if opts.off_on_exit {
        if let Err(e) = array.all_off(actuator) {
            tracing::error!(error = %e, "failed to switch heaters off at loop exit");
        }
    }
    tracing::info!(ticks = stats.ticks, missed = stats.missed_deadlines, faulted = stats.faulted, "tick loop stop");
    stats
}
