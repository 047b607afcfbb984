//! The heater array: owns every heater's runtime state and drives ticks.
//!
//! Locking is per heater. A tick holds one heater's lock only while that
//! heater's step runs; actuator writes and fault reporting happen after the
//! lock is released. Targets are atomics so a command context can change
//! them without touching the lock at all.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{Sender, TrySendError};
use heater_traits::{Actuator, TempSample, TemperatureSource};

use crate::config::{ControlCfg, HeaterSpec, SanityCfg};
use crate::error::{HeaterError, Result};
use crate::hw_error::map_hw_error;
use crate::runtime::HeaterRuntime;
use crate::sanity::{SanityState, SanityWatchdog};
use crate::settings::GainStore;
use crate::status::{FaultReport, HeaterStatus, TickReport, TickSummary};
use crate::types::HeaterId;

pub struct HeaterArray {
    pub(crate) specs: Box<[HeaterSpec]>,
    pub(crate) runtimes: Box<[Mutex<HeaterRuntime>]>,
    pub(crate) targets: Box<[AtomicU16]>,
    pub(crate) control: ControlCfg,
    pub(crate) sanity: SanityCfg,
    pub(crate) store: Box<dyn GainStore + Send + Sync>,
    pub(crate) fault_tx: Option<Sender<FaultReport>>,
}

impl core::fmt::Debug for HeaterArray {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HeaterArray")
            .field(
                "heaters",
                &self.specs.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            )
            .field("control", &self.control)
            .field("sanity", &self.sanity)
            .finish_non_exhaustive()
    }
}

impl HeaterArray {
    // ── Identity ─────────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// All heater ids in tick order.
    pub fn ids(&self) -> impl Iterator<Item = HeaterId> + '_ {
        (0..self.specs.len()).filter_map(HeaterId::from_index)
    }

    pub fn id_of(&self, name: &str) -> Option<HeaterId> {
        self.specs
            .iter()
            .position(|s| s.name == name)
            .and_then(HeaterId::from_index)
    }

    pub fn spec(&self, id: HeaterId) -> Result<&HeaterSpec> {
        self.specs
            .get(id.index())
            .ok_or_else(|| eyre::Report::new(HeaterError::UnknownHeater(id.raw())))
    }

    pub fn control(&self) -> &ControlCfg {
        &self.control
    }

    pub(crate) fn lock(&self, id: HeaterId) -> Result<MutexGuard<'_, HeaterRuntime>> {
        let cell = self
            .runtimes
            .get(id.index())
            .ok_or_else(|| eyre::Report::new(HeaterError::UnknownHeater(id.raw())))?;
        // A panic while holding the lock cannot leave the runtime torn: every
        // field is plain data updated in place.
        Ok(cell.lock().unwrap_or_else(PoisonError::into_inner))
    }

    // ── Targets ──────────────────────────────────────────────────────────────

    pub fn set_target(&self, id: HeaterId, target_qc: u16) -> Result<()> {
        self.target_cell(id)?.store(target_qc, Ordering::Relaxed);
        Ok(())
    }

    pub fn target(&self, id: HeaterId) -> Result<u16> {
        Ok(self.target_cell(id)?.load(Ordering::Relaxed))
    }

    fn target_cell(&self, id: HeaterId) -> Result<&AtomicU16> {
        self.targets
            .get(id.index())
            .ok_or_else(|| eyre::Report::new(HeaterError::UnknownHeater(id.raw())))
    }

    // ── Control ──────────────────────────────────────────────────────────────

    /// Run one control step for a heater and forward the result to the
    /// actuator. `target` is also recorded as the heater's target.
    pub fn tick<A: Actuator + ?Sized>(
        &self,
        id: HeaterId,
        sample: TempSample,
        target: u16,
        actuator: &mut A,
    ) -> Result<TickReport> {
        self.set_target(id, target)?;
        self.tick_inner(id, sample, target, actuator)
    }

    // Leaves the target cell alone so a concurrent `set_target` is never
    // overwritten by the value loaded for this pass.
    fn tick_inner<A: Actuator + ?Sized>(
        &self,
        id: HeaterId,
        sample: TempSample,
        target: u16,
        actuator: &mut A,
    ) -> Result<TickReport> {
        let spec = self.spec(id)?;
        let (step, fault) = {
            let mut rt = self.lock(id)?;
            let step = rt.step(spec, self.control.bang_bang_threshold, sample, target);
            let fault = step.fault_raised.then(|| FaultReport {
                heater: id,
                name: spec.name.clone(),
                temperature: rt.last_temperature(),
                sane_temperature: rt.sanity().and_then(SanityWatchdog::sane_temperature),
                ticks: rt.sanity().map_or(0, SanityWatchdog::counter),
            });
            (step, fault)
        };

        if !step.accepted {
            tracing::debug!(heater = %spec.name, sensor = sample.kind.name(), value = ?sample.value_qc, "sample rejected; holding output");
        }
        if let Some(report) = fault {
            self.raise_fault(report);
        }

        drive(spec, step.output, actuator)?;
        Ok(TickReport {
            heater: id,
            output: step.output,
            accepted: step.accepted,
            sanity: step.sanity,
            fault_raised: step.fault_raised,
        })
    }

    /// One pass over every heater in id order using the stored targets.
    /// A failing heater is logged and counted; the rest still run.
    pub fn tick_all<S, A>(&self, sensors: &mut S, actuator: &mut A) -> TickSummary
    where
        S: TemperatureSource + ?Sized,
        A: Actuator + ?Sized,
    {
        let mut summary = TickSummary::default();
        for (idx, id) in self.ids().enumerate() {
            let sample = sensors.sample(idx);
            let target = self.targets[idx].load(Ordering::Relaxed);
            match self.tick_inner(id, sample, target, actuator) {
                Ok(r) => {
                    summary.ticked += 1;
                    summary.rejected_samples += usize::from(!r.accepted);
                    summary.faulted += usize::from(r.sanity == SanityState::Faulted);
                    summary.faults_raised += usize::from(r.fault_raised);
                }
                Err(e) => {
                    summary.errors += 1;
                    tracing::warn!(heater = %self.specs[idx].name, error = %e, "heater tick failed");
                }
            }
        }
        summary
    }

    /// Set a heater's logical output and forward it to the actuator. The
    /// value is bounded to the channel (1 for on/off); a faulted heater is
    /// kept at 0.
    pub fn set_output<A: Actuator + ?Sized>(
        &self,
        id: HeaterId,
        value: u8,
        actuator: &mut A,
    ) -> Result<u8> {
        let spec = self.spec(id)?;
        let stored = self.lock(id)?.force_output(value, spec.max_output());
        drive(spec, stored, actuator)?;
        Ok(stored)
    }

    /// Command every heater off. Attempts all heaters, returns the first error.
    pub fn all_off<A: Actuator + ?Sized>(&self, actuator: &mut A) -> Result<()> {
        let mut first_err = None;
        for id in self.ids() {
            if let Err(e) = self.set_output(id, 0, actuator) {
                tracing::warn!(heater = %id, error = %e, "failed to switch heater off");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn raise_fault(&self, report: FaultReport) {
        tracing::error!(
            heater = %report.name,
            temperature = ?report.temperature,
            sane_temperature = ?report.sane_temperature,
            ticks = report.ticks,
            "heater sanity fault; output forced off until reinit"
        );
        if let Some(tx) = &self.fault_tx {
            match tx.try_send(report) {
                Ok(()) => {}
                Err(TrySendError::Full(r)) => {
                    tracing::warn!(heater = %r.name, "fault channel full; report dropped");
                }
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    /// True iff every heater's output is currently 0.
    pub fn all_zero(&self) -> bool {
        self.ids()
            .all(|id| self.lock(id).is_ok_and(|rt| rt.output() == 0))
    }

    pub fn output(&self, id: HeaterId) -> Result<u8> {
        Ok(self.lock(id)?.output())
    }

    pub fn status(&self, id: HeaterId) -> Result<HeaterStatus> {
        let spec = self.spec(id)?;
        let target = self.target(id)?;
        let rt = self.lock(id)?;
        Ok(HeaterStatus {
            id,
            name: spec.name.clone(),
            temperature: rt.last_temperature(),
            target,
            output: rt.output(),
            pwm: spec.pwm,
            integrator: rt.integrator(),
            sanity: rt.sanity_state(),
            sanity_counter: rt.sanity().map_or(0, SanityWatchdog::counter),
            sane_temperature: rt.sanity().and_then(SanityWatchdog::sane_temperature),
            gains: rt.gains(),
            last_terms: rt.last_terms(),
        })
    }

    /// Ids of heaters currently latched in `Faulted`.
    pub fn faulted(&self) -> impl Iterator<Item = HeaterId> + '_ {
        self.ids()
            .filter(|&id| self.lock(id).is_ok_and(|rt| rt.is_faulted()))
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Reset one heater's runtime state, clearing a latched fault. Gains and
    /// target are kept.
    pub fn reinit(&self, id: HeaterId) -> Result<()> {
        let spec = self.spec(id)?;
        let mut rt = self.lock(id)?;
        let was = rt.sanity_state();
        rt.reset();
        drop(rt);
        tracing::info!(heater = %spec.name, previous = %was, "heater reinitialised");
        Ok(())
    }

    /// Zero every heater's state, restore configured gains, then apply any
    /// persisted gains.
    pub fn init(&self) -> Result<()> {
        for (idx, spec) in self.specs.iter().enumerate() {
            let fresh = runtime_for(spec, &self.control, &self.sanity);
            *self.runtimes[idx]
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = fresh;
        }
        let applied = self.load_settings()?;
        tracing::info!(heaters = self.len(), persisted = applied, "heater array initialised");
        Ok(())
    }
}

/// Polarity is applied here and nowhere else.
fn drive<A: Actuator + ?Sized>(spec: &HeaterSpec, value: u8, actuator: &mut A) -> Result<()> {
    let level = match (spec.invert, spec.pwm) {
        (false, _) => value,
        (true, true) => u8::MAX - value,
        (true, false) => u8::from(value == 0),
    };
    actuator
        .write(spec.channel, level)
        .map_err(|e| eyre::Report::new(map_hw_error(e.as_ref())))
}

fn watchdog_for(spec: &HeaterSpec, control: &ControlCfg, sanity: &SanityCfg) -> Option<SanityWatchdog> {
    sanity.enabled.then(|| {
        SanityWatchdog::for_dead_time(
            spec.dead_time_ms,
            control.tick_ms,
            sanity.min_tolerance_ticks,
            sanity.margin_ticks,
            sanity.band_qc,
        )
    })
}

pub(crate) fn runtime_for(spec: &HeaterSpec, control: &ControlCfg, sanity: &SanityCfg) -> HeaterRuntime {
    HeaterRuntime::new(spec.gains, watchdog_for(spec, control, sanity))
}
