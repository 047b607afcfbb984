//! Type-state builder for `HeaterArray`.
//!
//! `build()` only exists once heaters were supplied; `try_build()` is always
//! available and reports what is missing or invalid as a `BuildError`.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Mutex;
use std::sync::atomic::AtomicU16;

use crossbeam_channel::Sender;

use crate::array::{HeaterArray, runtime_for};
use crate::config::{ControlCfg, HeaterSpec, SanityCfg};
use crate::conversions::heater_specs;
use crate::error::{BuildError, Result};
use crate::settings::{GainStore, NullGainStore, TomlGainStore};
use crate::status::FaultReport;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

pub struct HeaterArrayBuilder<H> {
    heaters: Option<Vec<HeaterSpec>>,
    control: Option<ControlCfg>,
    sanity: Option<SanityCfg>,
    store: Option<Box<dyn GainStore + Send + Sync>>,
    fault_tx: Option<Sender<FaultReport>>,
    _h: PhantomData<H>,
}

impl Default for HeaterArrayBuilder<Missing> {
    fn default() -> Self {
        Self {
            heaters: None,
            control: None,
            sanity: None,
            store: None,
            fault_tx: None,
            _h: PhantomData,
        }
    }
}

impl HeaterArray {
    pub fn builder() -> HeaterArrayBuilder<Missing> {
        HeaterArrayBuilder::default()
    }
}

impl HeaterArrayBuilder<Missing> {
    pub fn with_heaters(self, heaters: Vec<HeaterSpec>) -> HeaterArrayBuilder<Set> {
        HeaterArrayBuilder {
            heaters: Some(heaters),
            control: self.control,
            sanity: self.sanity,
            store: self.store,
            fault_tx: self.fault_tx,
            _h: PhantomData,
        }
    }

    /// Heaters, control and sanity settings from a loaded config file. A
    /// configured `storage.gains_file` selects a `TomlGainStore`.
    pub fn from_config(cfg: &heater_config::Config) -> Result<HeaterArrayBuilder<Set>> {
        let mut b = Self::default()
            .with_control((&cfg.control).into())
            .with_sanity((&cfg.sanity).into());
        if let Some(path) = cfg.storage.gains_file.as_deref() {
            b = b.with_store(TomlGainStore::new(path));
        }
        Ok(b.with_heaters(heater_specs(cfg)?))
    }
}

/// Chainable setters that do not affect type-state.
impl<H> HeaterArrayBuilder<H> {
    pub fn with_control(mut self, control: ControlCfg) -> Self {
        self.control = Some(control);
        self
    }
    pub fn with_sanity(mut self, sanity: SanityCfg) -> Self {
        self.sanity = Some(sanity);
        self
    }
    pub fn with_store(mut self, store: impl GainStore + Send + Sync + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }
    /// Fault reports are sent with `try_send`; a full channel drops them.
    pub fn with_fault_sink(mut self, tx: Sender<FaultReport>) -> Self {
        self.fault_tx = Some(tx);
        self
    }

    pub fn try_build(self) -> Result<HeaterArray> {
        let heaters = self
            .heaters
            .ok_or_else(|| eyre::Report::new(BuildError::MissingHeaters))?;
        let control = self.control.unwrap_or_default();
        let sanity = self.sanity.unwrap_or_default();
        validate(&heaters, &control, &sanity)?;

        let runtimes = heaters
            .iter()
            .map(|s| Mutex::new(runtime_for(s, &control, &sanity)))
            .collect();
        let targets = heaters.iter().map(|_| AtomicU16::new(0)).collect();
        tracing::debug!(heaters = heaters.len(), tick_ms = control.tick_ms, sanity = sanity.enabled, "heater array built");

        Ok(HeaterArray {
            specs: heaters.into_boxed_slice(),
            runtimes,
            targets,
            control,
            sanity,
            store: self.store.unwrap_or_else(|| Box::new(NullGainStore)),
            fault_tx: self.fault_tx,
        })
    }
}

impl HeaterArrayBuilder<Set> {
    pub fn build(self) -> Result<HeaterArray> {
        self.try_build()
    }
}

fn validate(heaters: &[HeaterSpec], control: &ControlCfg, sanity: &SanityCfg) -> Result<()> {
    if heaters.is_empty() {
        return Err(eyre::Report::new(BuildError::MissingHeaters));
    }
    if heaters.len() > heater_config::MAX_HEATERS {
        return Err(eyre::Report::new(BuildError::TooManyHeaters(heaters.len())));
    }
    if control.tick_ms == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "tick_ms must be >= 1",
        )));
    }
    if sanity.enabled && sanity.band_qc == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "sanity band must be >= 1",
        )));
    }
    let mut names = HashSet::new();
    let mut channels = HashSet::new();
    for h in heaters {
        if h.name.is_empty() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "heater name must not be empty",
            )));
        }
        if !names.insert(h.name.as_str()) {
            return Err(eyre::Report::new(BuildError::DuplicateName(h.name.clone())));
        }
        if !channels.insert(h.channel) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "two heaters share a channel",
            )));
        }
        if h.gains.i_limit < 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "i_limit must be >= 0",
            )));
        }
    }
    Ok(())
}
