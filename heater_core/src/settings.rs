//! Runtime gain tuning and gain persistence.
//!
//! Setters validate representability and take the heater's lock, so a new
//! gain applies from the next tick and never mid-step. Persistence goes
//! through a [`GainStore`]; [`NullGainStore`] turns it into a no-op.

use std::path::{Path, PathBuf};

use heater_config::{GainsFile, PersistedGains};

use crate::array::HeaterArray;
use crate::atomic::write_atomic;
use crate::error::{HeaterError, Result};
use crate::gains::{GainKind, PidGains};
use crate::types::HeaterId;

/// Non-volatile storage for tuned gains.
pub trait GainStore {
    /// Previously saved gains, or `None` when nothing was saved yet.
    fn load(&self) -> Result<Option<GainsFile>>;
    /// Durably replace the saved gain set.
    fn save(&self, gains: &GainsFile) -> Result<()>;
}

/// Persistence disabled: nothing loads, saves succeed without effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullGainStore;

impl GainStore for NullGainStore {
    fn load(&self) -> Result<Option<GainsFile>> {
        Ok(None)
    }

    fn save(&self, _gains: &GainsFile) -> Result<()> {
        Ok(())
    }
}

/// Gains kept in a TOML file, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct TomlGainStore {
    path: PathBuf,
}

impl TomlGainStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GainStore for TomlGainStore {
    fn load(&self) -> Result<Option<GainsFile>> {
        GainsFile::load(&self.path)
            .map_err(|e| eyre::Report::new(HeaterError::Storage(e.to_string())))
    }

    fn save(&self, gains: &GainsFile) -> Result<()> {
        let text = gains
            .to_toml()
            .map_err(|e| eyre::Report::new(HeaterError::Storage(e.to_string())))?;
        write_atomic(&self.path, text.as_bytes()).map_err(|e| {
            eyre::Report::new(HeaterError::Storage(format!(
                "write {}: {e}",
                self.path.display()
            )))
        })
    }
}

impl HeaterArray {
    /// Replace one gain of one heater. Out-of-range values are rejected with
    /// `HeaterError::GainOutOfRange` and leave the heater untouched.
    pub fn set_gain(&self, id: HeaterId, kind: GainKind, value: i64) -> Result<()> {
        let spec = self.spec(id)?;
        self.lock(id)?
            .set_gain(kind, value)
            .map_err(eyre::Report::new)?;
        tracing::info!(heater = %spec.name, gain = %kind, value, "gain updated");
        Ok(())
    }

    pub fn set_p(&self, id: HeaterId, value: i64) -> Result<()> {
        self.set_gain(id, GainKind::P, value)
    }

    pub fn set_i(&self, id: HeaterId, value: i64) -> Result<()> {
        self.set_gain(id, GainKind::I, value)
    }

    pub fn set_d(&self, id: HeaterId, value: i64) -> Result<()> {
        self.set_gain(id, GainKind::D, value)
    }

    /// Also pulls the integrator inside the new limit.
    pub fn set_i_limit(&self, id: HeaterId, value: i64) -> Result<()> {
        self.set_gain(id, GainKind::ILimit, value)
    }

    pub fn gains(&self, id: HeaterId) -> Result<PidGains> {
        Ok(self.lock(id)?.gains())
    }

    /// Persist the current gains of every heater.
    pub fn save_settings(&self) -> Result<()> {
        let mut file = GainsFile::default();
        for id in self.ids() {
            let name = self.spec(id)?.name.clone();
            let g = self.gains(id)?;
            file.heaters.push(PersistedGains {
                name,
                p: i64::from(g.p),
                i: i64::from(g.i),
                d: i64::from(g.d),
                i_limit: i64::from(g.i_limit),
            });
        }
        self.store.save(&file)?;
        tracing::info!(heaters = file.heaters.len(), "gains saved");
        Ok(())
    }

    /// Apply persisted gains, returning how many heaters took them. Unknown
    /// names and unrepresentable values are skipped with a warning.
    pub(crate) fn load_settings(&self) -> Result<usize> {
        let Some(file) = self.store.load()? else {
            return Ok(0);
        };
        let mut applied = 0;
        for saved in &file.heaters {
            let Some(id) = self.id_of(&saved.name) else {
                tracing::warn!(heater = %saved.name, "persisted gains for unknown heater ignored");
                continue;
            };
            match persisted_to_gains(saved) {
                Ok(g) => {
                    self.lock(id)?.set_gains(g);
                    applied += 1;
                }
                Err(e) => {
                    tracing::warn!(heater = %saved.name, error = %e, "persisted gains rejected; keeping defaults");
                }
            }
        }
        Ok(applied)
    }
}

fn persisted_to_gains(p: &PersistedGains) -> std::result::Result<PidGains, HeaterError> {
    PidGains::default()
        .with(GainKind::P, p.p)?
        .with(GainKind::I, p.i)?
        .with(GainKind::D, p.d)?
        .with(GainKind::ILimit, p.i_limit)
}
