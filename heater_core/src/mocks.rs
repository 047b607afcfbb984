//! Test and helper mocks for heater_core.

use std::sync::{Arc, Mutex, PoisonError};

use heater_config::GainsFile;
use heater_traits::{Actuator, SensorKind, TempSample, TemperatureSource};

use crate::error::Result;
use crate::settings::GainStore;

/// Accepts and discards every write.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullActuator;

impl Actuator for NullActuator {
    fn write(
        &mut self,
        _channel: u8,
        _value: u8,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// Remembers every `(channel, value)` written, in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingActuator {
    pub writes: Vec<(u8, u8)>,
}

impl RecordingActuator {
    /// Most recent value written to `channel`.
    pub fn last(&self, channel: u8) -> Option<u8> {
        self.writes
            .iter()
            .rev()
            .find(|(c, _)| *c == channel)
            .map(|&(_, v)| v)
    }
}

impl Actuator for RecordingActuator {
    fn write(
        &mut self,
        channel: u8,
        value: u8,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.writes.push((channel, value));
        Ok(())
    }
}

/// Fails writes to one channel, records the rest.
#[derive(Debug, Clone)]
pub struct FailingActuator {
    pub failing_channel: u8,
    pub message: &'static str,
    pub inner: RecordingActuator,
}

impl FailingActuator {
    pub fn new(failing_channel: u8, message: &'static str) -> Self {
        Self {
            failing_channel,
            message,
            inner: RecordingActuator::default(),
        }
    }
}

impl Actuator for FailingActuator {
    fn write(
        &mut self,
        channel: u8,
        value: u8,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if channel == self.failing_channel {
            return Err(Box::new(std::io::Error::other(self.message)));
        }
        self.inner.write(channel, value)
    }
}

/// Sensor stand-in returning whatever the test last set for each heater.
#[derive(Debug, Clone)]
pub struct FixedTemps {
    pub samples: Vec<TempSample>,
}

impl FixedTemps {
    pub fn new(kind: SensorKind, values_qc: &[u16]) -> Self {
        Self {
            samples: values_qc.iter().map(|&v| TempSample::new(kind, v)).collect(),
        }
    }

    pub fn set(&mut self, heater: usize, value_qc: u16) {
        if let Some(s) = self.samples.get_mut(heater) {
            s.value_qc = Some(value_qc);
        }
    }

    pub fn disconnect(&mut self, heater: usize) {
        if let Some(s) = self.samples.get_mut(heater) {
            s.value_qc = None;
        }
    }
}

impl TemperatureSource for FixedTemps {
    fn sample(&mut self, heater: usize) -> TempSample {
        self.samples
            .get(heater)
            .copied()
            .unwrap_or(TempSample::disconnected(SensorKind::Dummy))
    }
}

/// In-memory gain store; clones share the stored file.
#[derive(Debug, Default, Clone)]
pub struct MemoryGainStore {
    pub saved: Arc<Mutex<Option<GainsFile>>>,
}

impl MemoryGainStore {
    pub fn with(file: GainsFile) -> Self {
        Self {
            saved: Arc::new(Mutex::new(Some(file))),
        }
    }

    pub fn snapshot(&self) -> Option<GainsFile> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl GainStore for MemoryGainStore {
    fn load(&self) -> Result<Option<GainsFile>> {
        Ok(self.snapshot())
    }

    fn save(&self, gains: &GainsFile) -> Result<()> {
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(gains.clone());
        Ok(())
    }
}
