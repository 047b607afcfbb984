//! Simulated heater plant.
//!
//! Each heater is a first-order thermal mass: applied power heats it, a linear
//! loss term pulls it back to ambient. Commands reach the element only after
//! the configured dead-time, so the controller sees the same lag a real hot
//! end or bed shows. The plant is advanced one tick each time its sensor is
//! sampled.
//!
//! The actuator side receives polarity-corrected values exactly like a pin
//! driver would and undoes the inversion to recover the delivered power.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use heater_traits::{Actuator, SensorKind, TempSample, TemperatureSource};

use crate::error::HwError;

const AMBIENT_C: f32 = 25.0;

/// Static description of one simulated heater.
#[derive(Debug, Clone)]
pub struct SimHeater {
    pub channel: u8,
    pub invert: bool,
    pub pwm: bool,
    pub sensor: SensorKind,
    pub watts: u32,
    /// Ticks from an actuator write until the readings first show it.
    pub dead_time_ticks: usize,
}

#[derive(Debug)]
struct PlantHeater {
    cfg: SimHeater,
    temp_c: f32,
    /// Last commanded power fraction, 0.0..=1.0.
    commanded: f32,
    /// Commands in flight; front is the oldest.
    pipeline: VecDeque<f32>,
    detached: bool,
    sensor_disconnected: bool,
    stuck_on: bool,
}

impl PlantHeater {
    fn new(cfg: SimHeater) -> Self {
        // Sampling steps the plant before the tick's write, which is one tick of lag already.
        let pipeline = VecDeque::from(vec![0.0; cfg.dead_time_ticks.saturating_sub(1)]);
        Self {
            cfg,
            temp_c: AMBIENT_C,
            commanded: 0.0,
            pipeline,
            detached: false,
            sensor_disconnected: false,
            stuck_on: false,
        }
    }

    fn step(&mut self, tick_s: f32) {
        let command = if self.stuck_on { 1.0 } else { self.commanded };
        self.pipeline.push_back(command);
        let applied = self.pipeline.pop_front().unwrap_or(command);

        let watts = self.cfg.watts as f32;
        let heat_capacity = watts * 0.5; // J/°C
        let loss_per_c = watts / 250.0; // W/°C, full power settles ~250 °C above ambient
        let heat_in = if self.detached { 0.0 } else { applied * watts };
        let loss = loss_per_c * (self.temp_c - AMBIENT_C);
        self.temp_c += (heat_in - loss) * tick_s / heat_capacity;
        if self.temp_c < AMBIENT_C {
            self.temp_c = AMBIENT_C;
        }
    }

    fn reading(&self) -> TempSample {
        if self.sensor_disconnected {
            return TempSample::disconnected(self.cfg.sensor);
        }
        let qc = (self.temp_c * 4.0).round().clamp(0.0, f32::from(u16::MAX));
        TempSample::new(self.cfg.sensor, qc as u16)
    }
}

#[derive(Debug)]
struct Plant {
    heaters: Vec<PlantHeater>,
    tick_s: f32,
}

impl Plant {
    fn by_channel(&mut self, channel: u8) -> Option<&mut PlantHeater> {
        self.heaters.iter_mut().find(|h| h.cfg.channel == channel)
    }
}

/// Build a plant and return its sensor side, actuator side and a control handle.
///
/// All three share the same state and are meant for a single control thread.
pub fn simulated_plant(heaters: Vec<SimHeater>, tick_ms: u64) -> (SimSensors, SimActuator, SimControl) {
    let plant = Rc::new(RefCell::new(Plant {
        heaters: heaters.into_iter().map(PlantHeater::new).collect(),
        tick_s: tick_ms as f32 / 1000.0,
    }));
    (
        SimSensors {
            plant: plant.clone(),
        },
        SimActuator {
            plant: plant.clone(),
        },
        SimControl { plant },
    )
}

/// Sensor side of the plant; sampling heater `i` advances it by one tick.
pub struct SimSensors {
    plant: Rc<RefCell<Plant>>,
}

impl TemperatureSource for SimSensors {
    fn sample(&mut self, heater: usize) -> TempSample {
        let mut plant = self.plant.borrow_mut();
        let tick_s = plant.tick_s;
        match plant.heaters.get_mut(heater) {
            Some(h) => {
                h.step(tick_s);
                h.reading()
            }
            None => TempSample::disconnected(SensorKind::Dummy),
        }
    }
}

/// Actuator side of the plant.
pub struct SimActuator {
    plant: Rc<RefCell<Plant>>,
}

impl Actuator for SimActuator {
    fn write(
        &mut self,
        channel: u8,
        value: u8,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut plant = self.plant.borrow_mut();
        let h = plant
            .by_channel(channel)
            .ok_or(HwError::UnknownChannel(channel))?;
        let fraction = if h.cfg.pwm {
            let duty = if h.cfg.invert { 255 - value } else { value };
            f32::from(duty) / 255.0
        } else {
            let on = (value != 0) != h.cfg.invert;
            if on { 1.0 } else { 0.0 }
        };
        h.commanded = fraction;
        tracing::trace!(channel, value, fraction, "sim actuator write");
        Ok(())
    }
}

/// Fault injection and inspection handle.
#[derive(Clone)]
pub struct SimControl {
    plant: Rc<RefCell<Plant>>,
}

impl SimControl {
    /// The element falls off the block: power no longer reaches the sensor.
    pub fn detach_heater(&self, heater: usize) {
        if let Some(h) = self.plant.borrow_mut().heaters.get_mut(heater) {
            h.detached = true;
        }
    }

    pub fn disconnect_sensor(&self, heater: usize) {
        if let Some(h) = self.plant.borrow_mut().heaters.get_mut(heater) {
            h.sensor_disconnected = true;
        }
    }

    /// Welded relay / shorted MOSFET: full power regardless of command.
    pub fn stick_on(&self, heater: usize) {
        if let Some(h) = self.plant.borrow_mut().heaters.get_mut(heater) {
            h.stuck_on = true;
        }
    }

    pub fn temperature_c(&self, heater: usize) -> Option<f32> {
        self.plant.borrow().heaters.get(heater).map(|h| h.temp_c)
    }

    /// Power fraction most recently written by the controller.
    pub fn commanded(&self, heater: usize) -> Option<f32> {
        self.plant.borrow().heaters.get(heater).map(|h| h.commanded)
    }
}
