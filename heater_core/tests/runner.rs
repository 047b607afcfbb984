use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use heater_core::mocks::{FixedTemps, NullActuator, RecordingActuator};
use heater_core::runner::{RunOptions, run};
use heater_core::{ControlCfg, HeaterArray, HeaterId, HeaterSpec, SensorKind};
use heater_traits::{Clock, ManualClock};

fn array(tick_ms: u64) -> HeaterArray {
    HeaterArray::builder()
        .with_heaters(vec![HeaterSpec {
            sensor: SensorKind::Thermocouple,
            ..HeaterSpec::new("h", 1)
        }])
        .with_control(ControlCfg {
            tick_ms,
            ..ControlCfg::default()
        })
        .build()
        .unwrap()
}

#[test]
fn paced_loop_advances_one_period_per_tick() {
    let array = array(250);
    let clock = ManualClock::new();
    let stop = AtomicBool::new(false);
    let mut temps = FixedTemps::new(SensorKind::Thermocouple, &[400]);

    let stats = run(
        &array,
        &mut temps,
        &mut NullActuator,
        &clock,
        &stop,
        RunOptions {
            max_ticks: Some(12),
            ..RunOptions::default()
        },
        |_, _| {},
    );
    assert_eq!(stats.ticks, 12);
    assert_eq!(stats.missed_deadlines, 0);
    assert_eq!(clock.elapsed(), Duration::from_millis(12 * 250));
}

#[test]
fn unpaced_loop_does_not_sleep() {
    let array = array(250);
    let clock = ManualClock::new();
    let stop = AtomicBool::new(false);
    let mut temps = FixedTemps::new(SensorKind::Thermocouple, &[400]);

    let stats = run(
        &array,
        &mut temps,
        &mut NullActuator,
        &clock,
        &stop,
        RunOptions {
            max_ticks: Some(100),
            paced: false,
            off_on_exit: true,
        },
        |_, _| {},
    );
    assert_eq!(stats.ticks, 100);
    assert_eq!(clock.elapsed(), Duration::ZERO);
}

#[test]
fn shutdown_flag_stops_the_loop_and_heaters_are_switched_off() {
    let array = array(250);
    array.set_target(HeaterId::new(0), 1000).unwrap();
    let clock = ManualClock::new();
    let stop = AtomicBool::new(false);
    let mut temps = FixedTemps::new(SensorKind::Thermocouple, &[400]);
    let mut act = RecordingActuator::default();

    let stats = run(
        &array,
        &mut temps,
        &mut act,
        &clock,
        &stop,
        RunOptions::default(),
        |tick, summary| {
            assert_eq!(summary.ticked, 1);
            if tick == 5 {
                stop.store(true, Ordering::Relaxed);
            }
        },
    );
    assert_eq!(stats.ticks, 5);
    assert_eq!(act.writes.len(), 6, "five ticks plus the final off");
    assert_eq!(act.last(1), Some(0));
    assert!(array.all_zero());
}

#[test]
fn faults_are_counted() {
    let array = array(250);
    array.set_target(HeaterId::new(0), 2000).unwrap();
    let clock = ManualClock::new();
    let stop = AtomicBool::new(false);
    let mut temps = FixedTemps::new(SensorKind::Thermocouple, &[400]);

    let stats = run(
        &array,
        &mut temps,
        &mut NullActuator,
        &clock,
        &stop,
        RunOptions {
            max_ticks: Some(60),
            paced: false,
            off_on_exit: false,
        },
        |_, _| {},
    );
    assert_eq!(stats.faults_raised, 1);
    assert_eq!(stats.faulted, 1);
}

/// A clock whose every `now()` call moves time forward, so each pass
/// appears to take longer than the tick period.
struct SlowClock {
    inner: ManualClock,
    step: Duration,
}

impl Clock for SlowClock {
    fn now(&self) -> std::time::Instant {
        self.inner.advance(self.step);
        self.inner.now()
    }
    fn sleep(&self, d: Duration) {
        self.inner.sleep(d);
    }
}

#[test]
fn overrunning_passes_count_as_missed_deadlines() {
    let array = array(10);
    let clock = SlowClock {
        inner: ManualClock::new(),
        step: Duration::from_millis(20),
    };
    let stop = AtomicBool::new(false);
    let mut temps = FixedTemps::new(SensorKind::Thermocouple, &[400]);

    let stats = run(
        &array,
        &mut temps,
        &mut NullActuator,
        &clock,
        &stop,
        RunOptions {
            max_ticks: Some(5),
            ..RunOptions::default()
        },
        |_, _| {},
    );
    assert_eq!(stats.missed_deadlines, 5);
    assert!(stats.max_latency >= Duration::from_millis(20));
}
