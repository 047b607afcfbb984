use heater_core::error::HeaterError;
use heater_core::mocks::{FailingActuator, FixedTemps};
use heater_core::{HeaterArray, HeaterId, HeaterSpec, SanityCfg, SensorKind, TempSample};

fn two_heaters() -> HeaterArray {
    let specs = vec![
        HeaterSpec {
            sensor: SensorKind::Thermocouple,
            ..HeaterSpec::new("a", 1)
        },
        HeaterSpec {
            sensor: SensorKind::Thermocouple,
            ..HeaterSpec::new("b", 2)
        },
    ];
    HeaterArray::builder()
        .with_heaters(specs)
        .with_sanity(SanityCfg::disabled())
        .build()
        .unwrap()
}

#[test]
fn actuator_errors_map_to_heater_error() {
    let array = two_heaters();
    let mut act = FailingActuator::new(1, "pwm bus off");
    let err = array
        .tick(HeaterId::new(0), TempSample::new(SensorKind::Thermocouple, 100), 200, &mut act)
        .expect_err("write must fail");
    match err.downcast_ref::<HeaterError>() {
        Some(HeaterError::Actuator(msg)) => assert!(msg.contains("pwm bus off")),
        other => panic!("expected Actuator, got: {other:?}"),
    }
}

#[test]
fn timeout_text_maps_to_timeout() {
    let array = two_heaters();
    let mut act = FailingActuator::new(2, "write timeout");
    let err = array
        .set_output(HeaterId::new(1), 10, &mut act)
        .unwrap_err();
    assert_eq!(err.downcast_ref::<HeaterError>(), Some(&HeaterError::Timeout));
}

#[test]
fn failing_heater_does_not_stop_the_pass() {
    let array = two_heaters();
    array.set_target(HeaterId::new(0), 500).unwrap();
    array.set_target(HeaterId::new(1), 500).unwrap();
    let mut temps = FixedTemps::new(SensorKind::Thermocouple, &[100, 100]);
    let mut act = FailingActuator::new(1, "broken");

    let s = array.tick_all(&mut temps, &mut act);
    assert_eq!(s.errors, 1);
    assert_eq!(s.ticked, 1);
    assert_eq!(act.inner.last(2), Some(255));
}

#[cfg(feature = "hardware-errors")]
#[test]
fn typed_hardware_error_is_downcast() {
    use heater_hardware::{SimHeater, simulated_plant};

    let (_sensors, mut act, _ctl) = simulated_plant(
        vec![SimHeater {
            channel: 7,
            invert: false,
            pwm: true,
            sensor: SensorKind::Thermocouple,
            watts: 40,
            dead_time_ticks: 0,
        }],
        250,
    );
    // Heater on channel 1 is not wired into the plant.
    let array = two_heaters();
    let err = array
        .set_output(HeaterId::new(0), 0, &mut act)
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<HeaterError>(),
        Some(&HeaterError::Actuator("unknown actuator channel 1".into()))
    );
}
