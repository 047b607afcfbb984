use std::sync::Arc;
use std::thread;

use heater_config::{GainsFile, PersistedGains};
use heater_core::mocks::{MemoryGainStore, NullActuator};
use heater_core::{
    GainKind, HeaterArray, HeaterError, HeaterId, HeaterSpec, PidGains, SanityCfg, SensorKind,
    TempSample, TomlGainStore,
};
use rstest::rstest;

fn specs() -> Vec<HeaterSpec> {
    vec![HeaterSpec::new("extruder", 3), HeaterSpec::new("bed", 4)]
}

const EXT: HeaterId = HeaterId::new(0);

#[rstest]
#[case::p_high(GainKind::P, i64::from(i32::MAX) + 1)]
#[case::p_low(GainKind::P, i64::from(i32::MIN) - 1)]
#[case::i_high(GainKind::I, i64::MAX)]
#[case::d_low(GainKind::D, i64::MIN)]
#[case::limit_negative(GainKind::ILimit, -1)]
#[case::limit_high(GainKind::ILimit, i64::from(i16::MAX) + 1)]
fn unrepresentable_gain_is_rejected_and_state_kept(#[case] kind: GainKind, #[case] value: i64) {
    let array = HeaterArray::builder().with_heaters(specs()).build().unwrap();
    let before = array.gains(EXT).unwrap();

    let err = array.set_gain(EXT, kind, value).unwrap_err();
    assert_eq!(
        err.downcast_ref::<HeaterError>(),
        Some(&HeaterError::GainOutOfRange { kind, value })
    );
    assert_eq!(array.gains(EXT).unwrap(), before);
}

#[test]
fn representable_extremes_are_accepted() {
    let array = HeaterArray::builder().with_heaters(specs()).build().unwrap();
    array.set_p(EXT, i64::from(i32::MAX)).unwrap();
    array.set_i(EXT, i64::from(i32::MIN)).unwrap();
    array.set_d(EXT, 0).unwrap();
    array.set_i_limit(EXT, i64::from(i16::MAX)).unwrap();
    let g = array.gains(EXT).unwrap();
    assert_eq!((g.p, g.i, g.d, g.i_limit), (i32::MAX, i32::MIN, 0, i16::MAX));
    // other heater untouched
    assert_eq!(array.gains(HeaterId::new(1)).unwrap(), PidGains::default());
}

#[test]
fn new_gain_applies_on_next_tick() {
    let array = HeaterArray::builder()
        .with_heaters(vec![HeaterSpec {
            sensor: SensorKind::Thermocouple,
            gains: PidGains {
                p: 0,
                i: 0,
                d: 0,
                i_limit: 384,
            },
            ..HeaterSpec::new("h", 1)
        }])
        .with_sanity(SanityCfg::disabled())
        .build()
        .unwrap();
    let t = TempSample::new(SensorKind::Thermocouple, 1990);
    assert_eq!(array.tick(EXT, t, 2000, &mut NullActuator).unwrap().output, 0);
    array.set_p(EXT, 8192).unwrap();
    assert_eq!(array.tick(EXT, t, 2000, &mut NullActuator).unwrap().output, 160);
}

#[test]
fn lowering_i_limit_clamps_live_integrator() {
    let array = HeaterArray::builder()
        .with_heaters(vec![HeaterSpec {
            sensor: SensorKind::Thermocouple,
            ..HeaterSpec::new("h", 1)
        }])
        .with_sanity(SanityCfg::disabled())
        .build()
        .unwrap();
    for _ in 0..10 {
        array
            .tick(EXT, TempSample::new(SensorKind::Thermocouple, 1000), 1100, &mut NullActuator)
            .unwrap();
    }
    assert_eq!(array.status(EXT).unwrap().integrator, 384);
    array.set_i_limit(EXT, 20).unwrap();
    assert_eq!(array.status(EXT).unwrap().integrator, 20);
}

#[test]
fn save_and_init_round_trip_through_toml_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gains.toml");

    let array = HeaterArray::builder()
        .with_heaters(specs())
        .with_store(TomlGainStore::new(&path))
        .build()
        .unwrap();
    array.set_p(EXT, 1234).unwrap();
    array.set_i_limit(HeaterId::new(1), 99).unwrap();
    array.save_settings().unwrap();

    let saved = GainsFile::load(&path).unwrap().expect("file written");
    assert_eq!(saved.heaters.len(), 2);
    assert_eq!(saved.heaters[0].name, "extruder");
    assert_eq!(saved.heaters[0].p, 1234);

    let fresh = HeaterArray::builder()
        .with_heaters(specs())
        .with_store(TomlGainStore::new(&path))
        .build()
        .unwrap();
    assert_eq!(fresh.gains(EXT).unwrap().p, PidGains::default().p);
    fresh.init().unwrap();
    assert_eq!(fresh.gains(EXT).unwrap().p, 1234);
    assert_eq!(fresh.gains(HeaterId::new(1)).unwrap().i_limit, 99);
}

#[test]
fn init_without_saved_file_keeps_configured_gains() {
    let dir = tempfile::tempdir().unwrap();
    let mut hs = specs();
    hs[0].gains.d = 7;
    let array = HeaterArray::builder()
        .with_heaters(hs)
        .with_store(TomlGainStore::new(dir.path().join("absent.toml")))
        .build()
        .unwrap();
    array.set_d(EXT, 500).unwrap();
    array.init().unwrap();
    assert_eq!(array.gains(EXT).unwrap().d, 7, "init restores configured gains");
}

#[test]
fn unknown_and_invalid_persisted_entries_are_skipped() {
    let store = MemoryGainStore::with(GainsFile {
        heaters: vec![
            PersistedGains {
                name: "ghost".into(),
                p: 1,
                i: 1,
                d: 1,
                i_limit: 1,
            },
            PersistedGains {
                name: "extruder".into(),
                p: 1,
                i: 2,
                d: 3,
                i_limit: 100_000,
            },
            PersistedGains {
                name: "bed".into(),
                p: 10,
                i: 20,
                d: 30,
                i_limit: 40,
            },
        ],
    });
    let array = HeaterArray::builder()
        .with_heaters(specs())
        .with_store(store)
        .build()
        .unwrap();
    array.init().unwrap();
    assert_eq!(array.gains(EXT).unwrap(), PidGains::default());
    assert_eq!(
        array.gains(HeaterId::new(1)).unwrap(),
        PidGains {
            p: 10,
            i: 20,
            d: 30,
            i_limit: 40
        }
    );
}

#[test]
fn null_store_save_is_a_no_op() {
    let array = HeaterArray::builder().with_heaters(specs()).build().unwrap();
    array.save_settings().unwrap();
    array.init().unwrap();
    assert_eq!(array.gains(EXT).unwrap(), PidGains::default());
}

#[test]
fn corrupt_gains_file_is_a_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gains.toml");
    std::fs::write(&path, "[[heater]]\nname = 3\n").unwrap();
    let array = HeaterArray::builder()
        .with_heaters(specs())
        .with_store(TomlGainStore::new(&path))
        .build()
        .unwrap();
    let err = array.init().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HeaterError>(),
        Some(HeaterError::Storage(_))
    ));
}

#[test]
fn gain_updates_from_another_thread_never_tear_a_tick() {
    let array = Arc::new(
        HeaterArray::builder()
            .with_heaters(vec![HeaterSpec {
                sensor: SensorKind::Thermocouple,
                ..HeaterSpec::new("h", 1)
            }])
            .with_sanity(SanityCfg::disabled())
            .build()
            .unwrap(),
    );

    let tuner = {
        let array = Arc::clone(&array);
        thread::spawn(move || {
            for k in 0..2_000i64 {
                array.set_i_limit(EXT, k % 400).unwrap();
                array.set_p(EXT, k * 7).unwrap();
            }
        })
    };

    for k in 0..2_000u16 {
        let t = TempSample::new(SensorKind::Thermocouple, 1000 + (k % 50));
        array.tick(EXT, t, 1040, &mut NullActuator).unwrap();
        let st = array.status(EXT).unwrap();
        assert!(st.integrator.abs() <= st.gains.i_limit, "{st:?}");
    }
    tuner.join().unwrap();
}
