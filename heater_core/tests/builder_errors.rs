use heater_core::error::BuildError;
use heater_core::{ControlCfg, HeaterArray, HeaterArrayBuilder, HeaterSpec, Missing, SanityCfg};
use rstest::rstest;

fn heaters(n: usize) -> Vec<HeaterSpec> {
    (0..n)
        .map(|i| HeaterSpec::new(format!("h{i}"), i as u8))
        .collect()
}

#[rstest]
fn missing_heaters_yields_typed_build_error() {
    let err = HeaterArray::builder()
        // missing with_heaters()
        .with_control(ControlCfg::default())
        .try_build()
        .expect_err("should fail with MissingHeaters");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingHeaters) => {}
        other => panic!("expected MissingHeaters, got: {other:?}"),
    }
}

#[rstest]
#[case::empty(0, BuildError::MissingHeaters)]
#[case::too_many(33, BuildError::TooManyHeaters(33))]
fn heater_count_is_bounded(#[case] n: usize, #[case] expected: BuildError) {
    let err = HeaterArray::builder()
        .with_heaters(heaters(n))
        .build()
        .expect_err("invalid heater count");
    assert_eq!(err.downcast_ref::<BuildError>(), Some(&expected));
}

#[rstest]
fn duplicate_names_are_rejected() {
    let mut hs = heaters(2);
    hs[1].name = "h0".into();
    let err = HeaterArray::builder().with_heaters(hs).build().unwrap_err();
    assert_eq!(
        err.downcast_ref::<BuildError>(),
        Some(&BuildError::DuplicateName("h0".into()))
    );
}

#[rstest]
#[case::zero_tick(ControlCfg { tick_ms: 0, ..ControlCfg::default() }, SanityCfg::default(), None)]
#[case::zero_band(ControlCfg::default(), SanityCfg { band_qc: 0, ..SanityCfg::default() }, None)]
#[case::shared_channel(ControlCfg::default(), SanityCfg::default(), Some(0u8))]
fn invalid_config_is_rejected(
    #[case] control: ControlCfg,
    #[case] sanity: SanityCfg,
    #[case] clash_channel: Option<u8>,
) {
    let mut hs = heaters(2);
    if let Some(ch) = clash_channel {
        hs[1].channel = ch;
    }
    let err = HeaterArray::builder()
        .with_heaters(hs)
        .with_control(control)
        .with_sanity(sanity)
        .build()
        .unwrap_err();
    assert!(
        matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::InvalidConfig(_))
        ),
        "unexpected error: {err:?}"
    );
}

#[test]
fn zero_band_is_fine_when_sanity_disabled() {
    let sanity = SanityCfg {
        band_qc: 0,
        ..SanityCfg::disabled()
    };
    let array = HeaterArray::builder()
        .with_heaters(heaters(3))
        .with_sanity(sanity)
        .build()
        .unwrap();
    assert_eq!(array.len(), 3);
    assert_eq!(array.id_of("h2").map(|id| id.index()), Some(2));
    assert_eq!(array.id_of("nope"), None);
}

#[test]
fn from_config_carries_table_and_settings() {
    let cfg = heater_config::load_toml(
        r#"
        [control]
        tick_ms = 100
        bang_bang_on = 4
        bang_bang_off = 12

        [sanity]
        enabled = false

        [[heater]]
        name = "extruder"
        pin = 3
        p = 4096
        watts = 40
        dead_time_ms = 8000

        [[heater]]
        name = "bed"
        pin = 4
        pwm = false
        invert = true
        sensor = "pt100"
        watts = 200
        dead_time_ms = 30000
        "#,
    )
    .unwrap();
    cfg.validate().unwrap();

    let array = HeaterArrayBuilder::<Missing>::from_config(&cfg)
        .unwrap()
        .build()
        .unwrap();
    let ext = array.spec(array.id_of("extruder").unwrap()).unwrap();
    assert_eq!(ext.gains.p, 4096);
    assert_eq!(ext.gains.i, heater_core::fixed_point::DEFAULT_I);
    let bed = array.spec(array.id_of("bed").unwrap()).unwrap();
    assert!(!bed.pwm && bed.invert);
    assert_eq!(bed.sensor, heater_core::SensorKind::Pt100);
    assert_eq!(array.control().tick_ms, 100);
    assert_eq!(array.control().bang_bang_threshold, 8);
}
