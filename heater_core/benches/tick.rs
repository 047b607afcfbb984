use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use heater_core::mocks::{FixedTemps, NullActuator};
use heater_core::{HeaterArray, HeaterId, HeaterSpec, SanityCfg, SensorKind, TempSample};

fn array(n: usize, sanity: SanityCfg) -> HeaterArray {
    let specs = (0..n)
        .map(|i| HeaterSpec {
            sensor: SensorKind::Thermocouple,
            pwm: i % 4 != 3,
            ..HeaterSpec::new(format!("h{i}"), i as u8)
        })
        .collect();
    let array = HeaterArray::builder()
        .with_heaters(specs)
        .with_sanity(sanity)
        .build()
        .expect("bench array");
    for id in array.ids() {
        array.set_target(id, 800).expect("target");
    }
    array
}

pub fn bench_tick_all(c: &mut Criterion) {
    let mut g = c.benchmark_group("tick_all");
    // Allow quick tweaking without CLI flags (Criterion 0.5):
    //   BENCH_SAMPLE_SIZE=10 cargo bench -p heater_core --bench tick
    if let Some(n) = std::env::var("BENCH_SAMPLE_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
    {
        g.sample_size(n.max(10));
    }

    for &n in &[1usize, 8, 32] {
        let with_sanity = array(n, SanityCfg::default());
        let without = array(n, SanityCfg::disabled());
        let values: Vec<u16> = (0..n).map(|i| 780 + (i as u16 % 40)).collect();

        g.bench_function(format!("{n}_heaters_sanity"), |b| {
            let mut temps = FixedTemps::new(SensorKind::Thermocouple, &values);
            b.iter(|| black_box(with_sanity.tick_all(&mut temps, &mut NullActuator)))
        });
        g.bench_function(format!("{n}_heaters_plain"), |b| {
            let mut temps = FixedTemps::new(SensorKind::Thermocouple, &values);
            b.iter(|| black_box(without.tick_all(&mut temps, &mut NullActuator)))
        });
    }
    g.finish();
}

pub fn bench_single_tick(c: &mut Criterion) {
    c.bench_function("tick_one_heater", |b| {
        b.iter_batched(
            || array(1, SanityCfg::default()),
            |a| {
                for t in 0..64u16 {
                    let s = TempSample::new(SensorKind::Thermocouple, 700 + t);
                    black_box(a.tick(HeaterId::new(0), s, 800, &mut NullActuator).ok());
                }
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_tick_all, bench_single_tick);
criterion_main!(benches);
