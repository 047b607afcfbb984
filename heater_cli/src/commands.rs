//! Subcommand bodies: assemble the array from config, wire the simulated
//! plant and drive it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::Receiver;
use eyre::WrapErr;
use heater_config::Config;
use heater_core::fixed_point::{celsius_to_qc, ticks_for_ms};
use heater_core::runner::{self, RunOptions};
use heater_core::{
    FaultReport, GainKind, HeaterArray, HeaterArrayBuilder, HeaterError, HeaterId, Missing,
    Result, TickSummary,
};
use heater_hardware::{SimActuator, SimControl, SimHeater, SimSensors, simulated_plant};
use heater_traits::MonotonicClock;

use crate::cli::{RtLock, TargetArg, json_mode};
use crate::report;
use crate::rt::setup_rt_once;

/// The run ended with at least one heater latched in a sanity fault.
#[derive(Debug, thiserror::Error)]
#[error("heater fault: {}", heaters.join(", "))]
pub struct FaultExit {
    pub heaters: Vec<String>,
}

fn build_array(cfg: &Config) -> Result<HeaterArray> {
    let array = HeaterArrayBuilder::<Missing>::from_config(cfg)?.build()?;
    array.init().wrap_err("load persisted gains")?;
    Ok(array)
}

fn lookup(array: &HeaterArray, name: &str) -> Result<HeaterId> {
    array
        .id_of(name)
        .ok_or_else(|| eyre::Report::new(HeaterError::UnknownHeaterName(name.to_string())))
}

/// Sim plant mirroring the configured heaters, dead-time included.
fn plant_for(array: &HeaterArray) -> Result<(SimSensors, SimActuator, SimControl)> {
    let tick_ms = array.control().tick_ms;
    let mut heaters = Vec::with_capacity(array.len());
    for id in array.ids() {
        let spec = array.spec(id)?;
        heaters.push(SimHeater {
            channel: spec.channel,
            invert: spec.invert,
            pwm: spec.pwm,
            sensor: spec.sensor,
            watts: spec.watts,
            dead_time_ticks: ticks_for_ms(spec.dead_time_ms, tick_ms, 0) as usize,
        });
    }
    Ok(simulated_plant(heaters, tick_ms))
}

pub struct RunArgs {
    pub targets: Vec<TargetArg>,
    pub ticks: Option<u64>,
    pub fast: bool,
    pub every: u64,
    pub stats: bool,
    pub rt: bool,
    pub rt_prio: Option<i32>,
    pub rt_lock: RtLock,
    pub detach: Vec<String>,
    pub disconnect: Vec<String>,
    pub stick: Vec<String>,
    pub fault_after: u64,
}

#[derive(Clone, Copy)]
enum Injection {
    Detach,
    Disconnect,
    Stick,
}

fn resolve_injections(array: &HeaterArray, args: &RunArgs) -> Result<Vec<(usize, Injection)>> {
    let mut out = Vec::new();
    for (names, what) in [
        (&args.detach, Injection::Detach),
        (&args.disconnect, Injection::Disconnect),
        (&args.stick, Injection::Stick),
    ] {
        for name in names {
            out.push((lookup(array, name)?.index(), what));
        }
    }
    Ok(out)
}

fn inject(sim: &SimControl, faults: &[(usize, Injection)]) {
    for &(heater, what) in faults {
        match what {
            Injection::Detach => sim.detach_heater(heater),
            Injection::Disconnect => sim.disconnect_sensor(heater),
            Injection::Stick => sim.stick_on(heater),
        }
        tracing::warn!(heater, "sim fault injected");
    }
}

fn drain_faults(rx: &Receiver<FaultReport>) {
    for f in rx.try_iter() {
        if json_mode() {
            println!("{}", report::fault_json(&f));
        } else {
            eprintln!("FAULT: {f}");
        }
    }
}

fn print_status(array: &HeaterArray, tick: Option<u64>) {
    for id in array.ids() {
        let Ok(st) = array.status(id) else { continue };
        if json_mode() {
            let mut v = report::status_json(&st);
            if let Some(t) = tick {
                v["tick"] = serde_json::json!(t);
            }
            println!("{v}");
        } else {
            match tick {
                Some(t) => println!("[{t:>6}] {st}"),
                None => println!("{st}"),
            }
        }
    }
}

pub fn run(cfg: &Config, args: &RunArgs, shutdown: &Arc<AtomicBool>) -> Result<()> {
    let fault_capacity = cfg.heaters.len().max(1) * 2;
    let (tx, rx) = crossbeam_channel::bounded(fault_capacity);
    let array = HeaterArrayBuilder::<Missing>::from_config(cfg)?
        .with_fault_sink(tx)
        .build()?;
    array.init().wrap_err("load persisted gains")?;

    for t in &args.targets {
        let id = lookup(&array, &t.heater)?;
        array.set_target(id, celsius_to_qc(t.celsius))?;
    }
    let injections = resolve_injections(&array, args)?;

    let (mut sensors, mut actuator, sim) = plant_for(&array)?;
    if args.fault_after == 0 {
        inject(&sim, &injections);
    }

    if args.rt {
        setup_rt_once(args.rt_prio, args.rt_lock);
    }

    tracing::info!(
        heaters = array.len(),
        targets = args.targets.len(),
        ticks = ?args.ticks,
        fast = args.fast,
        "run start"
    );

    let clock = MonotonicClock::new();
    let opts = RunOptions {
        max_ticks: args.ticks,
        paced: !args.fast,
        off_on_exit: true,
    };
    let on_tick = |tick: u64, _summary: &TickSummary| {
        if args.fault_after > 0 && tick == args.fault_after {
            inject(&sim, &injections);
        }
        drain_faults(&rx);
        if args.every > 0 && tick % args.every == 0 {
            print_status(&array, Some(tick));
        }
    };
    let stats = runner::run(
        &array,
        &mut sensors,
        &mut actuator,
        &clock,
        shutdown.as_ref(),
        opts,
        on_tick,
    );
    drain_faults(&rx);

    if shutdown.load(Ordering::Relaxed) {
        tracing::info!("interrupted; heaters switched off");
    }
    print_status(&array, None);
    if args.stats {
        if json_mode() {
            println!("{}", serde_json::json!({ "stats": report::stats_json(&stats) }));
        } else {
            report::print_stats(&stats, array.control().tick_ms);
        }
    }
    tracing::info!(
        ticks = stats.ticks,
        missed = stats.missed_deadlines,
        faulted = stats.faulted,
        "run complete"
    );

    let faulted: Vec<String> = array
        .faulted()
        .filter_map(|id| array.spec(id).ok().map(|s| s.name.clone()))
        .collect();
    if !faulted.is_empty() {
        return Err(eyre::Report::new(FaultExit { heaters: faulted }));
    }
    Ok(())
}

pub fn set_gain(cfg: &Config, heater: &str, kind: GainKind, value: i64) -> Result<()> {
    if cfg.storage.gains_file.is_none() {
        return Err(eyre::Report::new(HeaterError::Config(
            "storage.gains_file is not set; nothing to persist gains to".into(),
        )));
    }
    let array = build_array(cfg)?;
    let id = lookup(&array, heater)?;
    array.set_gain(id, kind, value)?;
    array.save_settings().wrap_err("save gains")?;
    tracing::info!(heater, gain = %kind, value, "gain saved");

    let g = array.gains(id)?;
    if json_mode() {
        println!(
            "{}",
            serde_json::json!({
                "heater": heater,
                "gains": { "p": g.p, "i": g.i, "d": g.d, "i_limit": g.i_limit },
            })
        );
    } else {
        println!(
            "{heater}: p={} i={} d={} i_limit={}",
            g.p, g.i, g.d, g.i_limit
        );
    }
    Ok(())
}

pub fn show(cfg: &Config, heater: Option<&str>) -> Result<()> {
    let array = build_array(cfg)?;
    let ids: Vec<HeaterId> = match heater {
        Some(name) => vec![lookup(&array, name)?],
        None => array.ids().collect(),
    };
    for id in ids {
        let st = array.status(id)?;
        let spec = array.spec(id)?;
        if json_mode() {
            let mut v = report::status_json(&st);
            v["channel"] = serde_json::json!(spec.channel);
            v["invert"] = serde_json::json!(spec.invert);
            v["sensor"] = serde_json::json!(spec.sensor.name());
            v["watts"] = serde_json::json!(spec.watts);
            v["dead_time_ms"] = serde_json::json!(spec.dead_time_ms);
            println!("{v}");
        } else {
            println!(
                "{} pin={}{} {} sensor={} p={} i={} d={} i_limit={}",
                st.name,
                spec.channel,
                if spec.invert { " (inverted)" } else { "" },
                if spec.pwm { "pwm" } else { "on/off" },
                spec.sensor.name(),
                st.gains.p,
                st.gains.i,
                st.gains.d,
                st.gains.i_limit
            );
        }
    }
    Ok(())
}

/// Build the array, run a short unpaced burst with every heater off, and make
/// sure nothing errors and every output stays at zero.
pub fn self_check(cfg: &Config) -> Result<()> {
    const CHECK_TICKS: u64 = 8;

    let array = build_array(cfg)?;
    let (mut sensors, mut actuator, _sim) = plant_for(&array)?;
    let stop = AtomicBool::new(false);
    let stats = runner::run(
        &array,
        &mut sensors,
        &mut actuator,
        &MonotonicClock::new(),
        &stop,
        RunOptions {
            max_ticks: Some(CHECK_TICKS),
            paced: false,
            off_on_exit: true,
        },
        |_, _| {},
    );
    if stats.errors > 0 {
        eyre::bail!("self-check: {} actuator errors", stats.errors);
    }
    if stats.rejected_samples > 0 {
        eyre::bail!("self-check: {} implausible sensor samples", stats.rejected_samples);
    }
    if !array.all_zero() {
        eyre::bail!("self-check: outputs not off with no targets");
    }
    if json_mode() {
        println!(
            "{}",
            serde_json::json!({ "self_check": "ok", "heaters": array.len(), "ticks": stats.ticks })
        );
    } else {
        println!("OK: {} heaters, {} ticks", array.len(), stats.ticks);
    }
    Ok(())
}
