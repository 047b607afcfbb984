//! Status rendering shared by `run` and `show`.

use heater_core::fixed_point::qc_to_celsius;
use heater_core::runner::LoopStats;
use heater_core::{FaultReport, HeaterStatus};
use serde_json::{Value, json};

fn celsius(qc: Option<u16>) -> Value {
    qc.map_or(Value::Null, |t| json!(qc_to_celsius(t)))
}

pub fn status_json(st: &HeaterStatus) -> Value {
    let terms = st.last_terms.map(|t| {
        json!({ "error": t.error, "p": t.p, "i": t.i, "d": t.d, "output": t.output })
    });
    json!({
        "heater": st.name,
        "id": st.id.raw(),
        "temperature_c": celsius(st.temperature),
        "target_c": qc_to_celsius(st.target),
        "output": st.output,
        "duty": st.duty(),
        "pwm": st.pwm,
        "integrator": st.integrator,
        "sanity": st.sanity.as_str(),
        "sanity_counter": st.sanity_counter,
        "sane_temperature_c": celsius(st.sane_temperature),
        "gains": {
            "p": st.gains.p,
            "i": st.gains.i,
            "d": st.gains.d,
            "i_limit": st.gains.i_limit,
        },
        "terms": terms,
    })
}

pub fn fault_json(f: &FaultReport) -> Value {
    json!({
        "event": "fault",
        "heater": f.name,
        "id": f.heater.raw(),
        "temperature_c": celsius(f.temperature),
        "sane_temperature_c": celsius(f.sane_temperature),
        "ticks": f.ticks,
    })
}

pub fn stats_json(s: &LoopStats) -> Value {
    json!({
        "ticks": s.ticks,
        "missed_deadlines": s.missed_deadlines,
        "max_latency_us": u64::try_from(s.max_latency.as_micros()).unwrap_or(u64::MAX),
        "mean_latency_us": u64::try_from(s.mean_latency.as_micros()).unwrap_or(u64::MAX),
        "faulted": s.faulted,
        "faults_raised": s.faults_raised,
        "rejected_samples": s.rejected_samples,
        "errors": s.errors,
    })
}

/// Latency and fault counters to stderr.
pub fn print_stats(s: &LoopStats, tick_ms: u64) {
    eprintln!("\n--- heaterctl stats ---");
    eprintln!("Ticks: {}", s.ticks);
    eprintln!("Period (ms): {tick_ms}");
    eprintln!(
        "Pass latency mean/max (us): {} / {}",
        s.mean_latency.as_micros(),
        s.max_latency.as_micros()
    );
    eprintln!("Missed deadlines (> period): {}", s.missed_deadlines);
    eprintln!(
        "Rejected samples: {}  actuator errors: {}",
        s.rejected_samples, s.errors
    );
    eprintln!(
        "Faults raised: {}  heaters faulted at exit: {}",
        s.faults_raised, s.faulted
    );
    eprintln!("-----------------------\n");
}
