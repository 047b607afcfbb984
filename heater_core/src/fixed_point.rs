//! Fixed-point scaling between user units and controller counts.
//!
//! Temperatures are quarter degrees Celsius (qC) in a `u16`; the controller
//! runs once per quarter-second tick. Gains are stored pre-multiplied by the
//! scale of their term so the tick path is integer-only:
//!
//! - `SCALE_P`: user counts/°C -> internal counts per qC of error.
//! - `SCALE_I`: user counts/(°C·s) -> internal counts per qC·tick of
//!   accumulated error (four ticks per second, four qC per degree).
//! - `SCALE_D`: user counts/(°C/s) -> internal counts per qC change across
//!   the `TH_COUNT`-tick derivative window.

/// Base scale all term scales derive from.
pub const PID_SCALE: i32 = 2048;

/// Ticks spanned by the derivative smoothing window (temperature history depth).
pub const TH_COUNT: usize = 8;

pub const SCALE_P: i32 = PID_SCALE / 4;
pub const SCALE_I: i32 = PID_SCALE / 16;
pub const SCALE_D: i32 = PID_SCALE / TH_COUNT as i32;

/// Default P, 16 counts/°C (`32 * SCALE_D`).
pub const DEFAULT_P: i32 = 32 * SCALE_D;
/// Default I, 8 counts/(°C·s).
pub const DEFAULT_I: i32 = 8 * SCALE_I;
/// Default D, 192 counts/(°C/s).
pub const DEFAULT_D: i32 = 192 * SCALE_D;
/// Default integrator limit in qC·ticks (24 °C·s).
pub const DEFAULT_I_LIMIT: i16 = 384;

/// Default bang-bang half band, qC.
pub const DEFAULT_BANG_BANG_THRESHOLD: u16 = 8;

/// Nominal control tick period.
pub const TICK_MS: u64 = 250;

pub const QC_PER_DEGREE: i32 = 4;

/// Maximum command for graduated channels.
pub const PWM_MAX: u8 = 255;

/// `value * gain / scale` with a 64-bit intermediate. Cannot overflow for any
/// `i32` operands; the quotient truncates toward zero like the C arithmetic
/// the gains were tuned against.
#[inline]
pub fn scaled_term(value: i32, gain: i32, scale: i32) -> i64 {
    debug_assert!(scale > 0, "term scale must be positive");
    i64::from(value) * i64::from(gain) / i64::from(scale)
}

/// Clamp a raw controller sum into the `0..=PWM_MAX` command range.
#[inline]
pub fn clamp_output(raw: i64) -> u8 {
    raw.clamp(0, i64::from(PWM_MAX)) as u8
}

/// Convert degrees Celsius to quarter degrees, rounding to nearest and
/// saturating at the `u16` bounds. Non-finite input maps to 0.
#[inline]
pub fn celsius_to_qc(c: f32) -> u16 {
    if !c.is_finite() {
        return 0;
    }
    let q = (c * QC_PER_DEGREE as f32).round();
    if q <= 0.0 {
        0
    } else if q >= f32::from(u16::MAX) {
        u16::MAX
    } else {
        q as u16
    }
}

#[inline]
pub fn qc_to_celsius(qc: u16) -> f32 {
    f32::from(qc) / QC_PER_DEGREE as f32
}

/// User P (counts/°C) to internal units.
#[inline]
pub fn p_from_user(counts_per_c: f32) -> i64 {
    (f64::from(counts_per_c) * f64::from(SCALE_P)).round() as i64
}

/// User I (counts/(°C·s)) to internal units.
#[inline]
pub fn i_from_user(counts_per_c_s: f32) -> i64 {
    (f64::from(counts_per_c_s) * f64::from(SCALE_I)).round() as i64
}

/// User D (counts/(°C/s)) to internal units.
#[inline]
pub fn d_from_user(counts_per_c_per_s: f32) -> i64 {
    (f64::from(counts_per_c_per_s) * f64::from(SCALE_D)).round() as i64
}

/// Number of whole ticks covering `ms`, rounded up, never less than `floor`.
#[inline]
pub fn ticks_for_ms(ms: u64, tick_ms: u64, floor: u32) -> u32 {
    let ticks = ms.div_ceil(tick_ms.max(1));
    u32::try_from(ticks).unwrap_or(u32::MAX).max(floor)
}
