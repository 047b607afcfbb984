//! Per-heater PID gains in internal fixed-point units.

use core::fmt;

use crate::error::HeaterError;
use crate::fixed_point::{
    DEFAULT_D, DEFAULT_I, DEFAULT_I_LIMIT, DEFAULT_P, d_from_user, i_from_user, p_from_user,
};

/// Which tunable a setter or an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GainKind {
    P,
    I,
    D,
    ILimit,
}

impl GainKind {
    pub const ALL: [GainKind; 4] = [GainKind::P, GainKind::I, GainKind::D, GainKind::ILimit];

    pub const fn name(self) -> &'static str {
        match self {
            GainKind::P => "p",
            GainKind::I => "i",
            GainKind::D => "d",
            GainKind::ILimit => "i_limit",
        }
    }

    /// Inclusive range a value must fit to be representable.
    pub const fn bounds(self) -> (i64, i64) {
        match self {
            GainKind::ILimit => (0, i16::MAX as i64),
            _ => (i32::MIN as i64, i32::MAX as i64),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "p" => Some(GainKind::P),
            "i" => Some(GainKind::I),
            "d" => Some(GainKind::D),
            "i_limit" | "ilimit" | "i-limit" => Some(GainKind::ILimit),
            _ => None,
        }
    }
}

impl fmt::Display for GainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidGains {
    pub p: i32,
    pub i: i32,
    pub d: i32,
    /// Integrator clamp, qC·ticks. Never negative.
    pub i_limit: i16,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            p: DEFAULT_P,
            i: DEFAULT_I,
            d: DEFAULT_D,
            i_limit: DEFAULT_I_LIMIT,
        }
    }
}

impl PidGains {
    /// Build gains from physical units (counts/°C, counts/(°C·s), counts/(°C/s)).
    pub fn from_user(p: f32, i: f32, d: f32, i_limit: i16) -> Result<Self, HeaterError> {
        Self::default()
            .with(GainKind::P, p_from_user(p))?
            .with(GainKind::I, i_from_user(i))?
            .with(GainKind::D, d_from_user(d))?
            .with(GainKind::ILimit, i64::from(i_limit))
    }

    pub const fn get(&self, kind: GainKind) -> i64 {
        match kind {
            GainKind::P => self.p as i64,
            GainKind::I => self.i as i64,
            GainKind::D => self.d as i64,
            GainKind::ILimit => self.i_limit as i64,
        }
    }

    /// Copy with one gain replaced. Values outside the representable range
    /// are rejected, never clamped.
    pub fn with(mut self, kind: GainKind, value: i64) -> Result<Self, HeaterError> {
        let (lo, hi) = kind.bounds();
        if !(lo..=hi).contains(&value) {
            return Err(HeaterError::GainOutOfRange { kind, value });
        }
        // Range checked above; the casts are lossless.
        match kind {
            GainKind::P => self.p = value as i32,
            GainKind::I => self.i = value as i32,
            GainKind::D => self.d = value as i32,
            GainKind::ILimit => self.i_limit = value as i16,
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_point_constants() {
        let g = PidGains::default();
        assert_eq!((g.p, g.i, g.d, g.i_limit), (8192, 1024, 49152, 384));
    }

    #[test]
    fn with_rejects_out_of_range_and_keeps_value() {
        let g = PidGains::default();
        let err = g.with(GainKind::P, i64::from(i32::MAX) + 1).unwrap_err();
        assert_eq!(
            err,
            HeaterError::GainOutOfRange {
                kind: GainKind::P,
                value: i64::from(i32::MAX) + 1
            }
        );
        assert!(g.with(GainKind::ILimit, -1).is_err());
        assert!(g.with(GainKind::ILimit, 40_000).is_err());
        assert_eq!(g.with(GainKind::D, -5).unwrap().d, -5);
        assert_eq!(g.p, DEFAULT_P);
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(GainKind::parse("P"), Some(GainKind::P));
        assert_eq!(GainKind::parse("i-limit"), Some(GainKind::ILimit));
        assert_eq!(GainKind::parse("x"), None);
    }

    #[test]
    fn from_user_scales_each_term() {
        let g = PidGains::from_user(16.0, 8.0, 192.0, 384).unwrap();
        assert_eq!(g, PidGains::default());
        assert!(PidGains::from_user(1e12, 0.0, 0.0, 10).is_err());
    }
}
