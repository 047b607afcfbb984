use core::fmt;

/// Dense index of a configured heater, assigned in configuration order.
///
/// Only meaningful for the `HeaterArray` that handed it out; "no heater" is
/// `Option::<HeaterId>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeaterId(u8);

impl HeaterId {
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index).ok().map(Self)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for HeaterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
