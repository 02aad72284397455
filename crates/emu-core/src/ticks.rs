//! The fundamental unit of time in the emulator.

/// A count of unit-clock ticks.
///
/// One tick is half a 14.318 MHz master-crystal period (7.159 MHz). A fast
/// FPI cycle spans [`crate::CLOCKS_FAST_CYCLE`] ticks and a Mega II PHI0
/// cycle spans [`crate::CLOCKS_PHI0_CYCLE`]; device timing (IWM bit cells,
/// DOC mix intervals) is expressed in these same units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ticks(pub u64);

impl Ticks {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl core::ops::Add for Ticks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl core::ops::AddAssign for Ticks {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl core::ops::Sub for Ticks {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}
