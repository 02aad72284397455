//! Trait for components advanced by Mega II clock ticks.

use crate::Ticks;

/// A component advanced by slow-bus (PHI0) ticks.
///
/// Card-level devices (VIA timers, PSGs) implement this; the machine ticks
/// them once per elapsed PHI0 cycle after each CPU instruction.
pub trait Tickable {
    /// Advance the component by one PHI0 tick.
    fn tick(&mut self);

    /// Advance the component by multiple ticks.
    ///
    /// Default implementation calls `tick()` in a loop. Components may
    /// override for efficiency, but must produce identical results.
    fn tick_n(&mut self, count: Ticks) {
        for _ in 0..count.get() {
            self.tick();
        }
    }
}
