//! Core traits and clock types for Apple IIgs emulation.
//!
//! Everything in the machine advances against a single unit clock derived
//! from the 14.318 MHz master crystal. The fast FPI bus and the slow Mega II
//! bus both step this clock; the [`Timespec`] coordinator keeps slow-bus
//! accesses phase-locked to the Mega II PHI0 edge.

mod bus;
mod clock;
mod cpu;
mod tickable;
mod ticks;

pub use bus::{Bus, MemAccess, SimpleBus};
pub use clock::{
    CLOCKS_7MHZ_CYCLE, CLOCKS_FAST_CYCLE, CLOCKS_PER_SCANLINE, CLOCKS_PHI0_CYCLE,
    PHI0_CYCLES_PER_SCANLINE, Timespec,
};
pub use cpu::Cpu;
pub use tickable::Tickable;
pub use ticks::Ticks;
