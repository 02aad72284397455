//! The master clock coordinator.
//!
//! The IIgs runs two buses from one crystal: the fast FPI bus (2.8 MHz PHI2)
//! and the slow Mega II bus (1.023 MHz PHI0). Fast cycles simply advance the
//! unit clock. Slow cycles must land on a PHI0 edge: if the clock is between
//! edges it is first advanced to the next edge, then by one full PHI0 step.
//! Every 65th PHI0 cycle is stretched by one 7 MHz cycle, which produces the
//! NTSC relationship of 912 master clocks (456 units) per scanline.

/// One fast FPI PHI2 cycle, in clock units.
pub const CLOCKS_FAST_CYCLE: u64 = 5;

/// One Mega II PHI0 cycle, in clock units.
pub const CLOCKS_PHI0_CYCLE: u64 = 7;

/// One 7 MHz cycle: the stretch appended to every 65th PHI0 cycle.
pub const CLOCKS_7MHZ_CYCLE: u64 = 1;

/// PHI0 cycles per NTSC scanline.
pub const PHI0_CYCLES_PER_SCANLINE: u64 = 65;

/// Clock units per NTSC scanline: 64 plain PHI0 cycles plus one stretched.
pub const CLOCKS_PER_SCANLINE: u64 =
    (PHI0_CYCLES_PER_SCANLINE - 1) * CLOCKS_PHI0_CYCLE + CLOCKS_PHI0_CYCLE + CLOCKS_7MHZ_CYCLE;

/// The machine clock: a monotonic unit-tick counter plus the PHI0 edge
/// tracking needed to synchronize slow-bus accesses.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timespec {
    /// Units spent since power-on. Monotonically increasing.
    pub ts: u64,
    /// The next PHI0 edge. Always `>= ts` between cycles.
    pub ts_next_phi0: u64,
    /// PHI0 cycles into the current scanline (0..65).
    pub scanline_ctr: u8,
    /// Width of the PHI0 step ending at `ts_next_phi0` — `CLOCKS_PHI0_CYCLE`,
    /// or one unit more on the stretched 65th cycle.
    pub current_slow_step: u64,
    /// Step used for CPU cycles: `CLOCKS_FAST_CYCLE`, or `CLOCKS_PHI0_CYCLE`
    /// when the SPEED register selects 1 MHz operation.
    cpu_step: u64,
}

impl Default for Timespec {
    fn default() -> Self {
        Self::new()
    }
}

impl Timespec {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ts: 0,
            ts_next_phi0: CLOCKS_PHI0_CYCLE,
            scanline_ctr: 0,
            current_slow_step: CLOCKS_PHI0_CYCLE,
            cpu_step: CLOCKS_FAST_CYCLE,
        }
    }

    /// Select full-speed (2.8 MHz) or 1 MHz CPU operation. At 1 MHz every
    /// CPU cycle becomes a slow cycle.
    pub fn set_fast_speed(&mut self, fast: bool) {
        self.cpu_step = if fast {
            CLOCKS_FAST_CYCLE
        } else {
            CLOCKS_PHI0_CYCLE
        };
    }

    /// Whether the CPU is currently stepping at full FPI speed.
    #[must_use]
    pub fn is_fast_speed(&self) -> bool {
        self.cpu_step == CLOCKS_FAST_CYCLE
    }

    /// Advance the clock, maintaining the PHI0 edge and the scanline
    /// counter. The stretch is inserted when the counter reaches 64, so the
    /// 65th cycle of each scanline is one unit wider.
    fn advance(&mut self, clocks: u64) {
        self.ts += clocks;
        if self.ts >= self.ts_next_phi0 {
            self.scanline_ctr = (self.scanline_ctr + 1) % PHI0_CYCLES_PER_SCANLINE as u8;
            self.current_slow_step = CLOCKS_PHI0_CYCLE;
            if self.scanline_ctr == (PHI0_CYCLES_PER_SCANLINE - 1) as u8 {
                self.current_slow_step += CLOCKS_7MHZ_CYCLE;
            }
            self.ts_next_phi0 += self.current_slow_step;
        }
    }

    /// One fast (FPI) cycle. Falls back to a slow cycle when the SPEED
    /// register has the machine at 1 MHz.
    pub fn cycle_fast(&mut self) {
        if self.cpu_step == CLOCKS_PHI0_CYCLE {
            self.cycle_slow();
        } else {
            self.advance(self.cpu_step);
        }
    }

    /// One slow (Mega II) cycle: synchronize to the next PHI0 edge, then
    /// advance one full PHI0 step. The modulo leaves zero when the clock is
    /// already on an edge, so consecutive slow cycles skip the sync.
    pub fn cycle_slow(&mut self) {
        let sync_clocks = (self.ts_next_phi0 - self.ts) % self.current_slow_step;
        self.advance(sync_clocks);
        self.advance(self.current_slow_step);
    }

    /// One memory-access cycle. Mega II space is always slow; everything
    /// else is slow only when the machine is at 1 MHz.
    pub fn cycle_memory(&mut self, mega2_access: bool) {
        if mega2_access || self.cpu_step == CLOCKS_PHI0_CYCLE {
            self.cycle_slow();
        } else {
            self.advance(self.cpu_step);
        }
    }
}
