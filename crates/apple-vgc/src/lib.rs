//! Apple IIgs Video Graphics Controller.
//!
//! The VGC walks the NTSC raster a scanline at a time against the shared
//! unit clock: 262 lines of 65 PHI0 cycles, 200 of them displayable. At
//! each scanline boundary it samples the video mode, arms the per-scanline
//! interrupt in super-hires mode, fires the VBL interrupt at line 192, and
//! derives the 1-second interrupt from the VBL count. Pixel decoding is
//! deferred to [`render`], which reads the scanline descriptors and video
//! memory only when the host asks for a frame.

pub mod render;

use emu_core::CLOCKS_PER_SCANLINE;

#[cfg(feature = "serde")]
use serde_big_array::BigArray;

/// Raster lines per NTSC field.
pub const SCANLINES_PER_FRAME: u16 = 262;

/// Displayable scanlines (super-hires; legacy modes use the first 192).
pub const DISPLAY_SCANLINES: u16 = 200;

/// First vertical-blank scanline.
pub const VBL_START_SCANLINE: u16 = 192;

/// Mode flag bits.
pub mod mode {
    pub const TEXT: u32 = 0x0001;
    pub const MIXED: u32 = 0x0002;
    pub const HIRES: u32 = 0x0004;
    pub const DHIRES: u32 = 0x0008;
    pub const COL80: u32 = 0x0010;
    pub const ALTCHAR: u32 = 0x0020;
    pub const TEXT_PAGE2: u32 = 0x0040;
    pub const SUPER_HIRES: u32 = 0x0080;
    pub const MONOCHROME: u32 = 0x0100;
    /// Bank $E1 linear addressing for super-hires (NEWVIDEO bit 6).
    pub const LINEARIZE: u32 = 0x0200;
}

/// Scanline control byte bits (super-hires scanline table at $E1/9D00).
pub mod scanline_control {
    /// Palette select in the low four bits.
    pub const PALETTE_MASK: u8 = 0x0F;
    /// Fill mode: a zero pixel repeats the previous color.
    pub const COLOR_FILL: u8 = 0x20;
    /// Interrupt on this scanline.
    pub const IRQ_ENABLE: u8 = 0x40;
    /// 640-pixel mode for this line.
    pub const MODE_640: u8 = 0x80;
}

/// VGC interrupt enable bits (write $C023) and status bits (read $C023).
pub mod irq_bits {
    pub const SCANLINE_ENABLE: u8 = 0x02;
    pub const ONESEC_ENABLE: u8 = 0x04;
    pub const SCANLINE_STATUS: u8 = 0x20;
    pub const ONESEC_STATUS: u8 = 0x40;
    pub const ANY_STATUS: u8 = 0x80;
}

/// One displayed scanline as sampled at its boundary.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanlineDescriptor {
    /// Super-hires control byte for this line.
    pub control: u8,
    /// Byte offset of the line's pixel data within its bank.
    pub offset: u32,
}

/// The VGC.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vgc {
    /// Active video mode flags.
    pub mode_flags: u32,
    /// Border color index ($C034 low nibble).
    pub border_color: u8,
    /// Text foreground/background colors ($C022).
    pub text_color: u8,
    /// Sampled descriptors for the 200 displayable lines.
    #[cfg_attr(feature = "serde", serde(with = "BigArray"))]
    pub scanlines: [ScanlineDescriptor; DISPLAY_SCANLINES as usize],
    /// Interrupt enables ($C023 write).
    pub irq_enable: u8,
    /// Latched interrupt status ($C023 read, cleared via $C032).
    pub irq_status: u8,
    /// Current raster line (0..262).
    pub scanline: u16,
    /// Completed vertical blanks.
    pub vbl_count: u64,
    /// Text flash phase, toggled at ~2 Hz.
    pub flash: bool,
    /// PAL machines fire the 1-second interrupt every 50 VBLs.
    pub pal: bool,
    /// Clock deadline for the next scanline boundary.
    ts_next_scanline: u64,
    /// VBLs since the last 1-second interrupt.
    vbl_since_second: u32,
    /// VBLs since the last flash toggle.
    vbl_since_flash: u32,
}

impl Default for Vgc {
    fn default() -> Self {
        Self::new()
    }
}

impl Vgc {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode_flags: mode::TEXT,
            border_color: 0,
            text_color: 0xF0,
            scanlines: [ScanlineDescriptor::default(); DISPLAY_SCANLINES as usize],
            irq_enable: 0,
            irq_status: 0,
            scanline: 0,
            vbl_count: 0,
            flash: false,
            pal: false,
            ts_next_scanline: CLOCKS_PER_SCANLINE,
            vbl_since_second: 0,
            vbl_since_flash: 0,
        }
    }

    /// True while the raster is in vertical blank ($C019 sense).
    #[must_use]
    pub fn in_vbl(&self) -> bool {
        self.scanline >= VBL_START_SCANLINE
    }

    /// Whether the VGC IRQ line is asserted.
    #[must_use]
    pub fn irq_asserted(&self) -> bool {
        self.irq_status & (irq_bits::SCANLINE_STATUS | irq_bits::ONESEC_STATUS) != 0
    }

    /// $C023 read: status plus enables, with the summary bit.
    #[must_use]
    pub fn interrupt_register(&self) -> u8 {
        let mut value = self.irq_enable | self.irq_status;
        if self.irq_asserted() {
            value |= irq_bits::ANY_STATUS;
        }
        value
    }

    /// $C023 write: set the enable bits. Disabling an interrupt also drops
    /// its latched status.
    pub fn write_interrupt_enable(&mut self, value: u8) {
        self.irq_enable = value & (irq_bits::SCANLINE_ENABLE | irq_bits::ONESEC_ENABLE);
        if self.irq_enable & irq_bits::SCANLINE_ENABLE == 0 {
            self.irq_status &= !irq_bits::SCANLINE_STATUS;
        }
        if self.irq_enable & irq_bits::ONESEC_ENABLE == 0 {
            self.irq_status &= !irq_bits::ONESEC_STATUS;
        }
    }

    /// $C032 write: zero bits clear the corresponding latched status.
    pub fn clear_interrupts(&mut self, value: u8) {
        if value & irq_bits::SCANLINE_STATUS == 0 {
            self.irq_status &= !irq_bits::SCANLINE_STATUS;
        }
        if value & irq_bits::ONESEC_STATUS == 0 {
            self.irq_status &= !irq_bits::ONESEC_STATUS;
        }
    }

    /// Video counters ($C02E/$C02F): vertical count and the horizontal
    /// position derived from the clock, at scanline-edge accuracy.
    #[must_use]
    pub fn video_counters(&self, ts: u64) -> (u8, u8) {
        let line_start = self.ts_next_scanline.saturating_sub(CLOCKS_PER_SCANLINE);
        let horiz = ((ts.saturating_sub(line_start)) / emu_core::CLOCKS_PHI0_CYCLE).min(64) as u8;
        // Vertical count register folds 262 lines into bits 0-7 + $C02E bit 0.
        ((self.scanline >> 1) as u8, horiz | ((self.scanline as u8 & 1) << 7))
    }

    /// Advance the raster to the given clock. `shr_table` is the live view
    /// of the super-hires scanline-control table at $E1/9D00, consulted for
    /// per-line interrupt arming as each boundary passes.
    pub fn tick(&mut self, ts: u64, shr_table: &[u8]) {
        while ts >= self.ts_next_scanline {
            self.ts_next_scanline += CLOCKS_PER_SCANLINE;
            self.scanline = (self.scanline + 1) % SCANLINES_PER_FRAME;

            if self.scanline < DISPLAY_SCANLINES {
                let line = usize::from(self.scanline);
                let control = if self.mode_flags & mode::SUPER_HIRES != 0 {
                    shr_table.get(line).copied().unwrap_or(0)
                } else {
                    0
                };
                self.scanlines[line] = ScanlineDescriptor {
                    control,
                    offset: render::scanline_offset(self.mode_flags, self.scanline),
                };
                if control & scanline_control::IRQ_ENABLE != 0
                    && self.irq_enable & irq_bits::SCANLINE_ENABLE != 0
                {
                    self.irq_status |= irq_bits::SCANLINE_STATUS;
                }
            }

            if self.scanline == VBL_START_SCANLINE {
                self.vbl_start();
            }
        }
    }

    fn vbl_start(&mut self) {
        self.vbl_count += 1;
        self.vbl_since_flash += 1;
        if self.vbl_since_flash >= 30 {
            self.vbl_since_flash = 0;
            self.flash = !self.flash;
        }
        self.vbl_since_second += 1;
        let vbls_per_second = if self.pal { 50 } else { 60 };
        if self.vbl_since_second >= vbls_per_second {
            self.vbl_since_second = 0;
            if self.irq_enable & irq_bits::ONESEC_ENABLE != 0 {
                self.irq_status |= irq_bits::ONESEC_STATUS;
            }
        }
    }
}
