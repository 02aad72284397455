//! The $C000-$C0FF softswitch register file.
//!
//! Every access lands here from the bank map's MMIO pages. Reads and
//! writes dispatch to the owning device; switches that reshape the memory
//! map invalidate it and the bus rebuilds before the next access. Unknown
//! registers read $FF, drop writes, and warn once per offset.

use apple_adb::AdbDevice;
use apple_iwm::Iwm;
use apple_vgc::{Vgc, mode};
use emu_core::Timespec;
use ensoniq_doc_5503::{Doc5503, SoundGlu};

use crate::cards::SlotManager;
use crate::memory::Memory;
use crate::rtc::Rtc;
use crate::{LogLevel, MachineLogger};

/// Mega II interrupt enable/flag bits ($C041/$C046).
pub mod mega2_ints {
    pub const VBL: u8 = 0x08;
    pub const QUARTER_SEC: u8 = 0x10;
}

/// Quarter-second cadence in VBLs (266 ms nominal).
const QSEC_VBLS: u64 = 16;

/// Speaker toggle log, drained when audio is assembled.
#[derive(Debug, Default, Clone)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SpeakerState {
    pub level: bool,
    pub transitions: Vec<(u64, bool)>,
}

/// The MMIO register file and the devices behind it.
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Mmio {
    pub vgc: Vgc,
    pub iwm: Iwm,
    pub doc: Doc5503,
    pub glu: SoundGlu,
    pub adb: AdbDevice,
    pub rtc: Rtc,
    #[serde(skip)]
    pub cards: SlotManager,
    /// NEWVIDEO ($C029).
    pub new_video: u8,
    /// Mega II interrupt enables ($C041) and pending flags ($C046).
    pub inten: u8,
    pub intflag: u8,
    /// SPEED register ($C036).
    pub speed: u8,
    pub speaker: SpeakerState,
    /// Paddle axes (0-255) and button states from the host.
    pub paddle_values: [u8; 4],
    pub paddle_buttons: [bool; 3],
    /// Bitmask of connected paddles.
    pub paddle_connected: u8,
    paddle_trigger_ts: u64,
    /// VBL bookkeeping for the Mega II timer interrupts.
    last_vbl_count: u64,
    /// One-shot warning bitmap for unclaimed softswitches.
    #[serde(skip)]
    warned: [u8; 32],
}

impl Mmio {
    #[must_use]
    pub fn new(sample_rate: u32, pal: bool) -> Self {
        let mut vgc = Vgc::new();
        vgc.pal = pal;
        Self {
            vgc,
            iwm: Iwm::new(),
            doc: Doc5503::new(1_023_000, sample_rate),
            glu: SoundGlu::new(),
            adb: AdbDevice::new(),
            rtc: Rtc::new(),
            cards: SlotManager::new(),
            new_video: 0,
            inten: 0,
            intflag: 0,
            speed: 0x80,
            speaker: SpeakerState::default(),
            paddle_values: [0x80; 4],
            paddle_buttons: [false; 3],
            paddle_connected: 0,
            paddle_trigger_ts: 0,
            last_vbl_count: 0,
            warned: [0; 32],
        }
    }

    /// Aggregate IRQ line across every source, evaluated after each
    /// instruction's device ticks.
    #[must_use]
    pub fn irq_asserted(&self) -> bool {
        self.vgc.irq_asserted()
            || self.doc.irq_asserted()
            || self.adb.irq_asserted()
            || self.intflag & self.inten & (mega2_ints::VBL | mega2_ints::QUARTER_SEC) != 0
            || self.cards.irq_asserted()
    }

    /// Latch Mega II timer interrupts as VBLs retire.
    pub fn update_timers(&mut self) {
        let vbls = self.vgc.vbl_count;
        while self.last_vbl_count < vbls {
            self.last_vbl_count += 1;
            self.intflag |= mega2_ints::VBL;
            if self.last_vbl_count % QSEC_VBLS == 0 {
                self.intflag |= mega2_ints::QUARTER_SEC;
            }
        }
    }

    fn warn_once(&mut self, offset: u8, logger: &mut dyn MachineLogger, what: &str) {
        let byte = usize::from(offset / 8);
        let bit = 1 << (offset % 8);
        if self.warned[byte] & bit == 0 {
            self.warned[byte] |= bit;
            logger.log(
                LogLevel::Unimpl,
                &format!("{what} softswitch $C0{offset:02X}"),
            );
        }
    }

    /// Video-mode softswitches shared by reads and writes ($C050-$C05F).
    fn video_switch(&mut self, offset: u8, mem: &mut Memory) {
        let vgc = &mut self.vgc;
        match offset {
            0x50 => vgc.mode_flags &= !mode::TEXT,
            0x51 => vgc.mode_flags |= mode::TEXT,
            0x52 => vgc.mode_flags &= !mode::MIXED,
            0x53 => vgc.mode_flags |= mode::MIXED,
            0x54 | 0x55 => {
                let on = offset & 1 != 0;
                vgc.mode_flags = if on {
                    vgc.mode_flags | mode::TEXT_PAGE2
                } else {
                    vgc.mode_flags & !mode::TEXT_PAGE2
                };
                mem.switches.page2 = on;
                mem.invalidate_map();
            }
            0x56 | 0x57 => {
                let on = offset & 1 != 0;
                vgc.mode_flags = if on {
                    vgc.mode_flags | mode::HIRES
                } else {
                    vgc.mode_flags & !mode::HIRES
                };
                mem.switches.hires = on;
                mem.invalidate_map();
            }
            // Annunciators; AN3 doubles as the double-resolution enable.
            0x5E => vgc.mode_flags |= mode::DHIRES,
            0x5F => vgc.mode_flags &= !mode::DHIRES,
            _ => {}
        }
    }

    /// Status-bit reads at $C011-$C01F: bit 7 carries the answer.
    fn status_bit(&self, offset: u8, mem: &Memory) -> u8 {
        let sw = &mem.switches;
        let bit = match offset {
            0x11 => sw.lc_bank2,
            0x12 => sw.lc_read_ram,
            0x13 => sw.ramrd,
            0x14 => sw.ramwrt,
            0x15 => sw.intcxrom,
            0x16 => sw.altzp,
            0x17 => sw.slotc3rom,
            0x18 => sw.store80,
            0x19 => self.vgc.in_vbl(),
            0x1A => self.vgc.mode_flags & mode::TEXT != 0,
            0x1B => self.vgc.mode_flags & mode::MIXED != 0,
            0x1C => sw.page2,
            0x1D => sw.hires,
            0x1E => self.vgc.mode_flags & mode::ALTCHAR != 0,
            _ => self.vgc.mode_flags & mode::COL80 != 0,
        };
        if bit { 0x80 } else { 0x00 }
    }

    /// STATEREG ($C068) composite.
    fn read_state_register(&self, mem: &Memory) -> u8 {
        let sw = &mem.switches;
        u8::from(sw.intcxrom)
            | (u8::from(sw.lc_bank2) << 2)
            | (u8::from(!sw.lc_read_ram) << 3)
            | (u8::from(sw.ramwrt) << 4)
            | (u8::from(sw.ramrd) << 5)
            | (u8::from(sw.page2) << 6)
            | (u8::from(sw.altzp) << 7)
    }

    fn write_state_register(&mut self, value: u8, mem: &mut Memory) {
        let sw = &mut mem.switches;
        sw.intcxrom = value & 0x01 != 0;
        sw.lc_bank2 = value & 0x04 != 0;
        sw.lc_read_ram = value & 0x08 == 0;
        sw.ramwrt = value & 0x10 != 0;
        sw.ramrd = value & 0x20 != 0;
        sw.page2 = value & 0x40 != 0;
        sw.altzp = value & 0x80 != 0;
        if value & 0x40 != 0 {
            self.vgc.mode_flags |= mode::TEXT_PAGE2;
        } else {
            self.vgc.mode_flags &= !mode::TEXT_PAGE2;
        }
        mem.invalidate_map();
    }

    fn paddle_read(&self, index: usize, ts: u64) -> u8 {
        if self.paddle_connected & (1 << index) == 0 {
            return 0x00;
        }
        let window =
            u64::from(self.paddle_values[index]) * 11 * apple_iwm::CLOCKS_PER_US;
        if ts.saturating_sub(self.paddle_trigger_ts) < window {
            0x80
        } else {
            0x00
        }
    }

    /// Read a $C000-$C0FF register.
    pub fn read(
        &mut self,
        offset: u8,
        mem: &mut Memory,
        tspec: &mut Timespec,
        logger: &mut dyn MachineLogger,
    ) -> u8 {
        match offset {
            0x00..=0x0F => self.adb.keyboard_data(),
            0x10 => self.adb.clear_strobe(),
            0x11..=0x1F => self.status_bit(offset, mem),
            0x22 => self.vgc.text_color,
            0x23 => self.vgc.interrupt_register(),
            0x24 => self.adb.read_mouse(),
            0x25 => self.adb.modifier_keys(),
            0x26 => self.adb.read_data(),
            0x27 => self.adb.read_status(),
            0x29 => self.new_video,
            0x2D => mem.switches.slotromsel,
            0x2E | 0x2F => {
                let (vertical, horizontal) = self.vgc.video_counters(tspec.ts);
                if offset == 0x2E { vertical } else { horizontal }
            }
            0x30 => {
                self.toggle_speaker(tspec.ts);
                0x00
            }
            0x31 => self.iwm.read_disk_reg(),
            0x33 => self.rtc.read_data(),
            0x34 => self.rtc.read_control() | self.vgc.border_color,
            0x35 => mem.switches.shadow,
            0x36 => self.speed,
            0x3C..=0x3F => self.glu.read(offset - 0x3C, &mut self.doc),
            0x41 => self.inten,
            0x46 => self.intflag,
            0x50..=0x5F => {
                self.video_switch(offset, mem);
                0x00
            }
            0x61 => {
                let apple = self.adb.modifier_keys() & apple_adb::modifiers::COMMAND != 0;
                if apple || self.paddle_buttons[0] { 0x80 } else { 0x00 }
            }
            0x62 => {
                let option = self.adb.modifier_keys() & apple_adb::modifiers::OPTION != 0;
                if option || self.paddle_buttons[1] { 0x80 } else { 0x00 }
            }
            0x63 => {
                if self.paddle_buttons[2] { 0x80 } else { 0x00 }
            }
            0x64..=0x67 => self.paddle_read(usize::from(offset - 0x64), tspec.ts),
            0x68 => self.read_state_register(mem),
            0x70 => {
                self.paddle_trigger_ts = tspec.ts;
                0x00
            }
            0x80..=0x8F => {
                mem.lc_access(offset, false);
                0x00
            }
            0x90..=0xDF => {
                let slot = offset >> 4 & 0x07;
                self.cards
                    .io_read(slot, offset & 0x0F, tspec.ts)
                    .unwrap_or_else(|| {
                        self.warn_once(offset, logger, "read of empty-slot");
                        0xFF
                    })
            }
            0xE0..=0xEF => self.iwm.access(offset, None, tspec.ts),
            _ => {
                self.warn_once(offset, logger, "read of unhandled");
                0xFF
            }
        }
    }

    /// Write a $C000-$C0FF register.
    pub fn write(
        &mut self,
        offset: u8,
        value: u8,
        mem: &mut Memory,
        tspec: &mut Timespec,
        logger: &mut dyn MachineLogger,
    ) {
        match offset {
            0x00 | 0x01 => {
                mem.switches.store80 = offset == 0x01;
                mem.invalidate_map();
            }
            0x02 | 0x03 => {
                mem.switches.ramrd = offset == 0x03;
                mem.invalidate_map();
            }
            0x04 | 0x05 => {
                mem.switches.ramwrt = offset == 0x05;
                mem.invalidate_map();
            }
            0x06 | 0x07 => {
                mem.switches.intcxrom = offset == 0x07;
                mem.invalidate_map();
            }
            0x08 | 0x09 => {
                mem.switches.altzp = offset == 0x09;
                mem.invalidate_map();
            }
            0x0A | 0x0B => {
                mem.switches.slotc3rom = offset == 0x0B;
                mem.invalidate_map();
            }
            0x0C | 0x0D => {
                if offset == 0x0D {
                    self.vgc.mode_flags |= mode::COL80;
                } else {
                    self.vgc.mode_flags &= !mode::COL80;
                }
            }
            0x0E | 0x0F => {
                if offset == 0x0F {
                    self.vgc.mode_flags |= mode::ALTCHAR;
                } else {
                    self.vgc.mode_flags &= !mode::ALTCHAR;
                }
            }
            0x10 => {
                let _ = self.adb.clear_strobe();
            }
            0x22 => self.vgc.text_color = value,
            0x23 => self.vgc.write_interrupt_enable(value),
            0x26 => self.adb.write_command(value),
            0x27 => self.adb.write_status(value),
            0x29 => {
                self.new_video = value;
                let flags = &mut self.vgc.mode_flags;
                if value & 0x80 != 0 {
                    *flags |= mode::SUPER_HIRES;
                } else {
                    *flags &= !mode::SUPER_HIRES;
                }
                if value & 0x40 != 0 {
                    *flags |= mode::LINEARIZE;
                } else {
                    *flags &= !mode::LINEARIZE;
                }
            }
            0x2D => {
                mem.switches.slotromsel = value;
                mem.invalidate_map();
            }
            0x30 => self.toggle_speaker(tspec.ts),
            0x31 => self.iwm.write_disk_reg(value),
            0x32 => self.vgc.clear_interrupts(value),
            0x33 => self.rtc.write_data(value),
            0x34 => {
                self.vgc.border_color = value & 0x0F;
                self.rtc.write_control(value, logger);
            }
            0x35 => {
                mem.switches.shadow = value & 0x7F;
                mem.invalidate_map();
            }
            0x36 => {
                self.speed = value;
                tspec.set_fast_speed(value & 0x80 != 0);
            }
            0x3C..=0x3F => self.glu.write(offset - 0x3C, value, &mut self.doc),
            0x41 => self.inten = value & 0x1F,
            0x47 => self.intflag &= !(mega2_ints::VBL | mega2_ints::QUARTER_SEC),
            0x50..=0x5F => self.video_switch(offset, mem),
            0x68 => self.write_state_register(value, mem),
            0x70 => self.paddle_trigger_ts = tspec.ts,
            0x80..=0x8F => mem.lc_access(offset, true),
            0x90..=0xDF => {
                let slot = offset >> 4 & 0x07;
                if self
                    .cards
                    .io_write(slot, offset & 0x0F, value, tspec.ts)
                    .is_none()
                {
                    self.warn_once(offset, logger, "write to empty-slot");
                }
            }
            0xE0..=0xEF => {
                let _ = self.iwm.access(offset, Some(value), tspec.ts);
            }
            _ => self.warn_once(offset, logger, "write to unhandled"),
        }
    }

    fn toggle_speaker(&mut self, ts: u64) {
        self.speaker.level = !self.speaker.level;
        self.speaker.transitions.push((ts, self.speaker.level));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::BANK_SIZE;
    use crate::slab::Slab;
    use crate::NullLogger;

    fn fixture() -> (Mmio, Memory, Timespec) {
        let rom = vec![0xEE; BANK_SIZE];
        let slab = Slab::new(Memory::arena_size(2, rom.len())).expect("arena");
        let mem = Memory::new(slab, 2, &rom).expect("carve");
        (Mmio::new(48_000, false), mem, Timespec::new())
    }

    #[test]
    fn store80_and_page2_route_text_to_aux() {
        let (mut mmio, mut mem, mut tspec) = fixture();
        let mut logger = NullLogger;
        mmio.write(0x01, 0, &mut mem, &mut tspec, &mut logger);
        mmio.read(0x55, &mut mem, &mut tspec, &mut logger);
        mem.sync_map();
        let desc = mem.descriptor(0x00_0400);
        assert_eq!(desc.write_bank, 1);
        assert_eq!(mmio.read(0x18, &mut mem, &mut tspec, &mut logger), 0x80);
        assert_eq!(mmio.read(0x1C, &mut mem, &mut tspec, &mut logger), 0x80);
    }

    #[test]
    fn new_video_sets_super_hires() {
        let (mut mmio, mut mem, mut tspec) = fixture();
        let mut logger = NullLogger;
        mmio.write(0x29, 0xC0, &mut mem, &mut tspec, &mut logger);
        assert_ne!(mmio.vgc.mode_flags & mode::SUPER_HIRES, 0);
        assert_eq!(mmio.read(0x29, &mut mem, &mut tspec, &mut logger), 0xC0);
    }

    #[test]
    fn speed_register_drops_to_1mhz() {
        let (mut mmio, mut mem, mut tspec) = fixture();
        let mut logger = NullLogger;
        assert!(tspec.is_fast_speed());
        mmio.write(0x36, 0x00, &mut mem, &mut tspec, &mut logger);
        assert!(!tspec.is_fast_speed());
        mmio.write(0x36, 0x80, &mut mem, &mut tspec, &mut logger);
        assert!(tspec.is_fast_speed());
    }

    #[test]
    fn state_register_round_trips() {
        let (mut mmio, mut mem, mut tspec) = fixture();
        let mut logger = NullLogger;
        mmio.write(0x68, 0xB5, &mut mem, &mut tspec, &mut logger);
        assert_eq!(mmio.read(0x68, &mut mem, &mut tspec, &mut logger), 0xB5);
        assert!(mem.switches.altzp);
        assert!(mem.switches.ramrd);
    }

    #[test]
    fn unknown_register_warns_once_and_reads_ff() {
        let (mut mmio, mut mem, mut tspec) = fixture();
        let sink = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut logger = crate::VecLogger(sink.clone());
        assert_eq!(mmio.read(0x42, &mut mem, &mut tspec, &mut logger), 0xFF);
        assert_eq!(mmio.read(0x42, &mut mem, &mut tspec, &mut logger), 0xFF);
        let logged = sink.lock().expect("sink");
        assert_eq!(logged.len(), 1, "warn exactly once per offset");
        assert_eq!(logged[0].0, LogLevel::Unimpl);
    }

    #[test]
    fn speaker_toggles_record_transitions() {
        let (mut mmio, mut mem, mut tspec) = fixture();
        let mut logger = NullLogger;
        tspec.ts = 100;
        mmio.read(0x30, &mut mem, &mut tspec, &mut logger);
        tspec.ts = 200;
        mmio.write(0x30, 0, &mut mem, &mut tspec, &mut logger);
        assert_eq!(
            mmio.speaker.transitions,
            vec![(100, true), (200, false)]
        );
    }

    #[test]
    fn mega2_vbl_interrupt_latches() {
        let (mut mmio, mut mem, mut tspec) = fixture();
        let mut logger = NullLogger;
        mmio.write(0x41, mega2_ints::VBL, &mut mem, &mut tspec, &mut logger);
        mmio.vgc.vbl_count = 1;
        mmio.update_timers();
        assert!(mmio.irq_asserted());
        mmio.write(0x47, 0, &mut mem, &mut tspec, &mut logger);
        assert!(!mmio.irq_asserted());
    }

    #[test]
    fn paddle_timer_window() {
        let (mut mmio, mut mem, mut tspec) = fixture();
        let mut logger = NullLogger;
        mmio.paddle_connected = 1;
        mmio.paddle_values[0] = 100;
        tspec.ts = 1000;
        mmio.read(0x70, &mut mem, &mut tspec, &mut logger);
        assert_eq!(mmio.read(0x64, &mut mem, &mut tspec, &mut logger), 0x80);
        tspec.ts = 1000 + 100 * 11 * apple_iwm::CLOCKS_PER_US;
        assert_eq!(mmio.read(0x64, &mut mem, &mut tspec, &mut logger), 0x00);
    }
}
