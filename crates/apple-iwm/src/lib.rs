//! Integrated Woz Machine: the IIgs floppy controller.
//!
//! The IWM is driven entirely through the sixteen softswitches at
//! $C0E0-$C0EF: eight latch the four head-phase lines, two the spindle
//! enable, two the drive select, and four the Q6/Q7 state pair that picks
//! the controller mode:
//!
//! | Q7 | Q6 | Mode |
//! |----|----|------|
//! | 0  | 0  | read data (shift register → latch) |
//! | 0  | 1  | read status (write-protect sense, enable) |
//! | 1  | 0  | read write handshake |
//! | 1  | 1  | write data port / mode register |
//!
//! Bit cells are 4 µs (2 µs in fast mode), measured in unit-clock ticks;
//! seven ticks approximate one microsecond on the slow bus.

mod drive;
mod smartport;

pub use drive::{Drive, DriveKind};
pub use smartport::{SmartPortBus, SmartPortDevice, SmartPortStatus};

/// Unit clocks per microsecond on the slow bus (1.023 MHz PHI0 ≈ 1 µs per
/// cycle of 7 units).
pub const CLOCKS_PER_US: u64 = 7;

/// 4 µs bit cell (normal) and 2 µs (fast mode).
pub const BIT_CELL_CLOCKS: u64 = 4 * CLOCKS_PER_US;
pub const BIT_CELL_CLOCKS_FAST: u64 = 2 * CLOCKS_PER_US;

/// Spindle keeps turning this long after motor-off (1 second).
pub const SPIN_DOWN_CLOCKS: u64 = 1_000_000 * CLOCKS_PER_US;

/// Mode register bits.
pub mod mode_bits {
    /// Latch mode: read latch holds a full byte time.
    pub const LATCH: u8 = 0x01;
    /// Asynchronous write handshake.
    pub const ASYNC: u8 = 0x02;
    /// Motor-off happens immediately, without the 1-second delay.
    pub const NO_SPIN_DELAY: u8 = 0x04;
    /// 2 µs bit cells.
    pub const FAST: u8 = 0x08;
    /// 8 MHz reference (unused by the IIgs; kept readable).
    pub const CLOCK_8MHZ: u8 = 0x10;
}

/// The IWM plus its two drive bays per bus (5.25" and 3.5").
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Iwm {
    /// Head-phase outputs (bits 0-3).
    pub phases: u8,
    /// Q6/Q7 switches.
    pub q6: bool,
    pub q7: bool,
    /// Spindle enable switch ($C0E8/9).
    pub motor_on: bool,
    /// Second-drive select ($C0EA/B).
    pub drive_two: bool,
    /// 3.5" bus select (DISKREG bit 6).
    pub select_35: bool,
    /// 3.5" head select (DISKREG bit 7).
    pub head_35: u8,
    /// Mode register.
    pub mode: u8,
    /// Read shift register and data latch.
    shift: u8,
    latch: u8,
    /// Write shift state.
    write_shift: u8,
    write_bits: u8,
    write_buffer: Option<u8>,
    write_underrun: bool,
    /// Clock of the last processed bit cell.
    ts_last_cell: u64,
    /// 5.25" drives.
    pub drives_525: [Drive; 2],
    /// 3.5" drives.
    pub drives_35: [Drive; 2],
    /// SmartPort devices share the 3.5" bus.
    pub smartport: SmartPortBus,
}

impl Default for Iwm {
    fn default() -> Self {
        Self::new()
    }
}

impl Iwm {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phases: 0,
            q6: false,
            q7: false,
            motor_on: false,
            drive_two: false,
            select_35: false,
            head_35: 0,
            mode: 0,
            shift: 0,
            latch: 0,
            write_shift: 0,
            write_bits: 0,
            write_buffer: None,
            write_underrun: false,
            ts_last_cell: 0,
            drives_525: [Drive::new(DriveKind::Disk525), Drive::new(DriveKind::Disk525)],
            drives_35: [Drive::new(DriveKind::Disk35), Drive::new(DriveKind::Disk35)],
            smartport: SmartPortBus::new(),
        }
    }

    /// Index of the selected drive on the active bus.
    fn drive_index(&self) -> usize {
        usize::from(self.drive_two)
    }

    /// The selected drive, by bus.
    #[must_use]
    pub fn active_drive(&self) -> &Drive {
        if self.select_35 {
            &self.drives_35[self.drive_index()]
        } else {
            &self.drives_525[self.drive_index()]
        }
    }

    pub fn active_drive_mut(&mut self) -> &mut Drive {
        let index = self.drive_index();
        if self.select_35 {
            &mut self.drives_35[index]
        } else {
            &mut self.drives_525[index]
        }
    }

    /// DISKREG ($C031) write: bit 6 selects the 3.5" bus, bit 7 the 3.5"
    /// head.
    pub fn write_disk_reg(&mut self, value: u8) {
        self.select_35 = value & 0x40 != 0;
        self.head_35 = (value >> 7) & 1;
        let head = self.head_35;
        for drive in &mut self.drives_35 {
            drive.side = head;
        }
    }

    #[must_use]
    pub fn read_disk_reg(&self) -> u8 {
        (u8::from(self.select_35) << 6) | (self.head_35 << 7)
    }

    /// Access one of the $C0E0-$C0EF softswitches. Both reads and writes
    /// toggle the addressed switch; reads return data per the Q6/Q7 mode.
    pub fn access(&mut self, offset: u8, value: Option<u8>, ts: u64) -> u8 {
        self.tick(ts);
        match offset & 0x0F {
            0x0..=0x7 => {
                let phase = (offset >> 1) & 3;
                let on = offset & 1 != 0;
                self.set_phase(phase, on);
            }
            0x8 => self.set_motor(false, ts),
            0x9 => self.set_motor(true, ts),
            0xA => self.select_drive(false),
            0xB => self.select_drive(true),
            0xC => self.q6 = false,
            0xD => self.q6 = true,
            0xE => self.q7 = false,
            _ => self.q7 = true,
        }
        match (self.q7, self.q6) {
            (false, false) => {
                if offset & 1 == 0 {
                    self.read_data()
                } else {
                    0xFF
                }
            }
            (false, true) => self.read_status(),
            (true, false) => self.read_handshake(),
            (true, true) => {
                if let Some(v) = value {
                    self.write_port(v);
                }
                0xFF
            }
        }
    }

    fn set_phase(&mut self, phase: u8, on: bool) {
        let before = self.phases;
        if on {
            self.phases |= 1 << phase;
        } else {
            self.phases &= !(1 << phase);
        }
        if self.phases == before {
            return;
        }
        if self.select_35 {
            // 3.5" drives take commands over the phase lines; PH3 is the
            // strobe. SmartPort devices watch the same lines.
            self.smartport.phase_transition(self.phases);
            if on && phase == 3 {
                let command = ((self.phases >> 1) & 0x03) | (self.head_35 << 2);
                let index = self.drive_index();
                self.drives_35[index].command_35(command, self.phases & 1 != 0);
            }
        } else {
            let index = self.drive_index();
            self.drives_525[index].step_phases(self.phases);
        }
    }

    fn set_motor(&mut self, on: bool, ts: u64) {
        self.motor_on = on;
        let no_delay = self.mode & mode_bits::NO_SPIN_DELAY != 0;
        let index = self.drive_index();
        let drive = if self.select_35 {
            &mut self.drives_35[index]
        } else {
            &mut self.drives_525[index]
        };
        if on {
            drive.spin_up();
        } else {
            drive.spin_down(ts, no_delay);
        }
    }

    fn select_drive(&mut self, two: bool) {
        self.drive_two = two;
    }

    fn bit_cell_clocks(&self) -> u64 {
        if self.mode & mode_bits::FAST != 0 {
            BIT_CELL_CLOCKS_FAST
        } else {
            BIT_CELL_CLOCKS
        }
    }

    /// Run the shift machinery up to the given clock, one bit cell at a
    /// time.
    pub fn tick(&mut self, ts: u64) {
        let cell = self.bit_cell_clocks();
        while self.ts_last_cell + cell <= ts {
            self.ts_last_cell += cell;
            self.tick_cell(self.ts_last_cell);
        }
    }

    fn tick_cell(&mut self, ts: u64) {
        let writing = self.q7;
        let index = self.drive_index();
        let drive = if self.select_35 {
            &mut self.drives_35[index]
        } else {
            &mut self.drives_525[index]
        };
        drive.update_spindle(ts);
        if !drive.is_spinning() {
            return;
        }
        if writing {
            if self.write_bits == 0 {
                match self.write_buffer.take() {
                    Some(byte) => {
                        self.write_shift = byte;
                        self.write_bits = 8;
                    }
                    None => {
                        self.write_underrun = true;
                        return;
                    }
                }
            }
            let bit = self.write_shift & 0x80 != 0;
            drive.write_bit(bit);
            self.write_shift <<= 1;
            self.write_bits -= 1;
        } else {
            let bit = drive.read_bit();
            self.shift = (self.shift << 1) | u8::from(bit);
            if self.shift & 0x80 != 0 {
                self.latch = self.shift;
                self.shift = 0;
            }
        }
    }

    /// Q7=0 Q6=0: data port. Reading a latched nibble clears it so the
    /// next one can latch.
    fn read_data(&mut self) -> u8 {
        let value = self.latch;
        if value & 0x80 != 0 {
            self.latch = 0;
        }
        value
    }

    /// Q7=0 Q6=1: status — bit 7 write-protect sense (or 3.5" status
    /// query), bit 5 spindle enable, low bits mode register.
    fn read_status(&mut self) -> u8 {
        let sense = if self.select_35 {
            let command = ((self.phases >> 1) & 0x03) | (self.head_35 << 2);
            let index = self.drive_index();
            self.drives_35[index].sense_35(command, self.phases & 1 != 0)
        } else {
            self.active_drive().write_protected()
        };
        let mut value = self.mode & 0x1F;
        if self.motor_on {
            value |= 0x20;
        }
        if sense {
            value |= 0x80;
        }
        value
    }

    /// Q7=1 Q6=0: write handshake — bit 7 register ready, bit 6 underrun
    /// (held until the next mode write).
    fn read_handshake(&self) -> u8 {
        let mut value = 0x3F;
        if self.write_buffer.is_none() {
            value |= 0x80;
        }
        if !self.write_underrun {
            value |= 0x40;
        }
        value
    }

    /// Q7=1 Q6=1 write: mode register while the spindle is off, data
    /// otherwise.
    fn write_port(&mut self, value: u8) {
        if self.motor_on {
            if self.write_buffer.is_some() {
                self.write_underrun = true;
            }
            self.write_buffer = Some(value);
        } else {
            self.mode = value & 0x1F;
            self.write_underrun = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use format_woz::{DiskType, NibbleDisk};

    fn disk_with_pattern() -> NibbleDisk {
        let mut disk = NibbleDisk::new(DiskType::Disk525);
        // One track of repeating $D5 nibbles.
        let track = disk.add_track(&[0xD5; 64], 64 * 8);
        for qtr in 0..4 {
            disk.meta_track_map[qtr] = track;
        }
        disk
    }

    #[test]
    fn q6_q7_switch_decode() {
        let mut iwm = Iwm::new();
        iwm.access(0x0D, None, 0);
        assert!(iwm.q6);
        iwm.access(0x0F, None, 0);
        assert!(iwm.q7);
        iwm.access(0x0C, None, 0);
        iwm.access(0x0E, None, 0);
        assert!(!iwm.q6 && !iwm.q7);
    }

    #[test]
    fn mode_register_written_with_motor_off() {
        let mut iwm = Iwm::new();
        iwm.access(0x0D, None, 0); // Q6 on
        iwm.access(0x0F, None, 0); // Q7 on
        iwm.access(0x0F, Some(mode_bits::FAST | mode_bits::LATCH), 0);
        assert_eq!(iwm.mode, mode_bits::FAST | mode_bits::LATCH);
    }

    #[test]
    fn read_data_latches_nibbles_from_disk() {
        let mut iwm = Iwm::new();
        iwm.drives_525[0].insert_disk(disk_with_pattern());
        iwm.access(0x09, None, 0); // motor on
        // Spin through enough bit cells for a nibble: 8 cells of 28 clocks.
        let value = iwm.access(0x0C, None, 8 * BIT_CELL_CLOCKS + 1);
        assert_eq!(value, 0xD5);
        // Reading clears the latch; with no further cells it reads zero.
        let value = iwm.access(0x0C, None, 8 * BIT_CELL_CLOCKS + 2);
        assert_eq!(value, 0x00);
    }

    #[test]
    fn phase_stepping_advances_quarter_tracks() {
        let mut iwm = Iwm::new();
        iwm.drives_525[0].insert_disk(disk_with_pattern());
        // Energize phase 0 (head settled at track 0), then walk 1, 2, 3.
        iwm.access(0x01, None, 0);
        iwm.access(0x00, None, 0);
        assert_eq!(iwm.drives_525[0].qtr_track_index, 0);
        for (on, off) in [(0x03, 0x02), (0x05, 0x04), (0x07, 0x06)] {
            iwm.access(on, None, 0);
            iwm.access(off, None, 0);
        }
        assert_eq!(
            iwm.drives_525[0].qtr_track_index, 6,
            "2 quarter tracks per phase step"
        );
    }

    #[test]
    fn status_reflects_write_protect() {
        let mut iwm = Iwm::new();
        let mut disk = disk_with_pattern();
        disk.write_protected = true;
        iwm.drives_525[0].insert_disk(disk);
        // $C0ED flips Q6 on and, with Q7 off, returns the status register.
        let status = iwm.access(0x0D, None, 0);
        assert_ne!(status & 0x80, 0);
    }

    #[test]
    fn write_underrun_flag_in_handshake() {
        let mut iwm = Iwm::new();
        iwm.drives_525[0].insert_disk(disk_with_pattern());
        iwm.access(0x09, None, 0); // motor on
        iwm.access(0x0D, None, 0);
        iwm.access(0x0F, None, 0); // write data mode
        iwm.access(0x0F, Some(0xD5), 0);
        // Let more than a byte of cells pass with nothing queued.
        iwm.tick(20 * BIT_CELL_CLOCKS);
        iwm.access(0x0C, None, 20 * BIT_CELL_CLOCKS + 1); // Q6 off → handshake
        let handshake = iwm.read_handshake();
        assert_eq!(handshake & 0x40, 0, "underrun bit drops low");
    }

    #[test]
    fn disk_reg_selects_35_bus() {
        let mut iwm = Iwm::new();
        iwm.write_disk_reg(0xC0);
        assert!(iwm.select_35);
        assert_eq!(iwm.head_35, 1);
        assert_eq!(iwm.read_disk_reg(), 0xC0);
    }
}
