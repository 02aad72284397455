//! Battery-backed real-time clock and 256 bytes of BRAM.
//!
//! The host CPU talks to the clock chip one strobed byte at a time through
//! $C033 (data) and $C034 (control, bit 7 = strobe, bit 6 = read). A
//! transaction is command → optional extended-address byte → data:
//!
//! - `0b?00x_xx01` addresses one of the four seconds registers.
//! - `0b?011_1aaa` + `0baa_aaa?00` is the extended BRAM command carrying an
//!   8-bit address across the two bytes.
//!
//! Bit 7 of the command selects read; reads latch the result into $C033
//! for the host to collect. Anything else is a protocol violation: logged,
//! transaction dropped.

use crate::{LogLevel, MachineLogger};

/// Where a decoded command points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
enum Target {
    ClockByte(u8),
    Bram(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
enum Phase {
    #[default]
    Idle,
    /// Extended BRAM command: waiting for the low-address byte.
    BramAddress { read: bool, high: u8 },
    /// Write command decoded: next strobed byte is the payload.
    WriteData(Target),
}

/// The clock chip.
#[derive(Debug, Clone)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Rtc {
    /// Seconds since midnight, January 1, 1904.
    pub seconds_1904: u32,
    bram: Vec<u8>,
    /// Set on any BRAM write; host clears via [`Rtc::bram`] persistence.
    pub bram_dirty: bool,
    data_latch: u8,
    phase: Phase,
    /// Clock advance bookkeeping (unit ticks).
    ts_last_second: u64,
}

impl Default for Rtc {
    fn default() -> Self {
        Self::new()
    }
}

/// Unit clocks per wall second (65 PHI0 cycles × 262 lines × 60 fields).
const CLOCKS_PER_SECOND: u64 = emu_core::CLOCKS_PER_SCANLINE * 262 * 60;

impl Rtc {
    #[must_use]
    pub fn new() -> Self {
        Self {
            seconds_1904: 0,
            bram: vec![0; 256],
            bram_dirty: false,
            data_latch: 0,
            phase: Phase::Idle,
            ts_last_second: 0,
        }
    }

    /// Host sets wall-clock time.
    pub fn set_time(&mut self, seconds_1904: u32) {
        self.seconds_1904 = seconds_1904;
    }

    /// Advance the internal 1 Hz counter against the unit clock.
    pub fn tick(&mut self, ts: u64) {
        while ts.saturating_sub(self.ts_last_second) >= CLOCKS_PER_SECOND {
            self.ts_last_second += CLOCKS_PER_SECOND;
            self.seconds_1904 = self.seconds_1904.wrapping_add(1);
        }
    }

    /// Borrow the BRAM contents and clear the dirty flag (host persists).
    pub fn bram(&mut self) -> &[u8] {
        self.bram_dirty = false;
        &self.bram
    }

    /// Replace BRAM wholesale (host restore).
    pub fn load_bram(&mut self, data: &[u8]) {
        let len = data.len().min(self.bram.len());
        self.bram[..len].copy_from_slice(&data[..len]);
        self.bram_dirty = false;
    }

    /// $C033 read.
    #[must_use]
    pub fn read_data(&self) -> u8 {
        self.data_latch
    }

    /// $C033 write.
    pub fn write_data(&mut self, value: u8) {
        self.data_latch = value;
    }

    /// $C034 read: transaction always ready from the host's view.
    #[must_use]
    pub fn read_control(&self) -> u8 {
        0x00
    }

    /// $C034 write: bit 7 strobes the byte sitting in $C033 through the
    /// protocol machine.
    pub fn write_control(&mut self, value: u8, logger: &mut dyn MachineLogger) {
        if value & 0x80 == 0 {
            return;
        }
        self.strobe(logger);
    }

    fn strobe(&mut self, logger: &mut dyn MachineLogger) {
        let byte = self.data_latch;
        self.phase = match self.phase {
            Phase::Idle => {
                let read = byte & 0x80 != 0;
                let body = byte & 0x7F;
                if body & 0x78 == 0x38 {
                    Phase::BramAddress {
                        read,
                        high: body & 0x07,
                    }
                } else if body & 0x63 == 0x01 {
                    let target = Target::ClockByte((body >> 2) & 0x03);
                    self.resolve(target, read)
                } else {
                    logger.log(
                        LogLevel::Warn,
                        &format!("clock chip: invalid command ${byte:02X}"),
                    );
                    Phase::Idle
                }
            }
            Phase::BramAddress { read, high } => {
                let address = (high << 5) | ((byte >> 2) & 0x1F);
                self.resolve(Target::Bram(address), read)
            }
            Phase::WriteData(target) => {
                match target {
                    Target::ClockByte(index) => {
                        let shift = u32::from(index) * 8;
                        self.seconds_1904 = (self.seconds_1904 & !(0xFF << shift))
                            | (u32::from(byte) << shift);
                    }
                    Target::Bram(address) => {
                        self.bram[usize::from(address)] = byte;
                        self.bram_dirty = true;
                    }
                }
                Phase::Idle
            }
        };
    }

    /// Reads complete immediately into the data latch; writes wait for the
    /// payload byte.
    fn resolve(&mut self, target: Target, read: bool) -> Phase {
        if read {
            self.data_latch = match target {
                Target::ClockByte(index) => {
                    (self.seconds_1904 >> (u32::from(index) * 8)) as u8
                }
                Target::Bram(address) => self.bram[usize::from(address)],
            };
            Phase::Idle
        } else {
            Phase::WriteData(target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullLogger;

    fn strobe(rtc: &mut Rtc, byte: u8) {
        rtc.write_data(byte);
        rtc.write_control(0x80, &mut NullLogger);
    }

    #[test]
    fn clock_register_read() {
        let mut rtc = Rtc::new();
        rtc.set_time(0xAABB_CCDD);
        strobe(&mut rtc, 0x81); // read seconds byte 0
        assert_eq!(rtc.read_data(), 0xDD);
        strobe(&mut rtc, 0x8D); // read seconds byte 3
        assert_eq!(rtc.read_data(), 0xAA);
    }

    #[test]
    fn clock_register_write() {
        let mut rtc = Rtc::new();
        strobe(&mut rtc, 0x01); // write seconds byte 0
        strobe(&mut rtc, 0x42);
        assert_eq!(rtc.seconds_1904 & 0xFF, 0x42);
    }

    #[test]
    fn bram_write_read_round_trip() {
        let mut rtc = Rtc::new();
        // Address $A5 = high 0b101, low 0b00101.
        strobe(&mut rtc, 0x38 | 0x05); // write command, high bits
        strobe(&mut rtc, 0x05 << 2); // low bits
        strobe(&mut rtc, 0x5A); // payload
        assert!(rtc.bram_dirty);
        assert_eq!(rtc.bram[0xA5], 0x5A);

        strobe(&mut rtc, 0x80 | 0x38 | 0x05);
        strobe(&mut rtc, 0x05 << 2);
        assert_eq!(rtc.read_data(), 0x5A);
    }

    #[test]
    fn bram_dirty_clears_on_persist() {
        let mut rtc = Rtc::new();
        strobe(&mut rtc, 0x38);
        strobe(&mut rtc, 0x00);
        strobe(&mut rtc, 0x11);
        assert!(rtc.bram_dirty);
        let copy: Vec<u8> = rtc.bram().to_vec();
        assert_eq!(copy[0], 0x11);
        assert!(!rtc.bram_dirty);
    }

    #[test]
    fn invalid_command_logged_and_ignored() {
        let mut rtc = Rtc::new();
        let sink = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut logger = crate::VecLogger(sink.clone());
        rtc.write_data(0x7E);
        rtc.write_control(0x80, &mut logger);
        assert_eq!(sink.lock().expect("sink").len(), 1);
        // Machine keeps running; the next valid command works.
        strobe(&mut rtc, 0x81);
        assert_eq!(rtc.read_data(), 0x00);
    }

    #[test]
    fn one_hz_counter_advances_seconds() {
        let mut rtc = Rtc::new();
        rtc.tick(CLOCKS_PER_SECOND - 1);
        assert_eq!(rtc.seconds_1904, 0);
        rtc.tick(CLOCKS_PER_SECOND * 3);
        assert_eq!(rtc.seconds_1904, 3);
    }
}
