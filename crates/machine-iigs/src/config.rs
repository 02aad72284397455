//! Machine construction parameters.

/// Configuration for a new machine.
#[derive(Debug, Clone)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct MachineConfig {
    /// Fast-RAM size in 64 KiB banks (2..=128; ROM 3 machines ship with 16).
    pub ram_banks: u8,
    /// ROM image (256 KiB for ROM 3). Mapped into the top banks.
    #[serde(skip)]
    pub rom: Vec<u8>,
    /// Where the ROM came from, recorded in snapshots.
    pub rom_path: String,
    /// Host audio sample rate in Hz.
    pub audio_sample_rate: u32,
    /// PAL timing (50 Hz 1-second interrupt cadence).
    pub pal: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            ram_banks: 16,
            rom: Vec::new(),
            rom_path: String::new(),
            audio_sample_rate: 48_000,
            pal: false,
        }
    }
}

impl MachineConfig {
    /// ROM size in whole banks.
    #[must_use]
    pub fn rom_banks(&self) -> u8 {
        (self.rom.len().div_ceil(0x1_0000)).min(4) as u8
    }
}
