//! The Apple IIgs machine.
//!
//! One `Machine` owns everything: the 65C816, the unit clock, the banked
//! memory map with shadowing, the $C000-$C0FF softswitch file, and the
//! Mega II devices (VGC, IWM, DOC, ADB, RTC, card slots). A single thread
//! drives it: `step()` runs one CPU instruction, then ticks every device up
//! to the new clock and re-evaluates the IRQ line.
//!
//! The host talks to a running machine through [`driver::EmulatorDriver`]:
//! a bounded command queue in, published frames and a lock-free audio ring
//! out.

mod audio;
mod cards;
mod config;
mod driver;
mod input;
mod machine;
mod memory;
mod mmio;
mod rtc;
mod slab;
mod snapshot;

pub use audio::mix_speaker_transitions;
pub use cards::{Card, HardDiskCard, Mockingboard, SlotManager};
pub use config::MachineConfig;
pub use driver::{Command, EmulatorDriver, FrameState};
pub use input::{InputEvent, InputType};
pub use machine::{DriveSlot, DriveStatus, EjectedDisk, Machine};
pub use memory::{Memory, PageDescriptor, page_flags};
pub use mmio::Mmio;
pub use rtc::Rtc;
pub use slab::Slab;
pub use snapshot::{SNAPSHOT_VERSION, load_snapshot, load_snapshot_quiet, save_snapshot};

use thiserror::Error;

/// Machine lifecycle state. A FATAL condition parks the machine in
/// `Failed`; stepping a failed machine is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum MachineStatus {
    Initialized,
    Running,
    Failed,
}

/// Errors surfaced to the host. Everything else is logged and recovered.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("disk mount failed: {0}")]
    MountFailed(String),
    #[error("disk save failed: {0}")]
    SaveFailed(String),
    #[error("corrupted snapshot: {0}")]
    CorruptedSnapshot(String),
    #[error("snapshot version {0} is newer than this build supports")]
    UnsupportedSnapshotVersion(u32),
    #[error("allocation failed: machine needs {0} bytes")]
    AllocationFailed(usize),
}

/// Log severity for the machine logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    /// Recoverable oddity (unmapped access, bad softswitch pattern).
    Warn,
    /// Reachable but unimplemented hardware surface.
    Unimpl,
    /// Machine transitions to Failed.
    Fatal,
}

/// Host-provided logging sink. The default discards everything.
pub trait MachineLogger: Send {
    fn log(&mut self, level: LogLevel, message: &str);
}

/// The default no-op logger.
pub struct NullLogger;

impl MachineLogger for NullLogger {
    fn log(&mut self, _level: LogLevel, _message: &str) {}
}

/// A logger that collects messages, used by tests.
#[derive(Default)]
pub struct VecLogger(pub std::sync::Arc<std::sync::Mutex<Vec<(LogLevel, String)>>>);

impl MachineLogger for VecLogger {
    fn log(&mut self, level: LogLevel, message: &str) {
        if let Ok(mut sink) = self.0.lock() {
            sink.push((level, message.to_string()));
        }
    }
}
