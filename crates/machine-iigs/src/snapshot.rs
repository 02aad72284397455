//! Machine snapshots: MessagePack with a top-level named map.
//!
//! Layout: `{version, config, slab, machine, mmio, cards, storage}`. The
//! `machine` blob carries CPU + clock + the whole memory arena (ROM
//! included), so a restored machine replays identically. The version gate
//! rejects snapshots newer than this build; unknown card names are
//! tolerated with a warning and an empty slot.

use serde::{Deserialize, Serialize};
use std::sync::PoisonError;

use format_2img::{BlockDisk, SectorOrder};

use crate::cards::{Card, HardDiskCard, Mockingboard};
use crate::config::MachineConfig;
use crate::machine::Machine;
use crate::memory::Memory;
use crate::mmio::Mmio;
use crate::{LogLevel, MachineError, MachineLogger, MachineStatus, NullLogger};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SnapshotConfig {
    memory: u8,
    audio_samples: u32,
    rompath: String,
    pal: bool,
}

#[derive(Serialize)]
struct MachineStateRef<'a> {
    cpu: &'a wdc_65c816::Cpu65C816,
    tspec: &'a emu_core::Timespec,
    mem: &'a Memory,
    ts_last_devices: u64,
    phi0_residual: u64,
    ts_audio_window: u64,
    speaker_level: bool,
}

#[derive(Deserialize)]
struct MachineState {
    cpu: wdc_65c816::Cpu65C816,
    tspec: emu_core::Timespec,
    mem: Memory,
    ts_last_devices: u64,
    phi0_residual: u64,
    ts_audio_window: u64,
    speaker_level: bool,
}

#[derive(Serialize, Deserialize)]
struct CardEntry {
    slot: u8,
    name: String,
    card: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct StorageState {
    /// Eject formats for the four floppy bays (disks ride in `mmio.iwm`).
    drive_sources: [Option<SectorOrder>; 4],
    /// SmartPort block images in chain order.
    smartport: Vec<BlockDisk>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    config: SnapshotConfig,
    slab: u64,
    machine: MachineStateRef<'a>,
    mmio: &'a Mmio,
    cards: Vec<CardEntry>,
    storage: StorageState,
}

#[derive(Deserialize)]
struct SnapshotFile {
    version: u32,
    config: SnapshotConfig,
    slab: u64,
    machine: MachineState,
    mmio: Mmio,
    cards: Vec<CardEntry>,
    storage: StorageState,
}

/// Serialize a machine.
pub fn save_snapshot(machine: &Machine) -> Result<Vec<u8>, MachineError> {
    let cards = machine
        .mmio
        .cards
        .occupied_slots()
        .map(|(slot, card)| CardEntry {
            slot,
            name: card.name().to_string(),
            card: card.save_state(),
        })
        .collect();
    let storage = StorageState {
        drive_sources: machine.drive_sources,
        smartport: machine
            .smart_disks
            .iter()
            .map(|shared| {
                shared
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone()
            })
            .collect(),
    };
    let snapshot = SnapshotRef {
        version: SNAPSHOT_VERSION,
        config: SnapshotConfig {
            memory: machine.config.ram_banks,
            audio_samples: machine.config.audio_sample_rate,
            rompath: machine.config.rom_path.clone(),
            pal: machine.config.pal,
        },
        slab: machine.mem.slab.capacity() as u64,
        machine: MachineStateRef {
            cpu: &machine.cpu,
            tspec: &machine.tspec,
            mem: &machine.mem,
            ts_last_devices: machine.ts_last_devices,
            phi0_residual: machine.phi0_residual,
            ts_audio_window: machine.ts_audio_window,
            speaker_level: machine.speaker_level_at_window,
        },
        mmio: &machine.mmio,
        cards,
        storage,
    };
    rmp_serde::to_vec_named(&snapshot)
        .map_err(|e| MachineError::CorruptedSnapshot(e.to_string()))
}

fn card_by_name(name: &str) -> Option<Box<dyn Card>> {
    match name {
        "mockingboard" => Some(Box::new(Mockingboard::new())),
        "hddcard" => Some(Box::new(HardDiskCard::new(None))),
        _ => None,
    }
}

/// Rebuild a machine from a snapshot. On failure the snapshot is rejected
/// and no machine is produced; the caller discards any prior machine.
pub fn load_snapshot(
    data: &[u8],
    mut logger: Box<dyn MachineLogger>,
) -> Result<Machine, MachineError> {
    let snapshot: SnapshotFile = rmp_serde::from_slice(data)
        .map_err(|e| MachineError::CorruptedSnapshot(e.to_string()))?;
    if snapshot.version > SNAPSHOT_VERSION {
        return Err(MachineError::UnsupportedSnapshotVersion(snapshot.version));
    }
    if snapshot.machine.mem.slab.capacity() as u64 != snapshot.slab {
        return Err(MachineError::CorruptedSnapshot(
            "slab size disagrees with memory blob".into(),
        ));
    }

    let mut mmio = snapshot.mmio;
    for entry in snapshot.cards {
        match card_by_name(&entry.name) {
            Some(mut card) => {
                if !card.load_state(&entry.card) {
                    return Err(MachineError::CorruptedSnapshot(format!(
                        "card state for {} is malformed",
                        entry.name
                    )));
                }
                mmio.cards.insert(entry.slot, card);
            }
            None => {
                logger.log(
                    LogLevel::Warn,
                    &format!("unknown card '{}' in slot {}; leaving it empty", entry.name, entry.slot),
                );
            }
        }
    }

    let config = MachineConfig {
        ram_banks: snapshot.config.memory,
        rom: Vec::new(), // the arena in the snapshot already holds ROM
        rom_path: snapshot.config.rompath,
        audio_sample_rate: snapshot.config.audio_samples,
        pal: snapshot.config.pal,
    };

    let mut mem = snapshot.machine.mem;
    mem.invalidate_map();
    mem.sync_map();

    let mut machine = Machine {
        cpu: snapshot.machine.cpu,
        tspec: snapshot.machine.tspec,
        mem,
        mmio,
        config,
        status: MachineStatus::Initialized,
        logger,
        smart_disks: Vec::new(),
        drive_sources: snapshot.storage.drive_sources,
        drive_save_failed: [false; 4],
        ts_last_devices: snapshot.machine.ts_last_devices,
        phi0_residual: snapshot.machine.phi0_residual,
        ts_audio_window: snapshot.machine.ts_audio_window,
        speaker_level_at_window: snapshot.machine.speaker_level,
        mouse_abs: (0, 0),
    };
    for image in snapshot.storage.smartport {
        machine.attach_block_disk(image);
    }
    Ok(machine)
}

/// Convenience: load with a discarding logger.
pub fn load_snapshot_quiet(data: &[u8]) -> Result<Machine, MachineError> {
    load_snapshot(data, Box::new(NullLogger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::BANK_SIZE;

    fn test_machine() -> Machine {
        let mut rom = vec![0x60u8; BANK_SIZE];
        rom[0xFFFC] = 0x00;
        rom[0xFFFD] = 0xFA;
        // Firmware: a small loop mutating A so divergence is observable.
        // $FA00: INC; JMP $FA00  (emulation mode INC A = $1A)
        rom[0xFA00] = 0x1A;
        rom[0xFA01] = 0x4C;
        rom[0xFA02] = 0x00;
        rom[0xFA03] = 0xFA;
        Machine::new(MachineConfig {
            ram_banks: 2,
            rom,
            rom_path: "test.rom".into(),
            audio_sample_rate: 48_000,
            pal: false,
        })
        .expect("machine builds")
    }

    #[test]
    fn save_load_replays_identically() {
        let mut machine = test_machine();
        for _ in 0..50 {
            machine.step();
        }
        let blob = save_snapshot(&machine).expect("saves");
        let mut restored = load_snapshot_quiet(&blob).expect("loads");

        for _ in 0..200 {
            machine.step();
            restored.step();
            assert_eq!(machine.cpu.regs.pc, restored.cpu.regs.pc);
            assert_eq!(machine.cpu.regs.a, restored.cpu.regs.a);
            assert_eq!(machine.cpu.regs.x, restored.cpu.regs.x);
            assert_eq!(machine.cpu.regs.y, restored.cpu.regs.y);
            assert_eq!(machine.cpu.regs.p.0, restored.cpu.regs.p.0);
            assert_eq!(machine.tspec.ts, restored.tspec.ts);
        }
    }

    #[test]
    fn newer_version_rejected() {
        let machine = test_machine();
        let mut blob = save_snapshot(&machine).expect("saves");
        // Bump the version field in place: find the named key and poke the
        // value after it (u32 follows as a positive fixint for version 1).
        let at = blob
            .windows(7)
            .position(|w| w == b"version")
            .expect("version key present");
        let value_at = at + 7;
        blob[value_at] = 0x63; // fixint 99
        let err = load_snapshot_quiet(&blob).expect_err("must reject");
        assert!(matches!(
            err,
            MachineError::UnsupportedSnapshotVersion(99)
        ));
    }

    #[test]
    fn garbage_is_corrupted_snapshot() {
        let err = load_snapshot_quiet(&[0xDE, 0xAD, 0xBE, 0xEF]).expect_err("must reject");
        assert!(matches!(err, MachineError::CorruptedSnapshot(_)));
    }

    #[test]
    fn cards_round_trip_by_name() {
        let mut machine = test_machine();
        machine
            .mmio
            .cards
            .insert(4, Box::new(crate::cards::Mockingboard::new()));
        let blob = save_snapshot(&machine).expect("saves");
        let mut restored = load_snapshot_quiet(&blob).expect("loads");
        assert!(restored.mmio.cards.occupied(4));
        assert!(!restored.mmio.cards.occupied(5));
    }

    #[test]
    fn memory_contents_survive() {
        let mut machine = test_machine();
        let desc = machine.mem.descriptor(0x00_3000);
        machine.mem.write_descriptor(desc, 0x00, 0x5A);
        let blob = save_snapshot(&machine).expect("saves");
        let restored = load_snapshot_quiet(&blob).expect("loads");
        assert_eq!(restored.peek(0x00_3000), 0x5A);
    }
}
