//! The machine: CPU + clock + memory + MMIO in lockstep.

use apple_vgc::render::{self, Frame, VideoSource};
use emu_core::{Bus, Cpu, MemAccess, Timespec};
use format_2img::{BlockDisk, SectorImage, SectorOrder, TwoImgPayload, parse_2img};
use format_gcr::{denibbilize_35, denibbilize_525, nibbilize_35, nibbilize_525};
use format_woz::{DiskType, NibbleDisk, parse_woz, serialize_woz};
use std::sync::{Arc, Mutex, PoisonError};
use wdc_65c816::Cpu65C816;

use crate::config::MachineConfig;
use crate::input::{InputEvent, InputType};
use crate::memory::{Memory, page_flags};
use crate::mmio::Mmio;
use crate::slab::Slab;
use crate::{LogLevel, MachineError, MachineLogger, MachineStatus, NullLogger};

/// Addressing of the four floppy bays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum DriveSlot {
    /// 5.25" drives (slot 6 semantics), index 0 or 1.
    D525(u8),
    /// 3.5" drives (slot 5 semantics), index 0 or 1.
    D35(u8),
}

/// Per-drive status for the host's storage UI.
#[derive(Debug, Clone, Copy)]
pub struct DriveStatus {
    pub mounted: bool,
    pub spinning: bool,
    pub qtr_track_index: u8,
    pub write_protected: bool,
    pub dirty: bool,
    /// Save failures surface here, not by aborting the machine.
    pub save_failed: bool,
}

/// What an eject produced: the original format when the conversion back is
/// lossless, otherwise the WOZ fallback.
#[derive(Debug)]
pub enum EjectedDisk {
    Woz(Vec<u8>),
    Sectors(SectorImage),
    Blocks(BlockDisk),
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine").finish_non_exhaustive()
    }
}

pub struct Machine {
    pub cpu: Cpu65C816,
    pub tspec: Timespec,
    pub mem: Memory,
    pub mmio: Mmio,
    pub config: MachineConfig,
    pub(crate) status: MachineStatus,
    pub(crate) logger: Box<dyn MachineLogger>,
    /// SmartPort block images, shared with the bus units.
    pub(crate) smart_disks: Vec<Arc<Mutex<BlockDisk>>>,
    /// How each mounted floppy arrived, for lossless eject.
    pub(crate) drive_sources: [Option<SectorOrder>; 4],
    pub(crate) drive_save_failed: [bool; 4],
    /// Device-tick bookkeeping.
    pub(crate) ts_last_devices: u64,
    pub(crate) phi0_residual: u64,
    /// Audio window bookkeeping.
    pub(crate) ts_audio_window: u64,
    pub(crate) speaker_level_at_window: bool,
    /// Absolute-mouse tracking.
    pub(crate) mouse_abs: (i32, i32),
}

/// SmartPort unit backed by a shared block image. Lock poisoning is
/// recovered rather than propagated: a wedged image must degrade to an
/// I/O error, never take the machine thread down.
struct BlockUnit(Arc<Mutex<BlockDisk>>);

impl BlockUnit {
    fn image(&self) -> std::sync::MutexGuard<'_, BlockDisk> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl apple_iwm::SmartPortDevice for BlockUnit {
    fn status(&mut self) -> apple_iwm::SmartPortStatus {
        let image = self.image();
        apple_iwm::SmartPortStatus {
            online: true,
            write_protected: image.locked,
            block_count: image.block_count(),
        }
    }

    fn read_block(&mut self, block: u32, out: &mut [u8]) -> bool {
        let image = self.image();
        match image.read_block(block) {
            Some(data) => {
                out[..data.len()].copy_from_slice(data);
                true
            }
            None => false,
        }
    }

    fn write_block(&mut self, block: u32, data: &[u8]) -> bool {
        self.image().write_block(block, data)
    }

    fn format(&mut self) -> bool {
        let mut image = self.image();
        let zero = [0u8; format_2img::BLOCK_SIZE];
        (0..image.block_count()).all(|b| image.write_block(b, &zero))
    }
}

/// The CPU's view of the machine for the duration of one instruction.
struct MachineBus<'a> {
    mem: &'a mut Memory,
    mmio: &'a mut Mmio,
    tspec: &'a mut Timespec,
    logger: &'a mut dyn MachineLogger,
}

impl Bus for MachineBus<'_> {
    fn read(&mut self, addr: u32, _access: MemAccess) -> u8 {
        let desc = self.mem.descriptor(addr);
        self.tspec.cycle_memory(desc.flags & page_flags::MEGA2 != 0);
        let page = (addr >> 8) as u8;
        let offset = addr as u8;
        let value = if desc.flags & page_flags::MMIO_READ != 0 {
            if page == 0xC0 {
                self.mmio.read(offset, self.mem, self.tspec, self.logger)
            } else {
                // Slot card page ($Cn00).
                self.mmio
                    .cards
                    .page_read(page - 0xC0, offset)
                    .unwrap_or(0xFF)
            }
        } else {
            self.mem.read_descriptor(desc, offset)
        };
        self.mem.sync_map();
        value
    }

    fn write(&mut self, addr: u32, value: u8, _access: MemAccess) {
        let desc = self.mem.descriptor(addr);
        self.tspec.cycle_memory(desc.flags & page_flags::MEGA2 != 0);
        let page = (addr >> 8) as u8;
        let offset = addr as u8;
        if desc.flags & page_flags::MMIO_WRITE != 0 {
            if page == 0xC0 {
                self.mmio
                    .write(offset, value, self.mem, self.tspec, self.logger);
            } else {
                self.mmio.cards.page_write(page - 0xC0, offset, value);
            }
        } else {
            self.mem.write_descriptor(desc, offset, value);
        }
        self.mem.sync_map();
    }

    fn internal_cycle(&mut self) {
        self.tspec.cycle_fast();
    }
}

impl Machine {
    /// Build a machine. The slab is sized from the configuration; an
    /// allocation shortfall surfaces as `AllocationFailed`.
    pub fn new(config: MachineConfig) -> Result<Self, MachineError> {
        Self::with_logger(config, Box::new(NullLogger))
    }

    pub fn with_logger(
        config: MachineConfig,
        logger: Box<dyn MachineLogger>,
    ) -> Result<Self, MachineError> {
        let arena = Memory::arena_size(config.ram_banks, config.rom.len());
        let slab = Slab::new(arena).ok_or(MachineError::AllocationFailed(arena))?;
        let mem = Memory::new(slab, config.ram_banks, &config.rom)
            .ok_or(MachineError::AllocationFailed(arena))?;
        let mmio = Mmio::new(config.audio_sample_rate, config.pal);
        let mut machine = Self {
            cpu: Cpu65C816::new(),
            tspec: Timespec::new(),
            mem,
            mmio,
            config,
            status: MachineStatus::Initialized,
            logger,
            smart_disks: Vec::new(),
            drive_sources: [None; 4],
            drive_save_failed: [false; 4],
            ts_last_devices: 0,
            phi0_residual: 0,
            ts_audio_window: 0,
            speaker_level_at_window: false,
            mouse_abs: (0, 0),
        };
        machine.reset();
        Ok(machine)
    }

    #[must_use]
    pub fn status(&self) -> MachineStatus {
        self.status
    }

    /// Mark the machine failed; `step()` becomes a no-op.
    pub fn fail(&mut self, reason: &str) {
        self.logger.log(LogLevel::Fatal, reason);
        self.status = MachineStatus::Failed;
    }

    /// Pull RESB: three cycles of pin hold, then the reset vector.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.mem.switches = Default::default();
        self.mem.invalidate_map();
        self.mem.sync_map();
        self.tspec.set_fast_speed(true);
        self.mmio.speed = 0x80;
    }

    /// Run one CPU instruction, then every device up to the new clock.
    pub fn step(&mut self) -> MachineStatus {
        if self.status == MachineStatus::Failed {
            return MachineStatus::Failed;
        }
        self.status = MachineStatus::Running;
        self.mem.sync_map();
        {
            let mut bus = MachineBus {
                mem: &mut self.mem,
                mmio: &mut self.mmio,
                tspec: &mut self.tspec,
                logger: self.logger.as_mut(),
            };
            self.cpu.step(&mut bus);
        }
        self.step_devices();
        self.status
    }

    /// Fixed device order per cycle: VGC → IWM → DOC → ADB poll → IRQ.
    fn step_devices(&mut self) {
        let ts = self.tspec.ts;

        // VGC consults the live super-hires control table.
        let mut shr_table = [0u8; 200];
        let e1 = self.mem.mega2_bank(1);
        shr_table.copy_from_slice(
            &e1[render::SHR_CONTROL_TABLE as usize..render::SHR_CONTROL_TABLE as usize + 200],
        );
        self.mmio.vgc.tick(ts, &shr_table);

        self.mmio.iwm.tick(ts);

        let elapsed = ts - self.ts_last_devices;
        self.ts_last_devices = ts;
        self.phi0_residual += elapsed;
        let phi0_cycles = self.phi0_residual / emu_core::CLOCKS_PHI0_CYCLE;
        self.phi0_residual %= emu_core::CLOCKS_PHI0_CYCLE;
        self.mmio.doc.tick(phi0_cycles as u32);
        self.mmio.cards.tick_phi0(phi0_cycles);
        self.mmio.rtc.tick(ts);

        self.mmio.update_timers();
        self.cpu.set_irq(self.mmio.irq_asserted());
    }

    /// Run whole instructions until at least `cycles` CPU cycles retire.
    pub fn run_cycles(&mut self, cycles: u64) {
        let target = self.cpu.cycles_spent + cycles;
        while self.cpu.cycles_spent < target && self.status != MachineStatus::Failed {
            self.step();
        }
    }

    // --- host input ----------------------------------------------------

    pub fn input(&mut self, event: &InputEvent) {
        match event.kind {
            InputType::KeyDown => self.mmio.adb.key_down(event.value_a as u8),
            InputType::KeyUp => self.mmio.adb.key_up(event.value_a as u8),
            InputType::MouseMove => self.mmio.adb.mouse_move(event.value_a, event.value_b),
            InputType::MouseMoveAbsolute => {
                let dx = event.value_a - self.mouse_abs.0;
                let dy = event.value_b - self.mouse_abs.1;
                self.mouse_abs = (event.value_a, event.value_b);
                self.mmio.adb.mouse_move(dx, dy);
            }
            InputType::MouseButtonDown => {
                self.mmio.adb.mouse_button(event.value_a as u8, true);
            }
            InputType::MouseButtonUp => {
                self.mmio.adb.mouse_button(event.value_a as u8, false);
            }
            InputType::Paddle => {
                let index = (event.value_a & 3) as usize;
                self.mmio.paddle_values[index] = event.value_b as u8;
                self.mmio.paddle_connected |= 1 << index;
            }
            InputType::PaddleDisconnected => {
                self.mmio.paddle_connected &= !(1 << (event.value_a & 3));
            }
        }
    }

    // --- video and audio -----------------------------------------------

    /// Render the current frame from the Mega II banks.
    #[must_use]
    pub fn render_frame(&self) -> Frame {
        let src = VideoSource {
            main: self.mem.mega2_bank(0),
            aux: self.mem.mega2_bank(1),
        };
        render::render_frame(&self.mmio.vgc, &src, None)
    }

    /// Drain mixed audio (DOC + speaker + cards) as interleaved stereo.
    pub fn take_audio(&mut self) -> Vec<f32> {
        let mut samples = self.mmio.doc.take_samples();
        let window_start = self.ts_audio_window;
        let window = self.tspec.ts - window_start;
        let transitions = std::mem::take(&mut self.mmio.speaker.transitions);
        crate::audio::mix_speaker_transitions(
            &transitions,
            self.speaker_level_at_window,
            window_start,
            window,
            &mut samples,
        );
        self.speaker_level_at_window = self.mmio.speaker.level;
        self.ts_audio_window = self.tspec.ts;
        self.mmio
            .cards
            .mix_audio(&mut samples, self.config.audio_sample_rate);
        samples
    }

    // --- storage -------------------------------------------------------

    fn drive_index(slot: DriveSlot) -> usize {
        match slot {
            DriveSlot::D525(n) => usize::from(n & 1),
            DriveSlot::D35(n) => 2 + usize::from(n & 1),
        }
    }

    fn drive_mut(&mut self, slot: DriveSlot) -> &mut apple_iwm::Drive {
        match slot {
            DriveSlot::D525(n) => &mut self.mmio.iwm.drives_525[usize::from(n & 1)],
            DriveSlot::D35(n) => &mut self.mmio.iwm.drives_35[usize::from(n & 1)],
        }
    }

    fn drive(&self, slot: DriveSlot) -> &apple_iwm::Drive {
        match slot {
            DriveSlot::D525(n) => &self.mmio.iwm.drives_525[usize::from(n & 1)],
            DriveSlot::D35(n) => &self.mmio.iwm.drives_35[usize::from(n & 1)],
        }
    }

    /// Mount a disk image by content. WOZ is used natively; 2IMG/DSK/DO/PO
    /// convert to nibbles on the way in.
    pub fn mount_disk(&mut self, slot: DriveSlot, data: &[u8]) -> Result<(), MachineError> {
        let index = Self::drive_index(slot);
        let (disk, source) = decode_disk_image(slot, data)?;
        if disk.disk_type
            != match slot {
                DriveSlot::D525(_) => DiskType::Disk525,
                DriveSlot::D35(_) => DiskType::Disk35,
            }
        {
            return Err(MachineError::MountFailed(
                "image type does not match the drive bay".into(),
            ));
        }
        self.drive_sources[index] = source;
        self.drive_save_failed[index] = false;
        self.drive_mut(slot).insert_disk(disk);
        Ok(())
    }

    /// Eject: hand back the disk in its original format when the nibble
    /// stream still decodes losslessly, otherwise as WOZ (the caller is
    /// expected to warn and write the sidecar).
    pub fn eject_disk(&mut self, slot: DriveSlot) -> Option<EjectedDisk> {
        let index = Self::drive_index(slot);
        let source = self.drive_sources[index].take();
        let disk = self.drive_mut(slot).eject_disk()?;
        match source {
            Some(order) if disk.disk_type == DiskType::Disk525 => {
                match denibbilize_525(&disk, order) {
                    Some(image) => Some(EjectedDisk::Sectors(image)),
                    None => {
                        self.logger.log(
                            LogLevel::Warn,
                            "nibble stream no longer sector-clean; producing WOZ sidecar",
                        );
                        Some(EjectedDisk::Woz(serialize_woz(&disk)))
                    }
                }
            }
            Some(_) => match denibbilize_35(&disk) {
                Some(blocks) => Some(EjectedDisk::Blocks(blocks)),
                None => {
                    self.logger.log(
                        LogLevel::Warn,
                        "nibble stream no longer block-clean; producing WOZ sidecar",
                    );
                    Some(EjectedDisk::Woz(serialize_woz(&disk)))
                }
            },
            None => Some(EjectedDisk::Woz(serialize_woz(&disk))),
        }
    }

    /// Attach a SmartPort block image as the next unit on the chain.
    pub fn mount_smartport(&mut self, data: &[u8]) -> Result<u8, MachineError> {
        let image = match parse_2img(data) {
            Ok(TwoImgPayload::Blocks(disk)) => disk,
            Ok(TwoImgPayload::Sectors(_)) => {
                return Err(MachineError::MountFailed(
                    "sector image offered to the SmartPort".into(),
                ));
            }
            Err(_) => BlockDisk::from_bytes(data.to_vec())
                .map_err(|e| MachineError::MountFailed(e.to_string()))?,
        };
        self.attach_block_disk(image);
        Ok(self.mmio.iwm.smartport.unit_count())
    }

    /// Attach an already-decoded block image (snapshot restore path).
    pub(crate) fn attach_block_disk(&mut self, image: BlockDisk) {
        let shared = Arc::new(Mutex::new(image));
        self.smart_disks.push(Arc::clone(&shared));
        self.mmio
            .iwm
            .smartport
            .add_unit(Box::new(BlockUnit(shared)));
    }

    /// Detach all SmartPort units, returning the block images for the host
    /// to persist.
    pub fn eject_smartport(&mut self) -> Vec<BlockDisk> {
        self.mmio.iwm.smartport.clear_units();
        self.smart_disks
            .drain(..)
            .map(|shared| {
                Arc::try_unwrap(shared)
                    .map(|m| m.into_inner().unwrap_or_else(PoisonError::into_inner))
                    .unwrap_or_else(|arc| {
                        arc.lock().unwrap_or_else(PoisonError::into_inner).clone()
                    })
            })
            .collect()
    }

    #[must_use]
    pub fn drive_status(&self, slot: DriveSlot) -> DriveStatus {
        let drive = self.drive(slot);
        DriveStatus {
            mounted: drive.has_disk(),
            spinning: drive.is_spinning(),
            qtr_track_index: drive.qtr_track_index,
            write_protected: drive.write_protected(),
            dirty: drive.disk.as_ref().is_some_and(|d| d.dirty),
            save_failed: self.drive_save_failed[Self::drive_index(slot)],
        }
    }

    /// Record a host-side save failure in the drive status.
    pub fn mark_save_failed(&mut self, slot: DriveSlot) {
        self.drive_save_failed[Self::drive_index(slot)] = true;
    }

    /// Teardown: every mounted disk handed back for persistence.
    pub fn unmount_all(&mut self) -> Vec<EjectedDisk> {
        let mut out = Vec::new();
        for slot in [
            DriveSlot::D525(0),
            DriveSlot::D525(1),
            DriveSlot::D35(0),
            DriveSlot::D35(1),
        ] {
            if let Some(disk) = self.eject_disk(slot) {
                out.push(disk);
            }
        }
        out.extend(self.eject_smartport().into_iter().map(EjectedDisk::Blocks));
        out
    }

    /// Debugger/test peek with no clock or MMIO side effects.
    #[must_use]
    pub fn peek(&self, addr: u32) -> u8 {
        self.mem.peek(addr)
    }
}

/// Decode a mounted image: WOZ natively, 2IMG by payload, bare DSK/DO/PO
/// by size. Returns the nibble disk plus the sector order to restore on
/// eject (None for native WOZ).
fn decode_disk_image(
    slot: DriveSlot,
    data: &[u8],
) -> Result<(NibbleDisk, Option<SectorOrder>), MachineError> {
    if data.starts_with(b"WOZ2") {
        return parse_woz(data)
            .map(|disk| (disk, None))
            .map_err(|e| MachineError::MountFailed(e.to_string()));
    }
    if data.starts_with(b"2IMG") {
        return match parse_2img(data) {
            Ok(TwoImgPayload::Sectors(image)) => {
                Ok((nibbilize_525(&image), Some(image.order)))
            }
            Ok(TwoImgPayload::Blocks(blocks)) => nibbilize_35(&blocks)
                .map(|disk| (disk, Some(SectorOrder::ProDos)))
                .ok_or_else(|| {
                    MachineError::MountFailed("block image is not a 3.5\" floppy size".into())
                }),
            Err(e) => Err(MachineError::MountFailed(e.to_string())),
        };
    }
    match slot {
        DriveSlot::D525(_) => {
            let image = SectorImage::from_bytes(data.to_vec(), SectorOrder::Dos)
                .map_err(|e| MachineError::MountFailed(e.to_string()))?;
            Ok((nibbilize_525(&image), Some(SectorOrder::Dos)))
        }
        DriveSlot::D35(_) => {
            let blocks = BlockDisk::from_bytes(data.to_vec())
                .map_err(|e| MachineError::MountFailed(e.to_string()))?;
            nibbilize_35(&blocks)
                .map(|disk| (disk, Some(SectorOrder::ProDos)))
                .ok_or_else(|| {
                    MachineError::MountFailed("block image is not a 3.5\" floppy size".into())
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::BANK_SIZE;

    pub(crate) fn test_rom() -> Vec<u8> {
        // One 64K bank of RTS with the reset vector pointing at $FA62-ish
        // firmware space; tests that need real code overwrite it.
        let mut rom = vec![0x60u8; BANK_SIZE];
        // Reset vector at $FFFC of the last bank → $FA00.
        rom[0xFFFC] = 0x00;
        rom[0xFFFD] = 0xFA;
        // $FA00: JMP $FA00 (idle loop).
        rom[0xFA00] = 0x4C;
        rom[0xFA01] = 0x00;
        rom[0xFA02] = 0xFA;
        rom
    }

    pub(crate) fn machine() -> Machine {
        Machine::new(MachineConfig {
            ram_banks: 4,
            rom: test_rom(),
            rom_path: "test.rom".into(),
            audio_sample_rate: 48_000,
            pal: false,
        })
        .expect("machine builds")
    }

    #[test]
    fn reset_vectors_through_rom() {
        let mut m = machine();
        for _ in 0..4 {
            m.step();
        }
        assert_eq!(m.cpu.regs.pc, 0xFA00, "firmware idle loop reached");
        assert!(m.cpu.regs.e);
    }

    #[test]
    fn clock_advances_monotonically() {
        let mut m = machine();
        let mut prev = 0;
        for _ in 0..200 {
            m.step();
            assert!(m.tspec.ts > prev);
            assert!(m.tspec.ts <= m.tspec.ts_next_phi0);
            prev = m.tspec.ts;
        }
    }

    #[test]
    fn failed_machine_does_not_step() {
        let mut m = machine();
        m.fail("test fatal");
        let ts = m.tspec.ts;
        assert_eq!(m.step(), MachineStatus::Failed);
        assert_eq!(m.tspec.ts, ts);
    }

    #[test]
    fn unmapped_reads_are_ff_and_harmless() {
        let m = machine();
        assert_eq!(m.peek(0x50_0000), 0xFF);
    }

    #[test]
    fn paddle_events_update_mmio() {
        let mut m = machine();
        m.input(&InputEvent {
            kind: InputType::Paddle,
            value_a: 1,
            value_b: 200,
            modifier_mask: 0,
        });
        assert_eq!(m.mmio.paddle_values[1], 200);
        assert_eq!(m.mmio.paddle_connected, 0b10);
        m.input(&InputEvent {
            kind: InputType::PaddleDisconnected,
            value_a: 1,
            value_b: 0,
            modifier_mask: 0,
        });
        assert_eq!(m.mmio.paddle_connected, 0);
    }

    #[test]
    fn key_event_reaches_keyboard_register() {
        let mut m = machine();
        m.input(&InputEvent::key_down(0x00));
        assert_eq!(m.mmio.adb.keyboard_data(), 0x80 | b'a');
    }
}
