//! The emulation driver thread and its host interfaces.
//!
//! One thread owns the machine. The host feeds it through a bounded
//! command queue (16 entries, drained at frame boundaries) and receives a
//! published frame per VBL plus audio through a lock-free ring sized for
//! half a second. Terminate drains, publishes a final frame, and hands the
//! machine back through `join`.

use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use ringbuf::traits::{Producer, Split};
use ringbuf::{HeapProd, HeapRb};

use apple_vgc::render::Frame;

use crate::input::InputEvent;
use crate::machine::{DriveSlot, DriveStatus, Machine};
use crate::snapshot::save_snapshot;
use crate::{MachineStatus, snapshot};

/// Command queue depth.
pub const COMMAND_QUEUE_DEPTH: usize = 16;

/// Host → emulator commands.
pub enum Command {
    Run,
    Break,
    /// Execute N instructions then break.
    Step(u32),
    InsertDisk {
        slot: DriveSlot,
        data: Vec<u8>,
    },
    EjectDisk {
        slot: DriveSlot,
        reply: SyncSender<Option<crate::machine::EjectedDisk>>,
    },
    AddBreakpoint(u32),
    RemoveBreakpoint(u32),
    Input(InputEvent),
    SaveSnapshot {
        reply: SyncSender<Result<Vec<u8>, String>>,
    },
    LoadSnapshot {
        data: Vec<u8>,
    },
    Terminate,
}

/// One published frame.
#[derive(Clone)]
pub struct FrameState {
    pub frame: Frame,
    pub status: MachineStatus,
    pub running: bool,
    pub vbl_count: u64,
    pub drives: [DriveStatus; 4],
    /// Set on the final frame before the thread exits.
    pub terminated: bool,
}

/// The double-buffered hand-off: the emulator builds a fresh frame and the
/// mutex critical section is just the Arc swap.
type FrameSlot = Arc<Mutex<Arc<FrameState>>>;

/// Host-side handle to a running emulator.
pub struct EmulatorDriver {
    commands: SyncSender<Command>,
    frames: FrameSlot,
    handle: Option<JoinHandle<Machine>>,
    /// Audio consumer; the host audio callback takes this once.
    pub audio: Option<ringbuf::HeapCons<f32>>,
}

impl EmulatorDriver {
    /// Spawn the emulation thread.
    #[must_use]
    pub fn spawn(machine: Machine) -> Self {
        let (commands, receiver) = sync_channel(COMMAND_QUEUE_DEPTH);
        // ≥500 ms of interleaved stereo at the machine's sample rate.
        let ring = HeapRb::<f32>::new(machine.config.audio_sample_rate as usize);
        let (producer, consumer) = ring.split();
        let frames: FrameSlot = Arc::new(Mutex::new(Arc::new(publish_state(
            &machine, false, false,
        ))));
        let thread_frames = Arc::clone(&frames);
        let handle = std::thread::spawn(move || run_loop(machine, &receiver, &thread_frames, producer));
        Self {
            commands,
            frames,
            handle: Some(handle),
            audio: Some(consumer),
        }
    }

    /// Queue a command; false when the bounded queue is full.
    pub fn send(&self, command: Command) -> bool {
        match self.commands.try_send(command) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => false,
        }
    }

    /// Latest published frame (pointer clone under the mutex). A poisoned
    /// slot still holds a whole frame, so recover rather than panic.
    #[must_use]
    pub fn frame(&self) -> Arc<FrameState> {
        Arc::clone(&self.frames.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Terminate and reclaim the machine.
    pub fn terminate(mut self) -> Option<Machine> {
        let _ = self.commands.send(Command::Terminate);
        self.handle.take().and_then(|h| h.join().ok())
    }
}

fn publish_state(machine: &Machine, running: bool, terminated: bool) -> FrameState {
    FrameState {
        frame: machine.render_frame(),
        status: machine.status(),
        running,
        vbl_count: machine.mmio.vgc.vbl_count,
        drives: [
            machine.drive_status(DriveSlot::D525(0)),
            machine.drive_status(DriveSlot::D525(1)),
            machine.drive_status(DriveSlot::D35(0)),
            machine.drive_status(DriveSlot::D35(1)),
        ],
        terminated,
    }
}

fn publish(frames: &FrameSlot, state: FrameState) {
    let fresh = Arc::new(state);
    // The critical section is one pointer swap.
    *frames.lock().unwrap_or_else(PoisonError::into_inner) = fresh;
}

struct LoopState {
    running: bool,
    pending_steps: u32,
    breakpoints: Vec<u32>,
}

fn run_loop(
    mut machine: Machine,
    commands: &Receiver<Command>,
    frames: &FrameSlot,
    mut audio: HeapProd<f32>,
) -> Machine {
    let mut state = LoopState {
        running: false,
        pending_steps: 0,
        breakpoints: Vec::new(),
    };
    loop {
        // Drain the queue at the frame boundary.
        while let Ok(command) = commands.try_recv() {
            if handle_command(&mut machine, &mut state, command, frames) {
                return machine;
            }
        }
        if !state.running && state.pending_steps == 0 {
            // Idle: block for the next command instead of spinning.
            match commands.recv() {
                Ok(command) => {
                    if handle_command(&mut machine, &mut state, command, frames) {
                        return machine;
                    }
                }
                Err(_) => return machine,
            }
            continue;
        }

        run_one_frame(&mut machine, &mut state);

        for sample in machine.take_audio() {
            // Drop samples rather than block if the host stops consuming.
            let _ = audio.try_push(sample);
        }
        publish(frames, publish_state(&machine, state.running, false));
        std::thread::yield_now();
    }
}

/// Emulate until the next VBL (or a break condition).
fn run_one_frame(machine: &mut Machine, state: &mut LoopState) {
    let vbl = machine.mmio.vgc.vbl_count;
    while machine.mmio.vgc.vbl_count == vbl {
        if machine.step() == MachineStatus::Failed {
            state.running = false;
            state.pending_steps = 0;
            break;
        }
        if state.pending_steps > 0 {
            state.pending_steps -= 1;
            if state.pending_steps == 0 {
                state.running = false;
                break;
            }
        }
        if state.breakpoints.contains(&machine.cpu.regs.pc24()) {
            state.running = false;
            state.pending_steps = 0;
            break;
        }
    }
}

/// Returns true on Terminate.
fn handle_command(
    machine: &mut Machine,
    state: &mut LoopState,
    command: Command,
    frames: &FrameSlot,
) -> bool {
    match command {
        Command::Run => state.running = true,
        Command::Break => {
            state.running = false;
            state.pending_steps = 0;
        }
        Command::Step(count) => {
            state.pending_steps = state.pending_steps.saturating_add(count);
        }
        Command::InsertDisk { slot, data } => {
            // Mount failures are logged inside the machine's error path;
            // the drive status simply stays unmounted.
            let _ = machine.mount_disk(slot, &data);
        }
        Command::EjectDisk { slot, reply } => {
            let _ = reply.try_send(machine.eject_disk(slot));
        }
        Command::AddBreakpoint(addr) => {
            if !state.breakpoints.contains(&addr) {
                state.breakpoints.push(addr);
            }
        }
        Command::RemoveBreakpoint(addr) => state.breakpoints.retain(|&a| a != addr),
        Command::Input(event) => machine.input(&event),
        Command::SaveSnapshot { reply } => {
            let result = save_snapshot(machine).map_err(|e| e.to_string());
            let _ = reply.try_send(result);
        }
        Command::LoadSnapshot { data } => {
            match snapshot::load_snapshot_quiet(&data) {
                Ok(fresh) => *machine = fresh,
                Err(_) => machine.fail("snapshot load failed; machine discarded"),
            }
        }
        Command::Terminate => {
            publish(frames, publish_state(machine, false, true));
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;
    use crate::memory::BANK_SIZE;
    use std::time::Duration;

    fn test_machine() -> Machine {
        let mut rom = vec![0x60u8; BANK_SIZE];
        rom[0xFFFC] = 0x00;
        rom[0xFFFD] = 0xFA;
        rom[0xFA00] = 0x4C;
        rom[0xFA01] = 0x00;
        rom[0xFA02] = 0xFA;
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
    fn spawn_run_and_terminate() {
        let driver = EmulatorDriver::spawn(test_machine());
        assert!(driver.send(Command::Run));
        // Wait for at least one published VBL frame.
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        loop {
            let frame = driver.frame();
            if frame.vbl_count > 0 {
                break;
            }
            assert!(std::time::Instant::now() < deadline, "no frame published");
            std::thread::sleep(Duration::from_millis(5));
        }
        let machine = driver.terminate().expect("machine returned");
        assert!(machine.mmio.vgc.vbl_count > 0);
    }

    #[test]
    fn final_frame_is_marked_terminated() {
        let driver = EmulatorDriver::spawn(test_machine());
        let frames = Arc::clone(&driver.frames);
        driver.terminate().expect("joined");
        let last = frames.lock().expect("lock");
        assert!(last.terminated);
    }

    #[test]
    fn step_command_advances_then_breaks() {
        let driver = EmulatorDriver::spawn(test_machine());
        assert!(driver.send(Command::Step(10)));
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        loop {
            let frame = driver.frame();
            if frame.status == MachineStatus::Running && !frame.running {
                break;
            }
            assert!(std::time::Instant::now() < deadline, "step never completed");
            std::thread::sleep(Duration::from_millis(5));
        }
        let machine = driver.terminate().expect("machine returned");
        assert!(machine.cpu.cycles_spent > 0);
    }
}
