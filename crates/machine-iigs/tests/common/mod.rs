//! Shared fixtures for the machine integration tests.

use machine_iigs::{Machine, MachineConfig};

pub const BANK_SIZE: usize = 0x1_0000;

/// A one-bank test ROM: reset vector into an idle loop at $FA00.
#[must_use]
pub fn test_rom() -> Vec<u8> {
    let mut rom = vec![0x60u8; BANK_SIZE];
    rom[0xFFFC] = 0x00;
    rom[0xFFFD] = 0xFA;
    rom[0xFA00] = 0x4C;
    rom[0xFA01] = 0x00;
    rom[0xFA02] = 0xFA;
    rom
}

/// Build a machine and run it through the reset sequence.
#[must_use]
pub fn booted_machine() -> Machine {
    let mut machine = Machine::new(MachineConfig {
        ram_banks: 4,
        rom: test_rom(),
        rom_path: "test.rom".into(),
        audio_sample_rate: 48_000,
        pal: false,
    })
    .expect("machine builds");
    for _ in 0..3 {
        machine.step();
    }
    assert_eq!(machine.cpu.regs.pc, 0xFA00);
    machine
}

/// Write bytes straight into memory through the bank map (no clock).
pub fn poke(machine: &mut Machine, addr: u32, bytes: &[u8]) {
    for (i, &byte) in bytes.iter().enumerate() {
        let at = addr + i as u32;
        let desc = machine.mem.descriptor(at);
        machine.mem.write_descriptor(desc, at as u8, byte);
    }
}

/// Load a program into bank 0 RAM, point the CPU at it, and run one
/// instruction per listed length.
pub fn run_program(machine: &mut Machine, at: u16, program: &[u8], instructions: usize) {
    poke(machine, u32::from(at), program);
    machine.cpu.regs.pc = at;
    machine.cpu.regs.pbr = 0;
    for _ in 0..instructions {
        machine.step();
    }
}
