//! Softswitch behavior through real CPU accesses.

mod common;

use common::{booted_machine, run_program};
use machine_iigs::page_flags;

#[test]
fn language_card_requires_double_read() {
    let mut machine = booted_machine();
    // LDA $C08B — one read only.
    run_program(&mut machine, 0x0300, &[0xAD, 0x8B, 0xC0], 1);
    assert!(machine.mem.switches.lc_read_ram);
    assert!(
        !machine.mem.switches.lc_write_enable,
        "a single read of $C08B must not enable writes"
    );

    // Second LDA $C08B completes the pre-write handshake.
    run_program(&mut machine, 0x0310, &[0xAD, 0x8B, 0xC0], 1);
    assert!(machine.mem.switches.lc_write_enable);
    assert!(!machine.mem.switches.lc_bank2);

    // Bank 0 $D0-$FF now reads and writes language-card RAM.
    let desc = machine.mem.descriptor(0x00_D000);
    assert_eq!(desc.read_bank, 0);
    assert_eq!(desc.flags & page_flags::WRITE_PROTECT, 0);
    let desc = machine.mem.descriptor(0x00_E000);
    assert_eq!(desc.read_bank, 0);
    assert_eq!(desc.flags & page_flags::WRITE_PROTECT, 0);
}

#[test]
fn language_card_ram_holds_data() {
    let mut machine = booted_machine();
    // Enable read+write RAM (bank 1), store, flip to ROM, flip back.
    run_program(
        &mut machine,
        0x0300,
        &[
            0xAD, 0x8B, 0xC0, // LDA $C08B
            0xAD, 0x8B, 0xC0, // LDA $C08B
            0xA9, 0x77, // LDA #$77
            0x8D, 0x34, 0xD0, // STA $D034
        ],
        4,
    );
    assert_eq!(machine.peek(0x00_D034), 0x77);
    // The byte physically lives at $C034 of bank 0 (bank 1 LC aliasing).
    let desc = machine.mem.descriptor(0x00_D000);
    assert_eq!(desc.read_page, 0xC0);
}

#[test]
fn store80_page2_writes_target_aux_text() {
    let mut machine = booted_machine();
    run_program(
        &mut machine,
        0x0300,
        &[
            0x8D, 0x01, 0xC0, // STA $C001 (SET80COL)
            0x8D, 0x55, 0xC0, // STA $C055 (PAGE2)
            0xA9, 0x42, // LDA #$42
            0x8D, 0x00, 0x04, // STA $0400
        ],
        4,
    );
    assert_eq!(
        machine.peek(0x01_0400),
        0x42,
        "write lands in aux bank text page"
    );
    assert_eq!(
        machine.peek(0xE1_0400),
        0x42,
        "and mirrors into the $E1 shadow"
    );
    assert_ne!(machine.peek(0x00_0400), 0x42, "main bank is untouched");
}

#[test]
fn state_register_reflects_switch_writes() {
    let mut machine = booted_machine();
    run_program(
        &mut machine,
        0x0300,
        &[
            0x8D, 0x09, 0xC0, // STA $C009 (ALTZP on)
            0x8D, 0x05, 0xC0, // STA $C005 (RAMWRT on)
            0xAD, 0x68, 0xC0, // LDA $C068 (STATEREG)
        ],
        3,
    );
    let state = machine.cpu.regs.a as u8;
    assert_ne!(state & 0x80, 0, "ALTZP bit");
    assert_ne!(state & 0x10, 0, "RAMWRT bit");
}

#[test]
fn status_reads_report_switch_state() {
    let mut machine = booted_machine();
    run_program(
        &mut machine,
        0x0300,
        &[
            0x8D, 0x01, 0xC0, // STA $C001
            0xAD, 0x18, 0xC0, // LDA $C018 (RD80STORE)
        ],
        2,
    );
    assert_eq!(machine.cpu.regs.a as u8, 0x80);
}

#[test]
fn speed_register_switches_cpu_clock() {
    let mut machine = booted_machine();
    assert!(machine.tspec.is_fast_speed());
    run_program(
        &mut machine,
        0x0300,
        &[
            0xA9, 0x00, // LDA #$00
            0x8D, 0x36, 0xC0, // STA $C036
        ],
        2,
    );
    assert!(!machine.tspec.is_fast_speed());
}
