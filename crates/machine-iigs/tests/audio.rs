//! Sound path: DOC through the sound GLU, speaker clicks, mixing.

mod common;

use common::{booted_machine, run_program};

/// The DOC one-shot halt contract, driven entirely through $C03C-$C03F.
#[test]
fn doc_one_shot_halts_and_raises_irq() {
    let mut machine = booted_machine();
    run_program(
        &mut machine,
        0x0300,
        &[
            0x78, // SEI (observe the IRQ line without vectoring)
            // Sound RAM: bytes $80 $90 $A0 $00 at $0000.
            0xA9, 0x60, // LDA #$60 (RAM select + auto-increment)
            0x8D, 0x3C, 0xC0, // STA $C03C
            0xA9, 0x00, // LDA #$00
            0x8D, 0x3E, 0xC0, // STA $C03E (address lo)
            0x8D, 0x3F, 0xC0, // STA $C03F (address hi)
            0xA9, 0x80, 0x8D, 0x3D, 0xC0, // data $80
            0xA9, 0x90, 0x8D, 0x3D, 0xC0, // data $90
            0xA9, 0xA0, 0x8D, 0x3D, 0xC0, // data $A0
            0xA9, 0x00, 0x8D, 0x3D, 0xC0, // data $00
            // Registers: freq hi = $01, volume, pointer, size, control.
            0xA9, 0x20, // LDA #$20 (register select + auto-increment)
            0x8D, 0x3C, 0xC0, // STA $C03C
            0xA9, 0x20, // LDA #$20 (address = freq-hi bank, osc 0)
            0x8D, 0x3E, 0xC0, // STA $C03E
            0xA9, 0x00, 0x8D, 0x3F, 0xC0, // address hi = 0
            0xA9, 0x01, 0x8D, 0x3D, 0xC0, // freq hi = $01
            0xA9, 0x40, 0x8D, 0x3E, 0xC0, // address = volume bank
            0xA9, 0xFF, 0x8D, 0x3D, 0xC0, // volume = $FF
            0xA9, 0xA0, 0x8D, 0x3E, 0xC0, // address = control bank
            0xA9, 0x0A, 0x8D, 0x3D, 0xC0, // control: one-shot + IE, running
        ],
        30,
    );
    assert_eq!(machine.mmio.doc.ram[0], 0x80);
    assert_eq!(machine.mmio.doc.ram[3], 0x00);
    assert_eq!(machine.mmio.doc.oscillators[0].freq, 0x0100);
    assert!(!machine.mmio.doc.oscillators[0].halted());

    // Tick until the oscillator walks into the zero byte.
    machine.run_cycles(100_000);
    assert!(machine.mmio.doc.oscillators[0].halted());
    assert!(machine.mmio.doc.oscillators[0].irq_raised);
    assert!(machine.mmio.doc.irq_asserted());
    assert!(machine.mmio.irq_asserted(), "DOC IRQ reaches the machine line");
}

#[test]
fn speaker_toggles_become_audio() {
    let mut machine = booted_machine();
    // Click the speaker twice, spaced apart.
    run_program(&mut machine, 0x0300, &[0xAD, 0x30, 0xC0], 1);
    machine.run_cycles(5_000);
    run_program(&mut machine, 0x0310, &[0xAD, 0x30, 0xC0], 1);
    machine.run_cycles(20_000);
    let samples = machine.take_audio();
    assert!(!samples.is_empty());
    assert!(samples.iter().any(|&s| s != 0.0), "clicks made it to the mix");
}

#[test]
fn audio_buffer_produces_near_host_rate() {
    let mut machine = booted_machine();
    // Roughly one NTSC frame of emulated time.
    let start_ts = machine.tspec.ts;
    while machine.tspec.ts - start_ts < 456 * 262 {
        machine.step();
    }
    let frames = machine.take_audio().len() / 2;
    // 1/60th of a second at 48 kHz is 800 samples; the downsampler may be
    // one or two off either side of the boundary.
    assert!((700..900).contains(&frames), "got {frames}");
}

#[test]
fn mockingboard_mixes_into_machine_audio() {
    let mut machine = booted_machine();
    machine
        .mmio
        .cards
        .insert(4, Box::new(machine_iigs::Mockingboard::new()));
    // Program the PSG through the card's $Cn00 page: select reg 0, write
    // period, enable tone A at full volume.
    machine.mem.switches.slotromsel = 1 << 4;
    machine.mem.invalidate_map();
    for (reg, value) in [(0u8, 0x50u8), (7, 0x3E), (8, 0x0F)] {
        // Address latch: ORA=reg, ORB strobe $07 → $04.
        for (offset, data) in [(0x01u8, reg), (0x00, 0x07), (0x00, 0x04)] {
            machine.mmio.cards.page_write(4, offset, data);
        }
        for (offset, data) in [(0x01u8, value), (0x00, 0x06), (0x00, 0x04)] {
            machine.mmio.cards.page_write(4, offset, data);
        }
    }
    machine.run_cycles(60_000);
    let samples = machine.take_audio();
    assert!(samples.iter().any(|&s| s != 0.0), "PSG tone present");
}
