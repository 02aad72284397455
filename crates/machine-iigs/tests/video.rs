//! Video pipeline: softswitch → shadow → scanline decode.

mod common;

use apple_vgc::render::{LEGACY_WIDTH, SHR_WIDTH, color};
use apple_vgc::{irq_bits, mode};
use common::{booted_machine, poke, run_program};

#[test]
fn hires_ff_decodes_to_white_run() {
    let mut machine = booted_machine();
    run_program(
        &mut machine,
        0x0300,
        &[
            0x8D, 0x50, 0xC0, // STA $C050 (graphics)
            0x8D, 0x57, 0xC0, // STA $C057 (hires)
            0xA9, 0xFF, // LDA #$FF
            0x8D, 0x00, 0x20, // STA $2000
        ],
        4,
    );
    let frame = machine.render_frame();
    assert_eq!(frame.width, LEGACY_WIDTH);
    // 7 hires pixels double to 14 output pixels of white.
    for x in 0..14 {
        assert_eq!(frame.pixels[x], color::WHITE, "pixel {x}");
    }
    assert_eq!(frame.pixels[14], color::BLACK);
}

#[test]
fn text_mode_frame_uses_text_color() {
    let mut machine = booted_machine();
    // Fill the shadowed text page with inverse spaces and render.
    poke(&mut machine, 0xE0_0400, &[0x20; 40]);
    machine.mmio.vgc.text_color = 0xF0; // white on black
    let frame = machine.render_frame();
    assert_eq!(frame.width, LEGACY_WIDTH);
    assert!(!frame.super_hires);
    // Inverse cells fill with the foreground color (no font installed).
    assert_eq!(frame.pixels[0], 0x0F);
}

#[test]
fn super_hires_scanline_irq_fires() {
    let mut machine = booted_machine();
    // Scanline 20 control byte: IRQ enable.
    poke(&mut machine, 0xE1_9D14, &[0x40]);
    run_program(
        &mut machine,
        0x0300,
        &[
            0xA9, 0x80, // LDA #$80
            0x8D, 0x29, 0xC0, // STA $C029 (NEWVIDEO: super hires)
            0xA9, 0x02, // LDA #$02
            0x8D, 0x23, 0xC0, // STA $C023 (scanline IRQ enable)
        ],
        4,
    );
    // SEI so the IRQ stays pending rather than vectoring through the
    // test ROM.
    run_program(&mut machine, 0x0310, &[0x78], 1);
    machine.run_cycles(30_000);
    assert!(machine.mmio.vgc.irq_asserted());
    assert_ne!(
        machine.mmio.vgc.interrupt_register() & irq_bits::SCANLINE_STATUS,
        0
    );
}

#[test]
fn super_hires_frame_renders_palette_indices() {
    let mut machine = booted_machine();
    machine.mmio.vgc.mode_flags |= mode::SUPER_HIRES;
    // Scanline 0 pixels: $12 → palette entries 1,1,2,2 doubled.
    poke(&mut machine, 0xE1_2000, &[0x12]);
    // Let the VGC sample scanline descriptors for a full frame.
    machine.run_cycles(60_000);
    let frame = machine.render_frame();
    assert_eq!(frame.width, SHR_WIDTH);
    assert!(frame.super_hires);
    assert_eq!(&frame.pixels[0..4], &[1, 1, 2, 2]);
}

#[test]
fn vbl_counter_advances_with_time() {
    let mut machine = booted_machine();
    let before = machine.mmio.vgc.vbl_count;
    // One NTSC field is 262 scanlines × 65 PHI0 cycles ≈ 17k slow cycles.
    machine.run_cycles(120_000);
    assert!(machine.mmio.vgc.vbl_count > before);
}

#[test]
fn mega2_vbl_interrupt_via_inten() {
    let mut machine = booted_machine();
    run_program(
        &mut machine,
        0x0300,
        &[
            0x78, // SEI
            0xA9, 0x08, // LDA #$08
            0x8D, 0x41, 0xC0, // STA $C041 (VBL interrupt enable)
        ],
        3,
    );
    machine.run_cycles(120_000);
    assert!(machine.mmio.irq_asserted());
    // $C047 clears the latched VBL/qsec flags.
    run_program(&mut machine, 0x0310, &[0x8D, 0x47, 0xC0], 1);
    let _ = machine.step();
    assert_eq!(machine.mmio.intflag & 0x18, 0);
}
