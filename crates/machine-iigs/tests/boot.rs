//! Firmware boot against a real ROM 3 image.
//!
//! Run with `EMU2GS_ROM3=/path/to/rom3.bin cargo test -- --ignored`.

use machine_iigs::{Machine, MachineConfig};

#[test]
#[ignore]
fn rom3_reset_reaches_firmware_and_clears_text() {
    let path = std::env::var("EMU2GS_ROM3").expect("EMU2GS_ROM3 not set");
    let rom = std::fs::read(path).expect("ROM image readable");
    assert_eq!(rom.len(), 256 * 1024, "ROM 3 image is 256K");

    let mut machine = Machine::new(MachineConfig {
        ram_banks: 16,
        rom,
        rom_path: "rom3.bin".into(),
        audio_sample_rate: 48_000,
        pal: false,
    })
    .expect("machine builds");

    machine.run_cycles(1024);
    let pbr = machine.cpu.regs.pbr;
    assert!(
        pbr == 0xFE || pbr == 0xFF || pbr == 0x00,
        "PC inside firmware space, got bank {pbr:02X}"
    );

    // Give the firmware time to initialize the video softswitches and
    // clear the text screen.
    machine.run_cycles(4_000_000);
    assert_eq!(
        machine.peek(0xE0_0400),
        0xA0,
        "text screen cleared to spaces"
    );
}
