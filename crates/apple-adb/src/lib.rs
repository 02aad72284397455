//! ADB microcontroller: keyboard, mouse, and the GLU command protocol.
//!
//! The keyboard side keeps a small FIFO of key events plus the classic
//! Apple II view: last key + strobe at $C000/$C010 and the modifier latch
//! at $C025. The mouse side accumulates motion into signed 7-bit deltas
//! read back through $C024; unread motion raises an SRQ. Host commands go
//! through the $C026 command register / $C027 status pair.

mod keymap;

pub use keymap::ascii_for_key;

#[cfg(feature = "serde")]
use serde_big_array::BigArray;

/// Keyboard event FIFO depth.
pub const KEY_BUFFER_LIMIT: usize = 8;

/// Modifier bits as seen at $C025.
pub mod modifiers {
    pub const SHIFT: u8 = 0x01;
    pub const CONTROL: u8 = 0x02;
    pub const CAPS_LOCK: u8 = 0x04;
    pub const REPEAT: u8 = 0x08;
    pub const KEYPAD: u8 = 0x10;
    pub const OPTION: u8 = 0x40;
    pub const COMMAND: u8 = 0x80;
}

/// ADB keycodes for the modifier keys.
mod keycode {
    pub const LCTRL: u8 = 0x36;
    pub const COMMAND: u8 = 0x37;
    pub const LSHIFT: u8 = 0x38;
    pub const CAPS_LOCK: u8 = 0x39;
    pub const OPTION: u8 = 0x3A;
    pub const RSHIFT: u8 = 0x7B;
    pub const ROPTION: u8 = 0x7C;
    pub const RCTRL: u8 = 0x7D;
}

/// Status bits at $C027.
mod status {
    /// Mouse register has unread data.
    pub const MOUSE_FULL: u8 = 0x80;
    /// Mouse interrupt enabled.
    pub const MOUSE_IRQ_ENABLE: u8 = 0x40;
    /// Command response pending in $C026.
    pub const DATA_FULL: u8 = 0x20;
    /// Keyboard data interrupt enabled.
    pub const KEY_IRQ_ENABLE: u8 = 0x04;
    /// Keyboard register full.
    pub const KEY_FULL: u8 = 0x08;
}

/// The ADB GLU + microcontroller state.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdbDevice {
    /// Queued raw key events (keycode, with bit 7 set on release).
    key_fifo: Vec<u8>,
    /// Last key for the $C000 register, bit 7 = strobe.
    key_latch: u8,
    /// Currently-held keycodes (for the any-key-down bit).
    pressed: Vec<u8>,
    /// Modifier latch at $C025.
    modifier_mask: u8,
    /// Accumulated mouse deltas, clamped to ±63 on read.
    mouse_dx: i32,
    mouse_dy: i32,
    mouse_button0: bool,
    mouse_button1: bool,
    /// Unread mouse state pending (raises SRQ).
    mouse_pending: bool,
    /// Which axis the next $C024 read returns (X first).
    mouse_axis_y: bool,
    /// Status/interrupt-enable register ($C027).
    status: u8,
    /// Command currently collecting operands.
    command: Option<(u8, Vec<u8>)>,
    /// Response bytes queued for $C026 reads.
    response: Vec<u8>,
    /// Microcontroller scratch RAM (Sync/SetConfig state lands here).
    #[cfg_attr(feature = "serde", serde(with = "BigArray"))]
    ram: [u8; 96],
}

impl Default for AdbDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl AdbDevice {
    #[must_use]
    pub fn new() -> Self {
        Self {
            key_fifo: Vec::new(),
            key_latch: 0,
            pressed: Vec::new(),
            modifier_mask: 0,
            mouse_dx: 0,
            mouse_dy: 0,
            mouse_button0: false,
            mouse_button1: false,
            mouse_pending: false,
            mouse_axis_y: false,
            status: 0,
            command: None,
            response: Vec::new(),
            ram: [0; 96],
        }
    }

    // --- host input events ---------------------------------------------

    pub fn key_down(&mut self, keycode: u8) {
        let keycode = keycode & 0x7F;
        if self.apply_modifier(keycode, true) {
            return;
        }
        if !self.pressed.contains(&keycode) {
            self.pressed.push(keycode);
        }
        if self.key_fifo.len() < KEY_BUFFER_LIMIT {
            self.key_fifo.push(keycode);
        }
        self.latch_next_key();
    }

    pub fn key_up(&mut self, keycode: u8) {
        let keycode = keycode & 0x7F;
        if self.apply_modifier(keycode, false) {
            return;
        }
        self.pressed.retain(|&k| k != keycode);
        if self.key_fifo.len() < KEY_BUFFER_LIMIT {
            self.key_fifo.push(keycode | 0x80);
        }
    }

    /// Caps lock toggles; the rest latch while held.
    fn apply_modifier(&mut self, keycode: u8, down: bool) -> bool {
        use modifiers as m;
        let bit = match keycode {
            keycode::LSHIFT | keycode::RSHIFT => m::SHIFT,
            keycode::LCTRL | keycode::RCTRL => m::CONTROL,
            keycode::OPTION | keycode::ROPTION => m::OPTION,
            keycode::COMMAND => m::COMMAND,
            keycode::CAPS_LOCK => {
                if down {
                    self.modifier_mask ^= m::CAPS_LOCK;
                }
                return true;
            }
            _ => return false,
        };
        if down {
            self.modifier_mask |= bit;
        } else {
            self.modifier_mask &= !bit;
        }
        true
    }

    pub fn mouse_move(&mut self, dx: i32, dy: i32) {
        self.mouse_dx += dx;
        self.mouse_dy += dy;
        self.mouse_pending = true;
    }

    pub fn mouse_button(&mut self, index: u8, down: bool) {
        if index == 0 {
            self.mouse_button0 = down;
        } else {
            self.mouse_button1 = down;
        }
        self.mouse_pending = true;
    }

    /// SRQ/interrupt line: unread mouse data with the mouse IRQ armed, or a
    /// pending key with the keyboard IRQ armed.
    #[must_use]
    pub fn irq_asserted(&self) -> bool {
        (self.mouse_pending && self.status & status::MOUSE_IRQ_ENABLE != 0)
            || (self.key_latch & 0x80 != 0 && self.status & status::KEY_IRQ_ENABLE != 0)
    }

    /// Modifier latch as seen at $C025.
    #[must_use]
    pub fn modifier_keys(&self) -> u8 {
        self.modifier_mask
    }

    // --- Apple II keyboard registers -----------------------------------

    fn latch_next_key(&mut self) {
        if self.key_latch & 0x80 == 0 {
            // Latch the next key-down event; releases only clear state.
            while let Some(event) = self.key_fifo.first().copied() {
                self.key_fifo.remove(0);
                if event & 0x80 == 0 {
                    let ascii =
                        ascii_for_key(event, self.modifier_mask);
                    if let Some(ascii) = ascii {
                        self.key_latch = 0x80 | ascii;
                        break;
                    }
                }
            }
        }
    }

    /// $C000: last key with strobe.
    #[must_use]
    pub fn keyboard_data(&self) -> u8 {
        self.key_latch
    }

    /// $C010 access: clears the strobe; read returns any-key-down in bit 7.
    pub fn clear_strobe(&mut self) -> u8 {
        self.key_latch &= 0x7F;
        let any = if self.pressed.is_empty() { 0x00 } else { 0x80 };
        self.latch_next_key();
        any | (self.key_latch & 0x7F)
    }

    // --- mouse register ------------------------------------------------

    /// $C024: alternating delta X / delta Y reads. Bit 7 carries the
    /// (inverted) button state; the delta is a signed 7-bit clamp.
    pub fn read_mouse(&mut self) -> u8 {
        let (delta, button) = if self.mouse_axis_y {
            (&mut self.mouse_dy, self.mouse_button1)
        } else {
            (&mut self.mouse_dx, self.mouse_button0)
        };
        let clamped = (*delta).clamp(-63, 63);
        *delta -= clamped;
        let value = (clamped as i8 as u8) & 0x7F;
        let button_bit = if button { 0x00 } else { 0x80 };
        self.mouse_axis_y = !self.mouse_axis_y;
        if !self.mouse_axis_y && self.mouse_dx == 0 && self.mouse_dy == 0 {
            self.mouse_pending = false;
        }
        button_bit | value
    }

    /// Whether unread mouse state is pending (SRQ source).
    #[must_use]
    pub fn mouse_pending(&self) -> bool {
        self.mouse_pending
    }

    // --- GLU command protocol ------------------------------------------

    /// $C027 read.
    #[must_use]
    pub fn read_status(&self) -> u8 {
        let mut value = self.status;
        if self.mouse_pending {
            value |= status::MOUSE_FULL;
        }
        if !self.response.is_empty() {
            value |= status::DATA_FULL;
        }
        if self.key_latch & 0x80 != 0 {
            value |= status::KEY_FULL;
        }
        value
    }

    /// $C027 write: sets the interrupt-enable bits.
    pub fn write_status(&mut self, value: u8) {
        self.status = value & (status::MOUSE_IRQ_ENABLE | status::KEY_IRQ_ENABLE);
    }

    /// $C026 read: next response byte, 0 when empty.
    pub fn read_data(&mut self) -> u8 {
        if self.response.is_empty() {
            0
        } else {
            self.response.remove(0)
        }
    }

    /// $C026 write: command byte or operand for a command in progress.
    pub fn write_command(&mut self, value: u8) {
        if let Some((command, mut operands)) = self.command.take() {
            operands.push(value);
            if operands.len() >= Self::operand_count(command) {
                self.run_command(command, &operands);
            } else {
                self.command = Some((command, operands));
            }
            return;
        }
        if Self::operand_count(value) == 0 {
            self.run_command(value, &[]);
        } else {
            self.command = Some((value, Vec::new()));
        }
    }

    fn operand_count(command: u8) -> usize {
        match command {
            0x04 | 0x05 => 1, // set/clear mode bits
            0x06 => 3,        // set config
            0x07 => 4,        // sync (mode + config)
            0x08 => 2,        // write scratch RAM
            0x09 => 2,        // read memory
            _ => 0,
        }
    }

    fn run_command(&mut self, command: u8, operands: &[u8]) {
        match command {
            // Abort: drop any response in flight.
            0x01 => self.response.clear(),
            // Reset/flush keyboard.
            0x02 | 0x03 => {
                self.key_fifo.clear();
                self.key_latch = 0;
                self.pressed.clear();
            }
            0x04 => self.ram[0] |= operands[0],
            0x05 => self.ram[0] &= !operands[0],
            0x06 => self.ram[1..4].copy_from_slice(operands),
            0x07 => {
                self.ram[0] = operands[0];
                self.ram[1..4].copy_from_slice(&operands[1..4]);
            }
            0x08 => {
                let at = usize::from(operands[0]) % self.ram.len();
                self.ram[at] = operands[1];
            }
            0x09 => {
                let at = usize::from(operands[0]) % self.ram.len();
                self.response.push(self.ram[at]);
            }
            // Version query: ROM 3 GLU version.
            0x0D => self.response.push(0x06),
            // Anything else is tolerated silently; the GLU ignores unknown
            // commands rather than wedging the bus.
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_down_latches_ascii_with_strobe() {
        let mut adb = AdbDevice::new();
        adb.key_down(0x00); // 'a'
        assert_eq!(adb.keyboard_data(), 0x80 | b'a');
        let any = adb.clear_strobe();
        assert_eq!(any & 0x80, 0x80, "key still held");
        adb.key_up(0x00);
        adb.clear_strobe();
        assert_eq!(adb.clear_strobe() & 0x80, 0x00);
    }

    #[test]
    fn shift_modifies_ascii_and_latch() {
        let mut adb = AdbDevice::new();
        adb.key_down(0x38); // shift
        adb.key_down(0x00); // 'A'
        assert_eq!(adb.keyboard_data() & 0x7F, b'A');
        assert_eq!(adb.modifier_keys() & modifiers::SHIFT, modifiers::SHIFT);
        adb.key_up(0x38);
        assert_eq!(adb.modifier_keys() & modifiers::SHIFT, 0);
    }

    #[test]
    fn caps_lock_toggles() {
        let mut adb = AdbDevice::new();
        adb.key_down(0x39);
        assert_ne!(adb.modifier_keys() & modifiers::CAPS_LOCK, 0);
        adb.key_up(0x39);
        assert_ne!(adb.modifier_keys() & modifiers::CAPS_LOCK, 0);
        adb.key_down(0x39);
        assert_eq!(adb.modifier_keys() & modifiers::CAPS_LOCK, 0);
    }

    #[test]
    fn fifo_bounded_at_limit() {
        let mut adb = AdbDevice::new();
        for _ in 0..20 {
            adb.key_down(0x01);
            adb.key_up(0x01);
        }
        assert!(adb.key_fifo.len() <= KEY_BUFFER_LIMIT);
    }

    #[test]
    fn mouse_deltas_clamp_and_clear_pending() {
        let mut adb = AdbDevice::new();
        adb.mouse_move(100, -5);
        assert!(adb.mouse_pending());
        let x = adb.read_mouse();
        assert_eq!(x & 0x7F, 63, "clamped to +63");
        let y = adb.read_mouse();
        assert_eq!(y & 0x7F, 0x7B, "-5 in signed 7-bit form");
        assert!(adb.mouse_pending(), "residual X delta still unread");
        let x2 = adb.read_mouse();
        assert_eq!(x2 & 0x7F, 37);
        let _ = adb.read_mouse();
        assert!(!adb.mouse_pending());
    }

    #[test]
    fn mouse_button_in_bit7_inverted() {
        let mut adb = AdbDevice::new();
        adb.mouse_move(1, 0);
        assert_eq!(adb.read_mouse() & 0x80, 0x80, "button up reads high");
        let mut adb = AdbDevice::new();
        adb.mouse_button(0, true);
        adb.mouse_move(1, 0);
        assert_eq!(adb.read_mouse() & 0x80, 0x00, "button down reads low");
    }

    #[test]
    fn version_command_responds() {
        let mut adb = AdbDevice::new();
        adb.write_command(0x0D);
        assert_ne!(adb.read_status() & 0x20, 0, "response pending");
        assert_eq!(adb.read_data(), 0x06);
        assert_eq!(adb.read_data(), 0);
    }

    #[test]
    fn sync_stores_mode_and_config() {
        let mut adb = AdbDevice::new();
        adb.write_command(0x07);
        for v in [0x10, 0x20, 0x30, 0x40] {
            adb.write_command(v);
        }
        adb.write_command(0x09);
        adb.write_command(0x00); // read scratch byte 0
        assert_eq!(adb.read_data(), 0x10);
    }

    #[test]
    fn srq_follows_interrupt_enables() {
        let mut adb = AdbDevice::new();
        adb.mouse_move(1, 1);
        assert!(!adb.irq_asserted(), "masked until IRQ enabled");
        adb.write_status(0x40);
        assert!(adb.irq_asserted());
    }
}
