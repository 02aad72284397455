//! Host input events, routed into the ADB and paddle state.

/// Input event kinds. Keycodes are ADB codes (0x00-0x7F).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum InputType {
    KeyDown,
    KeyUp,
    /// Relative mouse motion (`value_a` = dx, `value_b` = dy).
    MouseMove,
    /// Absolute mouse position, scaled by the host to the 0..1023 range.
    MouseMoveAbsolute,
    /// `value_a` = button index.
    MouseButtonDown,
    MouseButtonUp,
    /// `value_a` = paddle index, `value_b` = axis value 0-255.
    Paddle,
    /// `value_a` = paddle index.
    PaddleDisconnected,
}

/// One host input record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct InputEvent {
    pub kind: InputType,
    pub value_a: i32,
    pub value_b: i32,
    /// ADB modifier mask accompanying the event.
    pub modifier_mask: u8,
}

impl InputEvent {
    #[must_use]
    pub fn key_down(keycode: u8) -> Self {
        Self {
            kind: InputType::KeyDown,
            value_a: i32::from(keycode),
            value_b: 0,
            modifier_mask: 0,
        }
    }

    #[must_use]
    pub fn key_up(keycode: u8) -> Self {
        Self {
            kind: InputType::KeyUp,
            value_a: i32::from(keycode),
            value_b: 0,
            modifier_mask: 0,
        }
    }

    #[must_use]
    pub fn mouse_move(dx: i32, dy: i32) -> Self {
        Self {
            kind: InputType::MouseMove,
            value_a: dx,
            value_b: dy,
            modifier_mask: 0,
        }
    }
}
