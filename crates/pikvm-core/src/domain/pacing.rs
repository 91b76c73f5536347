//! Timing contracts with the device firmware.
//!
//! The HID gadget on the device debounces input.  Events sent back-to-back
//! without these gaps are merged or dropped, so the values are fixed rather
//! than configurable.

use std::time::Duration;

/// Gap between key-down and key-up of a single press, and between the
/// individual keys of a shortcut.
pub const KEY_STROKE_GAP: Duration = Duration::from_millis(20);

/// Pause while all keys of a shortcut are held down.
pub const SHORTCUT_HOLD: Duration = Duration::from_millis(50);

/// Pause after moving the pointer before pressing, and between button-down
/// and button-up of a click.
pub const CLICK_SETTLE: Duration = Duration::from_millis(50);

/// Pause between the two clicks of a double click.
pub const DOUBLE_CLICK_GAP: Duration = Duration::from_millis(100);

/// Pause after each intermediate pointer move of a drag.
pub const DRAG_STEP_GAP: Duration = Duration::from_millis(20);

/// Number of intermediate moves a drag uses when the caller has no preference.
pub const DEFAULT_DRAG_STEPS: u32 = 10;

/// Keymap used by the text-injection endpoint when none is given.
pub const DEFAULT_KEYMAP: &str = "en-us";

/// Upper bound on state frames discarded right after the WebSocket opens.
pub const DRAIN_MAX_MESSAGES: usize = 20;

/// How long to wait for each state frame while draining.
pub const DRAIN_RECV_TIMEOUT: Duration = Duration::from_millis(500);
