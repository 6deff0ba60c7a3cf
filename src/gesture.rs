//! Modifier tracking and language-switch gesture recognition.
//!
//! Pure logic driven by the low-level keyboard hook, kept free of Windows
//! types so it can be exercised without a desktop session.

use serde::{Deserialize, Serialize};

// Keyboard message kinds
pub const WM_KEYDOWN: u32 = 0x0100;
pub const WM_KEYUP: u32 = 0x0101;
pub const WM_SYSKEYDOWN: u32 = 0x0104;
pub const WM_SYSKEYUP: u32 = 0x0105;

// Virtual key codes for tracked modifiers
pub const VK_LSHIFT: u32 = 0xA0;
pub const VK_LMENU: u32 = 0xA4; // Left Alt
pub const VK_RMENU: u32 = 0xA5; // Right Alt

/// Which key sequence counts as a language switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GesturePolicy {
    /// Left Alt released while Left Shift is held, or the reverse.
    /// Plain Alt+Tab and Alt menus never trigger a check.
    #[default]
    AltShift,
    /// Any Alt release. Catches custom switch chords at the cost of
    /// checking after every Alt shortcut.
    AnyAlt,
}

/// Press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Down,
    Up,
}

impl KeyDirection {
    /// Classifies a low-level keyboard message.
    pub fn from_message(msg: u32) -> Option<Self> {
        match msg {
            WM_KEYDOWN | WM_SYSKEYDOWN => Some(Self::Down),
            WM_KEYUP | WM_SYSKEYUP => Some(Self::Up),
            _ => None,
        }
    }
}

/// What the hook does with one intercepted event. Every variant passes the
/// event down the hook chain unchanged; input is never swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    Forward,
    /// Report a gesture, then forward.
    NotifyAndForward,
}

/// Pressed state of the tracked modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierKeyState {
    pub left_alt: bool,
    pub left_shift: bool,
    pub right_alt: bool,
}

/// Feeds key events through a [`GesturePolicy`].
#[derive(Debug, Default)]
pub struct GestureTracker {
    policy: GesturePolicy,
    state: ModifierKeyState,
}

impl GestureTracker {
    pub fn new(policy: GesturePolicy) -> Self {
        Self {
            policy,
            state: ModifierKeyState::default(),
        }
    }

    pub fn state(&self) -> ModifierKeyState {
        self.state
    }

    /// Records one key event. Returns true when it completes a gesture.
    pub fn observe(&mut self, vk_code: u32, direction: KeyDirection) -> bool {
        let pressed = direction == KeyDirection::Down;

        // The other modifier is sampled before this event updates state
        let gesture = match (self.policy, vk_code, direction) {
            (GesturePolicy::AltShift, VK_LMENU, KeyDirection::Up) => self.state.left_shift,
            (GesturePolicy::AltShift, VK_LSHIFT, KeyDirection::Up) => self.state.left_alt,
            (GesturePolicy::AnyAlt, VK_LMENU | VK_RMENU, KeyDirection::Up) => true,
            _ => false,
        };

        match vk_code {
            VK_LMENU => self.state.left_alt = pressed,
            VK_LSHIFT => self.state.left_shift = pressed,
            VK_RMENU => self.state.right_alt = pressed,
            _ => {}
        }

        gesture
    }

    /// Handles one low-level hook call. Negative `n_code` values belong to
    /// the chain, not to us; `vk_code` is only read for key messages.
    pub fn on_hook_event(
        &mut self,
        n_code: i32,
        message: u32,
        vk_code: impl FnOnce() -> u32,
    ) -> HookAction {
        if n_code < 0 {
            return HookAction::Forward;
        }
        let Some(direction) = KeyDirection::from_message(message) else {
            return HookAction::Forward;
        };

        if self.observe(vk_code(), direction) {
            HookAction::NotifyAndForward
        } else {
            HookAction::Forward
        }
    }
}
