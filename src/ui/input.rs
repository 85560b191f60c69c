/// Input state tracker.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous movement while a key is held
///   - Interact as a held modifier (doors stay open while it is down)
///   - Both players on one keyboard in the same tick
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, poll};

use crate::domain::entity::{MoveDir, PlayerInput};

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Interact is a held modifier: it must outlast the keyboard's auto-repeat
/// delay (~500-660 ms), or a held key reads released before repeats begin.
const INTERACT_TIMEOUT: Duration = Duration::from_millis(700);

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that transitioned from "not held" → "held" during the
    /// most recent drain_events() call. Used for one-shot actions (restart).
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before simulation tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => {
                    self.raw_events.push(key);

                    match key.kind {
                        KeyEventKind::Release if self.honor_release => {
                            // Explicit release: remove from active set
                            self.last_active.remove(&key.code);
                        }
                        KeyEventKind::Release => {
                            // Ignore release when enhancement not confirmed;
                            // rely on timeout-based expiry instead
                        }
                        _ => {
                            // Press, Repeat, or any other kind:
                            // treat as active key input
                            let was_held = self.is_held_inner(key.code);
                            self.last_active.insert(key.code, Instant::now());
                            if !was_held {
                                self.fresh_presses.push(key.code);
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        // Expire keys that have timed out (fallback for terminals without Release)
        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < INTERACT_TIMEOUT);
    }

    /// Is this key currently held down?
    /// Used for continuous actions (movement).
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.is_held_inner(code)
    }

    /// Convenience: is any of these keys held?
    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    /// Used for one-shot actions (restart, confirm).
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    /// Convenience: was any of these keys freshly pressed?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        use crossterm::event::KeyModifiers;
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    /// Sample one player's movement and interact state.
    /// A direction pressed this frame wins over one held from before,
    /// so switching direction does not need a key release first.
    pub fn player_input(&self, keys: &KeyBindings) -> PlayerInput {
        let dirs = keys.directions();
        let movement = dirs.iter()
            .find(|(codes, _)| self.any_pressed(codes))
            .or_else(|| dirs.iter().find(|(codes, _)| self.any_held(codes)))
            .map(|&(_, dir)| dir);
        PlayerInput { movement, interact: self.any_latched(keys.interact) }
    }

    /// Held, with the longer interact window. With release events the
    /// key drops as soon as Release arrives.
    fn any_latched(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| {
            self.last_active.get(c)
                .map(|t| t.elapsed() < INTERACT_TIMEOUT)
                .unwrap_or(false)
        })
    }

    // ── Internal ──

    fn is_held_inner(&self, code: KeyCode) -> bool {
        self.last_active.get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }
}

// ── Key bindings ──

/// One player's keyboard layout.
pub struct KeyBindings {
    pub up: &'static [KeyCode],
    pub down: &'static [KeyCode],
    pub left: &'static [KeyCode],
    pub right: &'static [KeyCode],
    pub interact: &'static [KeyCode],
}

impl KeyBindings {
    fn directions(&self) -> [(&'static [KeyCode], MoveDir); 4] {
        [
            (self.left, MoveDir::Left),
            (self.right, MoveDir::Right),
            (self.up, MoveDir::Up),
            (self.down, MoveDir::Down),
        ]
    }
}

pub const FIRE_KEYS: KeyBindings = KeyBindings {
    up: &[KeyCode::Char('w'), KeyCode::Char('W')],
    down: &[KeyCode::Char('s'), KeyCode::Char('S')],
    left: &[KeyCode::Char('a'), KeyCode::Char('A')],
    right: &[KeyCode::Char('d'), KeyCode::Char('D')],
    interact: &[KeyCode::Char('e'), KeyCode::Char('E'), KeyCode::Char(' ')],
};

pub const WATER_KEYS: KeyBindings = KeyBindings {
    up: &[KeyCode::Up],
    down: &[KeyCode::Down],
    left: &[KeyCode::Left],
    right: &[KeyCode::Right],
    interact: &[KeyCode::Enter, KeyCode::Char('0')],
};

pub const RESTART_KEYS: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
pub const CANCEL_KEYS: &[KeyCode] = &[KeyCode::Esc];
pub const CONFIRM_KEYS: &[KeyCode] = &[KeyCode::Enter];

#[cfg(test)]
mod tests {
    use super::*;

    fn hold(input: &mut InputState, code: KeyCode) {
        input.last_active.insert(code, Instant::now());
    }

    fn pressed_ago(input: &mut InputState, code: KeyCode, ms: u64) {
        let at = Instant::now().checked_sub(Duration::from_millis(ms)).unwrap();
        input.last_active.insert(code, at);
    }

    #[test]
    fn players_read_their_own_keys() {
        let mut input = InputState::new();
        hold(&mut input, KeyCode::Char('d'));
        hold(&mut input, KeyCode::Up);
        hold(&mut input, KeyCode::Char('0'));

        let fire = input.player_input(&FIRE_KEYS);
        assert_eq!(fire.movement, Some(MoveDir::Right));
        assert!(!fire.interact);

        let water = input.player_input(&WATER_KEYS);
        assert_eq!(water.movement, Some(MoveDir::Up));
        assert!(water.interact);
    }

    #[test]
    fn fresh_press_beats_older_hold() {
        let mut input = InputState::new();
        hold(&mut input, KeyCode::Left);
        hold(&mut input, KeyCode::Down);
        input.fresh_presses.push(KeyCode::Down);
        assert_eq!(input.player_input(&WATER_KEYS).movement, Some(MoveDir::Down));
    }

    #[test]
    fn nothing_held_is_idle() {
        let input = InputState::new();
        let fire = input.player_input(&FIRE_KEYS);
        assert_eq!(fire.movement, None);
        assert!(!fire.interact);
    }

    #[test]
    fn interact_survives_auto_repeat_delay() {
        let mut input = InputState::new();
        // Held since 300 ms ago, no repeat yet
        pressed_ago(&mut input, KeyCode::Char('e'), 300);
        pressed_ago(&mut input, KeyCode::Char('d'), 300);
        let fire = input.player_input(&FIRE_KEYS);
        assert!(fire.interact);
        assert_eq!(fire.movement, None, "movement keeps the short timeout");

        pressed_ago(&mut input, KeyCode::Char('e'), 800);
        assert!(!input.player_input(&FIRE_KEYS).interact);
    }

    #[test]
    fn space_interacts_without_confirming() {
        let mut input = InputState::new();
        hold(&mut input, KeyCode::Char(' '));
        input.fresh_presses.push(KeyCode::Char(' '));
        assert!(input.player_input(&FIRE_KEYS).interact);
        assert!(!input.any_pressed(CONFIRM_KEYS));
    }
}
