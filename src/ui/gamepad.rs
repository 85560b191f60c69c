/// Gamepad input tracker using gilrs.
///
/// The first pad seen drives Fire, the second drives Water. Further pads
/// are ignored until a seated pad disconnects and frees its slot. Button mapping is loaded from config.toml via
/// `load_button_config()`. Default mapping:
///   D-pad / Left Stick    →  Movement
///   A / B / R1            →  Interact (held)
///   Start                 →  Confirm
///   Select                →  Quit
///   Y                     →  Restart

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, GamepadId, Gilrs};
#[cfg(feature = "gamepad")]
use tracing::info;

use crate::config::GamepadConfig;
use crate::domain::entity::{MoveDir, PlayerInput};
use crate::domain::tile::Affinity;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    L2,      // LeftTrigger2
    R2,      // RightTrigger2
    Start,
    Select,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2"  => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2  => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Per-button state: held (continuous) and just_pressed (edge).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

/// Action-to-button mapping (loaded from config).
struct ActionMap {
    interact: Vec<Btn>,
    confirm: Vec<Btn>,
    cancel: Vec<Btn>,
    restart: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            interact: vec![Btn::A, Btn::B, Btn::R1],
            confirm:  vec![Btn::Start],
            cancel:   vec![Btn::Select],
            restart:  vec![Btn::Y],
        }
    }
}

/// State of one physical pad.
#[derive(Clone, Copy, Debug, Default)]
struct PadState {
    // All tracked buttons (indexed by Btn)
    buttons: [BtnState; 10],

    dpad_up: bool,
    dpad_down: bool,
    dpad_left: bool,
    dpad_right: bool,

    stick_x: f32,
    stick_y: f32,
}

fn btn_index(btn: Btn) -> usize {
    btn as usize
}

impl PadState {
    fn any_held(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[btn_index(b)].held)
    }

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[btn_index(b)].just_pressed)
    }

    fn movement(&self) -> Option<MoveDir> {
        if self.dpad_left || self.stick_x < -STICK_DEADZONE {
            Some(MoveDir::Left)
        } else if self.dpad_right || self.stick_x > STICK_DEADZONE {
            Some(MoveDir::Right)
        } else if self.dpad_up || self.stick_y > STICK_DEADZONE {
            Some(MoveDir::Up)
        } else if self.dpad_down || self.stick_y < -STICK_DEADZONE {
            Some(MoveDir::Down)
        } else {
            None
        }
    }

    fn clear_just_pressed(&mut self) {
        for b in &mut self.buttons { b.just_pressed = false; }
    }
}

/// Pad id per player slot. A disconnect frees the slot for the next pad.
#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
#[derive(Debug)]
struct PadSlots<I> {
    seated: [Option<I>; 2],
}

impl<I> Default for PadSlots<I> {
    fn default() -> Self {
        PadSlots { seated: [None, None] }
    }
}

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
impl<I: Copy + PartialEq> PadSlots<I> {
    fn position(&self, id: I) -> Option<usize> {
        self.seated.iter().position(|s| *s == Some(id))
    }

    /// Seat a pad in the lowest free slot. `None` when both are taken.
    fn seat(&mut self, id: I) -> Option<usize> {
        if let Some(slot) = self.position(id) {
            return Some(slot);
        }
        let slot = self.seated.iter().position(Option::is_none)?;
        self.seated[slot] = Some(id);
        Some(slot)
    }

    fn free(&mut self, id: I) {
        if let Some(slot) = self.position(id) {
            self.seated[slot] = None;
        }
    }

    fn any_seated(&self) -> bool {
        self.seated.iter().any(Option::is_some)
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    /// Seated pad ids; slot = Affinity::index().
    #[cfg(feature = "gamepad")]
    slots: PadSlots<GamepadId>,

    pads: [PadState; 2],

    action_map: ActionMap,

    pub connected: bool,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, slots, connected) = {
            match Gilrs::new() {
                Ok(g) => {
                    let mut slots = PadSlots::default();
                    for (id, _) in g.gamepads() {
                        slots.seat(id);
                    }
                    let connected = slots.any_seated();
                    (Some(g), slots, connected)
                }
                Err(_) => (None, PadSlots::default(), false),
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            #[cfg(feature = "gamepad")]
            slots,
            pads: [PadState::default(); 2],
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Load button mapping from config.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter().filter_map(|s| Btn::from_name(s)).collect()
        }
        let map = &mut self.action_map;
        let it = parse_list(&cfg.interact);
        if !it.is_empty() { map.interact = it; }
        let cf = parse_list(&cfg.confirm);
        if !cf.is_empty() { map.confirm = cf; }
        let ca = parse_list(&cfg.cancel);
        if !ca.is_empty() { map.cancel = ca; }
        let rs = parse_list(&cfg.restart);
        if !rs.is_empty() { map.restart = rs; }
    }

    pub fn update(&mut self) {
        for pad in &mut self.pads { pad.clear_just_pressed(); }

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            if matches!(event.event, EventType::Disconnected) {
                if let Some(slot) = self.slots.position(event.id) {
                    self.pads[slot] = PadState::default();
                    self.slots.free(event.id);
                    info!(player = Affinity::ALL[slot].name(), "gamepad disconnected; slot freed");
                }
                continue;
            }
            let Some(slot) = self.slot_for(event.id) else { continue };
            match event.event {
                EventType::ButtonPressed(btn, _) => self.set_button(slot, btn, true),
                EventType::ButtonReleased(btn, _) => self.set_button(slot, btn, false),
                EventType::AxisChanged(axis, value, _) => {
                    let pad = &mut self.pads[slot];
                    match axis {
                        Axis::LeftStickX => pad.stick_x = value,
                        Axis::LeftStickY => pad.stick_y = value,
                        _ => {}
                    }
                }
                _ => {}
            }
        }
        self.connected = self.slots.any_seated();
    }

    /// Slot of a pad, seating it in the first free one on first sight.
    #[cfg(feature = "gamepad")]
    fn slot_for(&mut self, id: GamepadId) -> Option<usize> {
        if let Some(slot) = self.slots.position(id) {
            return Some(slot);
        }
        let slot = self.slots.seat(id)?;
        info!(player = Affinity::ALL[slot].name(), "gamepad assigned");
        Some(slot)
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, slot: usize, gilrs_btn: Button, held: bool) {
        let pad = &mut self.pads[slot];
        // D-pad handled separately (not in Btn enum)
        match gilrs_btn {
            Button::DPadUp    => { pad.dpad_up = held; return; }
            Button::DPadDown  => { pad.dpad_down = held; return; }
            Button::DPadLeft  => { pad.dpad_left = held; return; }
            Button::DPadRight => { pad.dpad_right = held; return; }
            _ => {}
        }

        if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            let state = &mut pad.buttons[btn_index(btn)];
            state.held = held;
            if held {
                state.just_pressed = true;
            }
        }
    }

    // ── Action queries (config-driven) ──

    /// Movement and interact for the player bound to this pad slot.
    pub fn player_input(&self, who: Affinity) -> PlayerInput {
        let pad = &self.pads[who.index()];
        PlayerInput {
            movement: pad.movement(),
            interact: pad.any_held(&self.action_map.interact),
        }
    }

    pub fn confirm_pressed(&self) -> bool {
        self.pads.iter().any(|p| p.any_just_pressed(&self.action_map.confirm))
    }
    pub fn cancel_pressed(&self) -> bool {
        self.pads.iter().any(|p| p.any_just_pressed(&self.action_map.cancel))
    }
    pub fn restart_pressed(&self) -> bool {
        self.pads.iter().any(|p| p.any_just_pressed(&self.action_map.restart))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(state: &mut GamepadState, who: Affinity, btn: Btn) {
        let b = &mut state.pads[who.index()].buttons[btn_index(btn)];
        b.held = true;
        b.just_pressed = true;
    }

    #[test]
    fn button_names_parse_case_insensitively() {
        assert_eq!(Btn::from_name("a"), Some(Btn::A));
        assert_eq!(Btn::from_name("North"), Some(Btn::Y));
        assert_eq!(Btn::from_name("rb"), Some(Btn::R1));
        assert_eq!(Btn::from_name("Back"), Some(Btn::Select));
        assert_eq!(Btn::from_name("Turbo"), None);
    }

    #[test]
    fn config_replaces_only_valid_lists() {
        let mut state = GamepadState::new();
        let cfg = GamepadConfig {
            interact: vec!["X".into()],
            confirm: vec!["bogus".into()],
            cancel: vec![],
            restart: vec!["L1".into(), "nope".into()],
        };
        state.load_button_config(&cfg);
        assert_eq!(state.action_map.interact, vec![Btn::X]);
        assert_eq!(state.action_map.confirm, vec![Btn::Start]);
        assert_eq!(state.action_map.cancel, vec![Btn::Select]);
        assert_eq!(state.action_map.restart, vec![Btn::L1]);
    }

    #[test]
    fn each_pad_drives_its_own_player() {
        let mut state = GamepadState::new();
        press(&mut state, Affinity::Water, Btn::A);
        state.pads[Affinity::Fire.index()].dpad_left = true;
        state.pads[Affinity::Water.index()].stick_y = 0.9;

        let fire = state.player_input(Affinity::Fire);
        assert_eq!(fire.movement, Some(MoveDir::Left));
        assert!(!fire.interact);

        let water = state.player_input(Affinity::Water);
        assert_eq!(water.movement, Some(MoveDir::Up));
        assert!(water.interact);
    }

    #[test]
    fn stick_inside_deadzone_is_idle() {
        let mut state = GamepadState::new();
        state.pads[0].stick_x = 0.1;
        state.pads[0].stick_y = -0.2;
        assert_eq!(state.player_input(Affinity::Fire).movement, None);
    }

    #[test]
    fn freed_slot_goes_to_the_next_pad() {
        let mut slots = PadSlots::default();
        assert_eq!(slots.seat(10u32), Some(0));
        assert_eq!(slots.seat(11), Some(1));
        assert_eq!(slots.seat(12), None, "both players seated");

        // Fire's pad drops and comes back under a new id
        slots.free(10);
        assert_eq!(slots.position(11), Some(1));
        assert_eq!(slots.seat(13), Some(0));
        assert_eq!(slots.seat(11), Some(1), "seated pad keeps its slot");

        slots.free(13);
        slots.free(11);
        assert!(!slots.any_seated());
    }

    #[test]
    fn edge_presses_clear_on_update() {
        let mut state = GamepadState::new();
        press(&mut state, Affinity::Fire, Btn::Y);
        assert!(state.restart_pressed());
        state.update();
        assert!(!state.restart_pressed());
        // Still held for interact purposes
        assert!(state.pads[0].buttons[btn_index(Btn::Y)].held);
    }
}
