/// Entities: Player (Fire/Water) and interactive Elements.
///
/// Players own a small movement state machine (Idle ↔ Walking).
/// Elements are one sum type; relationships between elements are stored as
/// arena indices (`ElementId`) and resolved through `WorldState`, so a
/// collected stone can be tombstoned without dangling references.

use super::geometry::{Rect, CELL_SIZE};
use super::grid::{Cell, LevelGrid};
use super::tile::{Affinity, Block, Glyph, Kind};

/// Walk-cycle frames per facing.
pub const FRAME_COUNT: usize = 4;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Up,
    Down,
    Left,
    Right,
}

/// One discrete cell-step request.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveDir {
    Left,
    Right,
    Up,
    Down,
}

impl MoveDir {
    pub fn delta(self) -> (i32, i32) {
        match self {
            MoveDir::Left => (-1, 0),
            MoveDir::Right => (1, 0),
            MoveDir::Up => (0, -1),
            MoveDir::Down => (0, 1),
        }
    }
}

/// Per-player input for one tick.
/// Movement = held direction, interact = modifier held this tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlayerInput {
    pub movement: Option<MoveDir>,
    pub interact: bool,
}

/// Result of a `move_to_cell` request.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveOutcome {
    /// Already walking; requests are not queued.
    Rejected,
    /// Destination blocked: facing changed, position kept.
    Bumped,
    /// Walk started toward the destination.
    Started,
}

/// Step animation parameters (from `SpeedConfig`).
#[derive(Clone, Copy, Debug)]
pub struct StepTiming {
    pub step: i32,
    pub duration_ms: u64,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub affinity: Affinity,
    pub rect: Rect,
    pub facing: Facing,
    pub alive: bool,
    /// Remaining pixel offset of the in-flight step; None when idle.
    pub walk_offset: Option<(i32, i32)>,
    /// Walk-cycle frame; None when idle.
    pub frame: Option<usize>,
    last_step_ms: Option<u64>,
}

impl Player {
    pub fn new(affinity: Affinity, col: i32, row: i32) -> Self {
        Player {
            affinity,
            rect: Rect::cell(col, row),
            facing: Facing::Down,
            alive: true,
            walk_offset: None,
            frame: None,
            last_step_ms: None,
        }
    }

    pub fn is_walking(&self) -> bool {
        self.walk_offset.is_some()
    }

    /// Request a one-cell step. `is_blocked` decides whether the tentative
    /// destination rect collides with walls or closed doors.
    pub fn move_to_cell(&mut self, dir: MoveDir, is_blocked: impl Fn(&Rect) -> bool) -> MoveOutcome {
        if self.is_walking() {
            return MoveOutcome::Rejected;
        }

        let (dx, dy) = dir.delta();
        let offset = (dx * CELL_SIZE, dy * CELL_SIZE);
        let target = self.rect.offset(offset.0, offset.1);
        self.turn_toward(offset);

        if is_blocked(&target) {
            self.frame = None;
            return MoveOutcome::Bumped;
        }
        self.walk_offset = Some(offset);
        MoveOutcome::Started
    }

    /// Advance the in-flight step. Returns true on the tick the step lands.
    pub fn animate(&mut self, now_ms: u64, timing: StepTiming) -> bool {
        let Some((ox, oy)) = self.walk_offset else { return false };

        let do_step = match (self.last_step_ms, self.frame) {
            (None, _) | (_, None) => {
                self.frame = Some(0);
                true
            }
            (Some(last), Some(frame)) if now_ms.saturating_sub(last) > timing.duration_ms => {
                self.frame = Some((frame + 1) % FRAME_COUNT);
                true
            }
            _ => false,
        };
        if !do_step {
            return false;
        }

        self.last_step_ms = Some(now_ms);
        let sx = ox.signum() * ox.abs().min(timing.step);
        let sy = oy.signum() * oy.abs().min(timing.step);
        self.rect = self.rect.offset(sx, sy);
        let remaining = (ox - sx, oy - sy);
        self.turn_toward(remaining);

        if remaining == (0, 0) {
            self.reset_walking();
            return true;
        }
        self.walk_offset = Some(remaining);
        false
    }

    /// Cancel any in-flight step (teleport, landing).
    pub fn reset_walking(&mut self) {
        self.walk_offset = None;
        self.frame = None;
        self.last_step_ms = None;
    }

    /// Hazard check after a completed step.
    /// Returns the block that killed the player, if any.
    pub fn after_move_checks(&mut self, grid: &LevelGrid) -> Option<Block> {
        let hazards = self.affinity.hazards();
        let lethal = self
            .rect
            .covered_cells()
            .map(|(c, r)| grid.block_at(c, r))
            .find(|b| hazards.contains(b));
        if lethal.is_some() {
            self.alive = false;
        }
        lethal
    }

    /// Snap onto another rect (portal exit). No hazard check.
    pub fn teleport_to(&mut self, rect: Rect) {
        self.reset_walking();
        self.rect = rect;
    }

    fn turn_toward(&mut self, (dx, dy): (i32, i32)) {
        self.facing = if dx < 0 {
            Facing::Left
        } else if dx > 0 {
            Facing::Right
        } else if dy < 0 {
            Facing::Up
        } else if dy > 0 {
            Facing::Down
        } else {
            self.facing
        };
    }
}

// ── Interactive elements ──

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ElementId(pub usize);

/// Per-kind data, including the element's links into the arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementKind {
    /// Ruby (Fire) or Aquamarine (Water).
    Stone { affinity: Affinity, owner: Option<Affinity>, exit: Option<ElementId> },
    Exit { affinity: Affinity, owner: Option<Affinity>, stones: Vec<ElementId> },
    DoorButton { kind: Kind, doors: Vec<ElementId> },
    /// Active = closed. `watchers` are the players it never closes on.
    Door { kind: Kind, buttons: Vec<ElementId>, watchers: Vec<Affinity> },
    PortalSwitch { kind: Kind, portals: Vec<ElementId>, co_switches: Vec<ElementId> },
    /// Active = input side.
    Portal { kind: Kind, other: Option<ElementId> },
}

#[derive(Clone, Debug)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    pub cell: Cell,
    pub active: bool,
    /// One-tick pulse: set by this tick's interaction phase only.
    pub interacted: bool,
    /// PortalSwitch debounce.
    pub paused: bool,
    /// Collected stones are tombstoned, never reused.
    pub removed: bool,
}

impl Element {
    /// Build an unwired element from a placement.
    /// Returns None for player glyphs (they are not elements).
    pub fn from_glyph(id: ElementId, glyph: Glyph, cell: Cell) -> Option<Element> {
        let (kind, active) = match glyph {
            Glyph::Player(_) => return None,
            Glyph::Stone(affinity) => (ElementKind::Stone { affinity, owner: None, exit: None }, true),
            Glyph::Exit(affinity) => (ElementKind::Exit { affinity, owner: None, stones: vec![] }, false),
            Glyph::DoorButton(kind) => (ElementKind::DoorButton { kind, doors: vec![] }, false),
            Glyph::Door(kind) => (ElementKind::Door { kind, buttons: vec![], watchers: vec![] }, true),
            Glyph::PortalSwitch(kind) => {
                (ElementKind::PortalSwitch { kind, portals: vec![], co_switches: vec![] }, false)
            }
            Glyph::InputPortal(kind) => (ElementKind::Portal { kind, other: None }, true),
            Glyph::OutputPortal(kind) => (ElementKind::Portal { kind, other: None }, false),
        };
        Some(Element { id, kind, cell, active, interacted: false, paused: false, removed: false })
    }

    pub fn rect(&self) -> Rect {
        Rect::cell(self.cell.0, self.cell.1)
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_door(&self) -> bool {
        matches!(self.kind, ElementKind::Door { .. })
    }

    /// Closed door in the world: blocks movement.
    pub fn blocks_movement(&self) -> bool {
        self.is_door() && self.active && !self.removed
    }

    pub fn is_input_portal(&self) -> bool {
        matches!(self.kind, ElementKind::Portal { .. }) && self.active
    }

    pub fn reverse_direction(&mut self) {
        if matches!(self.kind, ElementKind::Portal { .. }) {
            self.active = !self.active;
        }
    }

    /// Mark a collected stone as gone from the world.
    pub fn remove(&mut self) {
        self.active = false;
        self.removed = true;
    }

    pub fn label(&self) -> &'static str {
        match self.kind {
            ElementKind::Stone { affinity: Affinity::Fire, .. } => "ruby",
            ElementKind::Stone { affinity: Affinity::Water, .. } => "aquamarine",
            ElementKind::Exit { affinity: Affinity::Fire, .. } => "fire exit",
            ElementKind::Exit { affinity: Affinity::Water, .. } => "water exit",
            ElementKind::DoorButton { .. } => "button",
            ElementKind::Door { .. } => "door",
            ElementKind::PortalSwitch { .. } => "switch",
            ElementKind::Portal { .. } => "portal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMING: StepTiming = StepTiming { step: 4, duration_ms: 70 };

    /// Drive animation with timestamps far enough apart that every call steps.
    fn walk_to_end(p: &mut Player) -> usize {
        let mut calls = 0;
        let mut now = 0;
        while p.is_walking() {
            p.animate(now, TIMING);
            now += 100;
            calls += 1;
            assert!(calls < 100, "walk never finished");
        }
        calls
    }

    #[test]
    fn walk_lands_on_next_cell() {
        let mut p = Player::new(Affinity::Fire, 2, 2);
        assert_eq!(p.move_to_cell(MoveDir::Right, |_| false), MoveOutcome::Started);
        // Logical position does not jump at request time
        assert_eq!(p.rect, Rect::cell(2, 2));
        assert_eq!(walk_to_end(&mut p), (CELL_SIZE / TIMING.step) as usize);
        assert_eq!(p.rect, Rect::cell(3, 2));
        assert_eq!(p.facing, Facing::Right);
        assert!(p.frame.is_none());
    }

    #[test]
    fn second_request_rejected_while_walking() {
        let mut p = Player::new(Affinity::Water, 0, 0);
        p.move_to_cell(MoveDir::Down, |_| false);
        assert_eq!(p.move_to_cell(MoveDir::Left, |_| false), MoveOutcome::Rejected);
        assert_eq!(p.walk_offset, Some((0, CELL_SIZE)));
    }

    #[test]
    fn bump_turns_without_moving() {
        let mut p = Player::new(Affinity::Fire, 1, 1);
        assert_eq!(p.move_to_cell(MoveDir::Up, |_| true), MoveOutcome::Bumped);
        assert_eq!(p.facing, Facing::Up);
        assert_eq!(p.rect, Rect::cell(1, 1));
        assert!(!p.is_walking());
    }

    #[test]
    fn animation_waits_for_cadence() {
        let mut p = Player::new(Affinity::Fire, 0, 0);
        p.move_to_cell(MoveDir::Right, |_| false);
        p.animate(1000, TIMING); // first step is immediate
        assert_eq!(p.rect.x, 4);
        p.animate(1050, TIMING); // too soon
        assert_eq!(p.rect.x, 4);
        p.animate(1070, TIMING); // exactly the threshold is still too soon
        assert_eq!(p.rect.x, 4);
        p.animate(1071, TIMING);
        assert_eq!(p.rect.x, 8);
        assert_eq!(p.frame, Some(1));
    }

    #[test]
    fn partial_last_step_is_clamped() {
        let mut p = Player::new(Affinity::Fire, 0, 0);
        p.move_to_cell(MoveDir::Left, |_| false);
        let timing = StepTiming { step: 5, duration_ms: 0 };
        let mut now = 0;
        while p.is_walking() {
            p.animate(now, timing);
            now += 1;
        }
        assert_eq!(p.rect, Rect::cell(-1, 0));
    }

    #[test]
    fn teleport_cancels_walk() {
        let mut p = Player::new(Affinity::Water, 0, 0);
        p.move_to_cell(MoveDir::Right, |_| false);
        p.animate(0, TIMING);
        p.teleport_to(Rect::cell(5, 5));
        assert!(!p.is_walking());
        assert_eq!(p.rect, Rect::cell(5, 5));
    }

    #[test]
    fn initial_element_states() {
        let el = |g| Element::from_glyph(ElementId(0), g, (0, 0)).unwrap();
        assert!(el(Glyph::Stone(Affinity::Fire)).active);
        assert!(!el(Glyph::Exit(Affinity::Water)).active);
        assert!(el(Glyph::Door(Kind::One)).blocks_movement());
        assert!(!el(Glyph::DoorButton(Kind::Two)).active);
        assert!(!el(Glyph::PortalSwitch(Kind::One)).active);
        assert!(el(Glyph::InputPortal(Kind::One)).is_input_portal());
        assert!(!el(Glyph::OutputPortal(Kind::One)).is_input_portal());
        assert!(Element::from_glyph(ElementId(0), Glyph::Player(Affinity::Fire), (0, 0)).is_none());
    }

    #[test]
    fn portal_reverses_only_portals() {
        let mut portal = Element::from_glyph(ElementId(0), Glyph::OutputPortal(Kind::Two), (0, 0)).unwrap();
        portal.reverse_direction();
        assert!(portal.is_input_portal());
        let mut door = Element::from_glyph(ElementId(1), Glyph::Door(Kind::Two), (0, 0)).unwrap();
        door.reverse_direction();
        assert!(door.active);
    }
}
