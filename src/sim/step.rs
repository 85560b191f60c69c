/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Movement requests (Fire → Water), at most one per player
///   2. Interaction dispatch for players holding interact
///      (Fire → Water; overlapped elements in scan order)
///   3. Update pass: player animation + landing checks, then elements
///      in scan order
///   4. Win / lose check, then the interacted-pulse reset
///
/// Rendering happens outside, after the step returns.

use tracing::debug;

use crate::domain::entity::{ElementId, ElementKind, MoveOutcome, PlayerInput};
use crate::domain::tile::Affinity;
use super::event::GameEvent;
use super::world::WorldState;

/// Both players' input for one tick, indexed by `Affinity::index()`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TickInput {
    pub players: [PlayerInput; 2],
}

impl TickInput {
    pub fn of(&self, who: Affinity) -> PlayerInput {
        self.players[who.index()]
    }
}

/// Who triggers an interaction: a player, or an element forwarding one
/// (a button pressing its doors).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Actor {
    Player(Affinity),
    Element(ElementId),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Verdict {
    Continue,
    Won,
    Lost,
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: &TickInput, now_ms: u64, events: &mut Vec<GameEvent>) -> Verdict {
    resolve_movement(world, input, events);
    resolve_interactions(world, input, events);
    resolve_players(world, now_ms, events);
    resolve_elements(world, events);
    resolve_verdict(world, events)
}

// ══════════════════════════════════════════════════════════════
// Movement
// ══════════════════════════════════════════════════════════════

fn resolve_movement(world: &mut WorldState, input: &TickInput, events: &mut Vec<GameEvent>) {
    for who in Affinity::ALL {
        let Some(dir) = input.of(who).movement else { continue };
        // Collision never looks at players, so the player can be taken out
        // of the world while the query borrows it.
        let Some(mut player) = world.players[who.index()].take() else { continue };
        if player.alive && player.move_to_cell(dir, |r| world.is_blocked(r)) == MoveOutcome::Bumped {
            events.push(GameEvent::PlayerBumped { who });
        }
        world.players[who.index()] = Some(player);
    }
}

// ══════════════════════════════════════════════════════════════
// Interaction dispatch
// ══════════════════════════════════════════════════════════════

fn resolve_interactions(world: &mut WorldState, input: &TickInput, events: &mut Vec<GameEvent>) {
    for who in Affinity::ALL {
        if !input.of(who).interact { continue; }
        let Some(rect) = world.player(who).filter(|p| p.alive).map(|p| p.rect) else { continue };
        for id in world.elements_overlapping(&rect) {
            // A stone collected earlier in this pass is gone
            if world.element(id).removed { continue; }
            // A portal earlier in this pass may have moved the player
            let Some(now_at) = world.player(who).map(|p| p.rect) else { break };
            if !world.element(id).rect().overlaps(&now_at) { continue; }
            interact(world, id, Actor::Player(who), events);
        }
    }
}

/// `interact_with` for every element kind.
pub fn interact(world: &mut WorldState, target: ElementId, actor: Actor, events: &mut Vec<GameEvent>) {
    let kind = world.element(target).kind.clone();
    match kind {
        ElementKind::Stone { owner, .. } => {
            if let (Actor::Player(who), Some(owner)) = (actor, owner) {
                if who == owner {
                    let stone = world.element_mut(target);
                    stone.interacted = true;
                    stone.remove();
                    events.push(GameEvent::StoneCollected { by: who, stone: target });
                }
            }
        }
        ElementKind::Exit { owner, .. } => {
            let exit = world.element_mut(target);
            if exit.active && matches!(actor, Actor::Player(who) if Some(who) == owner) {
                exit.interacted = true;
            }
        }
        ElementKind::DoorButton { doors, .. } => {
            let button = world.element_mut(target);
            if !button.active {
                events.push(GameEvent::ButtonPressed { button: target });
            }
            button.set_active(true);
            for door in doors {
                interact(world, door, Actor::Element(target), events);
            }
            world.element_mut(target).interacted = true;
        }
        ElementKind::Door { buttons, .. } => {
            if let Actor::Element(button) = actor {
                if buttons.contains(&button) {
                    let door = world.element_mut(target);
                    if door.active {
                        events.push(GameEvent::DoorOpened { door: target });
                    }
                    door.set_active(false);
                    door.interacted = true;
                }
            }
        }
        ElementKind::PortalSwitch { portals, co_switches, .. } => {
            if !world.element(target).paused {
                let switch = world.element_mut(target);
                let active = !switch.active;
                switch.set_active(active);
                switch.paused = true;
                events.push(GameEvent::SwitchToggled { switch: target, active });
                for co in co_switches {
                    world.element_mut(co).set_active(active);
                }
                for portal in portals {
                    let p = world.element_mut(portal);
                    p.reverse_direction();
                    events.push(GameEvent::PortalReversed { portal, is_input: p.active });
                }
            }
            world.element_mut(target).interacted = true;
        }
        ElementKind::Portal { other, .. } => {
            let (Actor::Player(who), Some(other)) = (actor, other) else { return };
            if !world.element(target).is_input_portal() { return; }
            let dest = world.element(other).rect();
            if let Some(player) = world.player_mut(who) {
                player.teleport_to(dest);
                events.push(GameEvent::Teleported { who, from: target, to: other });
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Update pass
// ══════════════════════════════════════════════════════════════

fn resolve_players(world: &mut WorldState, now_ms: u64, events: &mut Vec<GameEvent>) {
    let timing = world.speed.step_timing();
    for who in Affinity::ALL {
        let Some(player) = world.players[who.index()].as_mut() else { continue };
        if !player.animate(now_ms, timing) { continue; }
        if let Some(block) = player.after_move_checks(&world.grid) {
            debug!(who = who.name(), ?block, "player died");
            events.push(GameEvent::PlayerDied { who, block });
        }
    }
}

fn resolve_elements(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    for idx in 0..world.elements.len() {
        let id = ElementId(idx);
        if world.element(id).removed { continue; }
        update_element(world, id, events);
    }
}

/// Per-tick `update` for every element kind.
pub fn update_element(world: &mut WorldState, id: ElementId, events: &mut Vec<GameEvent>) {
    let el = world.element(id);
    let (active, interacted, rect) = (el.active, el.interacted, el.rect());
    match &el.kind {
        ElementKind::Exit { affinity, stones, .. } => {
            if !active && stones.iter().all(|&s| world.element(s).removed) {
                let affinity = *affinity;
                world.element_mut(id).set_active(true);
                events.push(GameEvent::ExitOpened { exit: id, affinity });
            }
        }
        ElementKind::DoorButton { .. } => {
            if !interacted && active {
                world.element_mut(id).set_active(false);
            }
        }
        ElementKind::Door { watchers, .. } => {
            if !interacted && !active && !world.any_player_overlaps(watchers, &rect) {
                world.element_mut(id).set_active(true);
                events.push(GameEvent::DoorClosed { door: id });
            }
        }
        ElementKind::PortalSwitch { .. } => {
            if el.paused && !interacted {
                world.element_mut(id).paused = false;
            }
        }
        ElementKind::Stone { .. } | ElementKind::Portal { .. } => {}
    }
}

// ══════════════════════════════════════════════════════════════
// Win / lose check
// ══════════════════════════════════════════════════════════════

/// Exit element bound to this affinity, if the level has one.
pub fn exit_of(world: &WorldState, who: Affinity) -> Option<ElementId> {
    world.elements.iter()
        .find(|e| matches!(e.kind, ElementKind::Exit { affinity, .. } if affinity == who))
        .map(|e| e.id)
}

fn resolve_verdict(world: &mut WorldState, events: &mut Vec<GameEvent>) -> Verdict {
    let lost = Affinity::ALL.iter()
        .filter_map(|&a| world.player(a))
        .any(|p| !p.alive);
    if lost {
        events.push(GameEvent::LevelLost);
        return Verdict::Lost;
    }

    let won = match (exit_of(world, Affinity::Fire), exit_of(world, Affinity::Water)) {
        (Some(f), Some(w)) => world.element(f).interacted && world.element(w).interacted,
        _ => false,
    };
    if won {
        events.push(GameEvent::LevelWon);
        return Verdict::Won;
    }

    for el in &mut world.elements {
        el.interacted = false;
    }
    Verdict::Continue
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
