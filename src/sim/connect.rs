/// Entity instantiation and connection wiring for a freshly parsed level.
///
/// ## Wiring rules (per family)
///
///   | Family          | Wiring                                               |
///   |-----------------|------------------------------------------------------|
///   | Stone ↔ Exit    | exit → player always; stones ↔ exit + stone → player |
///   |                 | only when both stones and exit exist                 |
///   | Button ↔ Door   | every button × every door of the same kind; doors    |
///   |                 | watch both players                                   |
///   | Switch ↔ Portal | endpoints ↔ each other when both exist; every switch |
///   |                 | → both endpoints; switches of a kind form a full     |
///   |                 | mesh (self excluded)                                 |
///
/// A family missing one side is left unwired. That is the normal
/// "level does not use this mechanic" case, never an error.

use tracing::debug;

use crate::config::SpeedConfig;
use crate::domain::entity::{Element, ElementId, ElementKind, Player};
use crate::domain::grid::LevelGrid;
use crate::domain::tile::{Affinity, Glyph, Kind};

use super::world::WorldState;

/// Instantiate every entity of the grid and wire the relationship graph.
pub fn build_world(grid: LevelGrid, speed: SpeedConfig) -> WorldState {
    let players = Affinity::ALL.map(|aff| {
        grid.placements
            .singleton(Glyph::Player(aff))
            .map(|(col, row)| Player::new(aff, col, row))
    });

    let mut elements = Vec::new();
    for &(glyph, cell) in grid.placements.in_scan_order() {
        let id = ElementId(elements.len());
        if let Some(el) = Element::from_glyph(id, glyph, cell) {
            elements.push(el);
        }
    }

    debug!(elements = ?elements.iter().map(Element::label).collect::<Vec<_>>(), "elements created");
    let mut world = WorldState { grid, players, elements, speed };
    resolve_connections(&mut world);
    world
}

/// Wire every family. Runs once per load, after instantiation.
pub fn resolve_connections(world: &mut WorldState) {
    for aff in Affinity::ALL {
        connect_stones(world, aff);
    }
    for kind in Kind::ALL {
        connect_doors(world, kind);
        connect_portals(world, kind);
    }
}

/// IDs of elements that came from `glyph`, scan order.
fn ids_of(world: &WorldState, glyph: Glyph) -> Vec<ElementId> {
    let cells = world.grid.placements.cells_of(glyph);
    world.elements.iter()
        .filter(|e| cells.contains(&e.cell) && glyph_matches(&e.kind, glyph))
        .map(|e| e.id)
        .collect()
}

fn glyph_matches(kind: &ElementKind, glyph: Glyph) -> bool {
    match (kind, glyph) {
        (ElementKind::Stone { affinity, .. }, Glyph::Stone(a)) => *affinity == a,
        (ElementKind::Exit { affinity, .. }, Glyph::Exit(a)) => *affinity == a,
        (ElementKind::DoorButton { kind, .. }, Glyph::DoorButton(k)) => *kind == k,
        (ElementKind::Door { kind, .. }, Glyph::Door(k)) => *kind == k,
        (ElementKind::PortalSwitch { kind, .. }, Glyph::PortalSwitch(k)) => *kind == k,
        (ElementKind::Portal { kind, .. }, Glyph::InputPortal(k) | Glyph::OutputPortal(k)) => *kind == k,
        _ => false,
    }
}

fn connect_stones(world: &mut WorldState, aff: Affinity) {
    let Some(exit) = ids_of(world, Glyph::Exit(aff)).first().copied() else {
        debug!(affinity = aff.name(), "no exit; stones left unwired");
        return;
    };
    let player = world.player(aff).map(|p| p.affinity);
    let stones = ids_of(world, Glyph::Stone(aff));

    for &stone in &stones {
        if let ElementKind::Stone { owner, exit: stone_exit, .. } = &mut world.element_mut(stone).kind {
            *owner = player;
            *stone_exit = Some(exit);
        }
    }
    if let ElementKind::Exit { owner, stones: gate, .. } = &mut world.element_mut(exit).kind {
        *owner = player;
        gate.extend(stones.iter().copied());
    }
    debug!(affinity = aff.name(), stones = stones.len(), "exit wired");
}

fn connect_doors(world: &mut WorldState, kind: Kind) {
    let buttons = ids_of(world, Glyph::DoorButton(kind));
    let doors = ids_of(world, Glyph::Door(kind));
    let watchers: Vec<Affinity> = Affinity::ALL.into_iter()
        .filter(|&a| world.player(a).is_some())
        .collect();

    for &door in &doors {
        if let ElementKind::Door { buttons: linked, watchers: w, .. } = &mut world.element_mut(door).kind {
            linked.extend(buttons.iter().copied());
            *w = watchers.clone();
        }
    }
    for &button in &buttons {
        if let ElementKind::DoorButton { doors: linked, .. } = &mut world.element_mut(button).kind {
            linked.extend(doors.iter().copied());
        }
    }
    if !buttons.is_empty() || !doors.is_empty() {
        debug!(?kind, buttons = buttons.len(), doors = doors.len(), "doors wired");
    }
}

fn connect_portals(world: &mut WorldState, kind: Kind) {
    let input = ids_of(world, Glyph::InputPortal(kind)).first().copied();
    let output = ids_of(world, Glyph::OutputPortal(kind)).first().copied();
    let switches = ids_of(world, Glyph::PortalSwitch(kind));

    let pair = match (input, output) {
        (Some(i), Some(o)) => {
            set_partner(world, i, o);
            set_partner(world, o, i);
            Some([i, o])
        }
        _ => None,
    };

    for &switch in &switches {
        let others: Vec<ElementId> = switches.iter().copied().filter(|&s| s != switch).collect();
        if let ElementKind::PortalSwitch { portals, co_switches, .. } = &mut world.element_mut(switch).kind {
            if let Some(pair) = pair {
                portals.extend(pair);
            }
            co_switches.extend(others);
        }
    }
    if pair.is_some() || !switches.is_empty() {
        debug!(?kind, paired = pair.is_some(), switches = switches.len(), "portals wired");
    }
}

fn set_partner(world: &mut WorldState, portal: ElementId, partner: ElementId) {
    if let ElementKind::Portal { other, .. } = &mut world.element_mut(portal).kind {
        *other = Some(partner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(rows: &[&str]) -> WorldState {
        let grid = LevelGrid::parse(&rows.join("\n"), 25).unwrap();
        build_world(grid, SpeedConfig::default())
    }

    fn find(w: &WorldState, label: &str) -> Vec<ElementId> {
        w.elements.iter().filter(|e| e.label() == label).map(|e| e.id).collect()
    }

    #[test]
    fn elements_created_in_scan_order() {
        let w = world(&[
            "f<b.",
            "dF.w",
        ]);
        let labels: Vec<_> = w.elements.iter().map(|e| e.label()).collect();
        assert_eq!(labels, vec!["ruby", "button", "door", "fire exit"]);
        for (i, e) in w.elements.iter().enumerate() {
            assert_eq!(e.id, ElementId(i));
        }
        assert!(w.player(Affinity::Fire).is_some());
        assert!(w.player(Affinity::Water).is_some());
    }

    #[test]
    fn stones_bind_to_exit_and_player() {
        let w = world(&["f<<F>"]);
        let exit = find(&w, "fire exit")[0];
        let rubies = find(&w, "ruby");
        match &w.element(exit).kind {
            ElementKind::Exit { owner, stones, .. } => {
                assert_eq!(*owner, Some(Affinity::Fire));
                assert_eq!(stones, &rubies);
            }
            other => panic!("unexpected {other:?}"),
        }
        for r in rubies {
            assert_eq!(
                w.element(r).kind,
                ElementKind::Stone { affinity: Affinity::Fire, owner: Some(Affinity::Fire), exit: Some(exit) }
            );
        }
        // No water exit: aquamarine stays unbound
        let aqua = find(&w, "aquamarine")[0];
        assert_eq!(
            w.element(aqua).kind,
            ElementKind::Stone { affinity: Affinity::Water, owner: None, exit: None }
        );
    }

    #[test]
    fn exit_without_stones_still_knows_its_player() {
        let w = world(&["wW"]);
        let exit = find(&w, "water exit")[0];
        assert_eq!(
            w.element(exit).kind,
            ElementKind::Exit { affinity: Affinity::Water, owner: Some(Affinity::Water), stones: vec![] }
        );
    }

    #[test]
    fn buttons_and_doors_cross_wire_by_kind() {
        let w = world(&[
            "fbbB",
            "wddD",
        ]);
        let (b1, b2, big_b) = (ElementId(0), ElementId(1), ElementId(2));
        let (d1, d2, big_d) = (ElementId(3), ElementId(4), ElementId(5));
        assert_eq!(w.element(b1).kind, ElementKind::DoorButton { kind: Kind::One, doors: vec![d1, d2] });
        assert_eq!(w.element(b2).kind, ElementKind::DoorButton { kind: Kind::One, doors: vec![d1, d2] });
        assert_eq!(w.element(big_b).kind, ElementKind::DoorButton { kind: Kind::Two, doors: vec![big_d] });
        assert_eq!(
            w.element(d2).kind,
            ElementKind::Door {
                kind: Kind::One,
                buttons: vec![b1, b2],
                watchers: vec![Affinity::Fire, Affinity::Water],
            }
        );
    }

    #[test]
    fn door_without_button_is_tolerated() {
        let w = world(&["fd"]);
        assert_eq!(
            w.element(ElementId(0)).kind,
            ElementKind::Door { kind: Kind::One, buttons: vec![], watchers: vec![Affinity::Fire] }
        );
    }

    #[test]
    fn switches_mesh_and_reach_both_portals() {
        let w = world(&[
            "yiy",
            "oyI",
        ]);
        // scan order: y(0) i(1) y(2) o(3) y(4) I(5)
        let (s0, s2, s4) = (ElementId(0), ElementId(2), ElementId(4));
        let (i, o) = (ElementId(1), ElementId(3));
        assert_eq!(w.element(i).kind, ElementKind::Portal { kind: Kind::One, other: Some(o) });
        assert_eq!(w.element(o).kind, ElementKind::Portal { kind: Kind::One, other: Some(i) });
        assert_eq!(
            w.element(s2).kind,
            ElementKind::PortalSwitch { kind: Kind::One, portals: vec![i, o], co_switches: vec![s0, s4] }
        );
        // Lone kind-2 endpoint has no partner
        assert_eq!(w.element(ElementId(5)).kind, ElementKind::Portal { kind: Kind::Two, other: None });
    }

    #[test]
    fn switch_without_portal_pair_keeps_mesh_only() {
        let w = world(&["YYi"]);
        assert_eq!(
            w.element(ElementId(0)).kind,
            ElementKind::PortalSwitch { kind: Kind::Two, portals: vec![], co_switches: vec![ElementId(1)] }
        );
    }
}
