/// WorldState: the entity set of one loaded level.
///
/// ## Arena
///
/// Elements live in a single `Vec<Element>` indexed by `ElementId`, in
/// level-scan order. That order is also the update order, so outcomes that
/// depend on ordering (two buttons on one door in the same tick) are
/// deterministic. Elements are never removed from the vector; collected
/// stones are tombstoned via `Element::removed`.
///
/// Players are stored per affinity (`players[Affinity::index()]`); a level
/// that omits a player simply has `None` there.
///
/// ## Terrain
///
/// `grid` is immutable after load. Collision queries combine terrain
/// (`Block::is_solid`) with occupancy (closed doors).

use crate::config::SpeedConfig;
use crate::domain::entity::{Element, ElementId, Player};
use crate::domain::geometry::{Rect, RenderContext};
use crate::domain::grid::LevelGrid;
use crate::domain::tile::Affinity;

#[derive(Clone, Debug)]
pub struct WorldState {
    pub grid: LevelGrid,
    pub players: [Option<Player>; 2],
    pub elements: Vec<Element>,
    pub speed: SpeedConfig,
}

// ── Accessors ──

impl WorldState {
    pub fn player(&self, who: Affinity) -> Option<&Player> {
        self.players[who.index()].as_ref()
    }

    pub fn player_mut(&mut self, who: Affinity) -> Option<&mut Player> {
        self.players[who.index()].as_mut()
    }

    pub fn element(&self, id: ElementId) -> &Element {
        &self.elements[id.0]
    }

    pub fn element_mut(&mut self, id: ElementId) -> &mut Element {
        &mut self.elements[id.0]
    }

    /// Elements still in the world, scan order.
    pub fn live_elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| !e.removed)
    }

    pub fn render_context(&self) -> RenderContext {
        self.grid.render_context()
    }
}

// ── Collision queries ──

impl WorldState {
    /// Terrain-only: does the rect touch a solid or off-board cell?
    pub fn hits_terrain(&self, rect: &Rect) -> bool {
        rect.covered_cells().any(|(c, r)| self.grid.block_at(c, r).is_solid())
    }

    /// Is a tentative player rect blocked by terrain or a closed door?
    pub fn is_blocked(&self, rect: &Rect) -> bool {
        self.hits_terrain(rect)
            || self.live_elements().any(|e| e.blocks_movement() && e.rect().overlaps(rect))
    }

    /// Live elements overlapping the rect, scan order.
    pub fn elements_overlapping(&self, rect: &Rect) -> Vec<ElementId> {
        self.live_elements()
            .filter(|e| e.rect().overlaps(rect))
            .map(|e| e.id)
            .collect()
    }

    /// Does any of the given players currently overlap the rect?
    pub fn any_player_overlaps(&self, who: &[Affinity], rect: &Rect) -> bool {
        who.iter()
            .filter_map(|&a| self.player(a))
            .any(|p| p.rect.overlaps(rect))
    }
}
