/// GameSession: one play-through of one level.
///
/// Owns the parsed grid (so restart can rebuild entities without touching
/// the disk), the live world, the outcome and the clock bookkeeping for
/// the status line. Ticks after the outcome is decided are no-ops.

use tracing::{debug, info};

use crate::config::{GameConfig, SpeedConfig};
use crate::domain::entity::{Element, ElementKind};
use crate::domain::grid::LevelGrid;
use crate::domain::tile::Affinity;
use super::connect::build_world;
use super::event::GameEvent;
use super::step::{self, TickInput, Verdict};
use super::world::WorldState;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    Won,
    Lost,
    Abandoned,
}

pub struct GameSession {
    pub level_number: u32,
    grid: LevelGrid,
    speed: SpeedConfig,
    world: WorldState,
    outcome: Option<Outcome>,
    started_ms: u64,
    last_ms: u64,
    ticks: u64,
}

impl GameSession {
    pub fn new(grid: LevelGrid, level_number: u32, config: &GameConfig, now_ms: u64) -> Self {
        let speed = config.speed.clone();
        let world = build_world(grid.clone(), speed.clone());
        info!(
            level = level_number,
            width = grid.width,
            height = grid.height,
            elements = world.elements.len(),
            "level loaded"
        );
        GameSession {
            level_number,
            grid,
            speed,
            world,
            outcome: None,
            started_ms: now_ms,
            last_ms: now_ms,
            ticks: 0,
        }
    }

    /// Advance one tick. Returns the events of that tick.
    pub fn tick(&mut self, input: &TickInput, now_ms: u64) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.outcome.is_some() {
            return events;
        }
        self.last_ms = now_ms;
        self.ticks += 1;

        match step::step(&mut self.world, input, now_ms, &mut events) {
            Verdict::Continue => {}
            Verdict::Won => self.finish(Outcome::Won),
            Verdict::Lost => self.finish(Outcome::Lost),
        }
        for ev in &events {
            debug!(tick = self.ticks, ?ev);
        }
        events
    }

    /// Escape: leave without a win or a loss.
    pub fn abandon(&mut self) {
        if self.outcome.is_none() {
            self.finish(Outcome::Abandoned);
        }
    }

    /// Rebuild every entity from the stored grid and restart the clock.
    pub fn restart(&mut self, now_ms: u64) {
        info!(level = self.level_number, "level restarted");
        self.world = build_world(self.grid.clone(), self.speed.clone());
        self.outcome = None;
        self.started_ms = now_ms;
        self.last_ms = now_ms;
        self.ticks = 0;
    }

    fn finish(&mut self, outcome: Outcome) {
        info!(
            level = self.level_number,
            ?outcome,
            ticks = self.ticks,
            elapsed_ms = self.elapsed_ms(),
            "level ended"
        );
        self.outcome = Some(outcome);
    }

    // ── Queries ──

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Play time; frozen once the outcome is decided.
    pub fn elapsed_ms(&self) -> u64 {
        self.last_ms.saturating_sub(self.started_ms)
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn stones_total(&self, who: Affinity) -> usize {
        self.stones(who).count()
    }

    pub fn stones_collected(&self, who: Affinity) -> usize {
        self.stones(who).filter(|e| e.removed).count()
    }

    fn stones(&self, who: Affinity) -> impl Iterator<Item = &Element> {
        self.world.elements.iter()
            .filter(move |e| matches!(e.kind, ElementKind::Stone { affinity, .. } if affinity == who))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{MoveDir, PlayerInput};

    const HOLD: PlayerInput = PlayerInput { movement: None, interact: true };
    const NONE: PlayerInput = PlayerInput { movement: None, interact: false };

    fn session(rows: &[&str]) -> GameSession {
        let grid = LevelGrid::parse(&rows.join("\n"), 25).unwrap();
        GameSession::new(grid, 1, &GameConfig::default(), 1_000)
    }

    fn input(fire: PlayerInput, water: PlayerInput) -> TickInput {
        TickInput { players: [fire, water] }
    }

    /// Tick with a 100ms clock until neither player is walking.
    fn settle(s: &mut GameSession, now: &mut u64) {
        loop {
            *now += 100;
            s.tick(&input(NONE, NONE), *now);
            let w = s.world();
            if Affinity::ALL.iter().filter_map(|&a| w.player(a)).all(|p| !p.is_walking()) {
                break;
            }
        }
    }

    fn push(s: &mut GameSession, who: Affinity, dir: MoveDir, now: &mut u64) {
        *now += 100;
        let mover = PlayerInput { movement: Some(dir), interact: false };
        let inp = match who {
            Affinity::Fire => input(mover, NONE),
            Affinity::Water => input(NONE, mover),
        };
        s.tick(&inp, *now);
        settle(s, now);
    }

    #[test]
    fn stone_counts() {
        let mut s = session(&["f<<F", "w>.W"]);
        assert_eq!(s.stones_total(Affinity::Fire), 2);
        assert_eq!(s.stones_total(Affinity::Water), 1);
        assert_eq!(s.stones_collected(Affinity::Fire), 0);

        let mut now = 1_000;
        push(&mut s, Affinity::Fire, MoveDir::Right, &mut now);
        s.tick(&input(HOLD, NONE), now + 100);
        assert_eq!(s.stones_collected(Affinity::Fire), 1);
        assert_eq!(s.stones_collected(Affinity::Water), 0);
    }

    #[test]
    fn win_freezes_the_session() {
        let mut s = session(&["fFWw"]);
        let mut now = 1_000;
        push(&mut s, Affinity::Fire, MoveDir::Right, &mut now);
        push(&mut s, Affinity::Water, MoveDir::Left, &mut now);

        now += 100;
        let events = s.tick(&input(HOLD, HOLD), now);
        assert!(events.contains(&GameEvent::LevelWon));
        assert_eq!(s.outcome(), Some(Outcome::Won));
        let (ticks, elapsed) = (s.tick_count(), s.elapsed_ms());
        assert_eq!(elapsed, now - 1_000);

        // Further ticks change nothing
        assert!(s.tick(&input(HOLD, HOLD), now + 500).is_empty());
        assert_eq!(s.tick_count(), ticks);
        assert_eq!(s.elapsed_ms(), elapsed);
    }

    #[test]
    fn death_is_a_loss() {
        let mut s = session(&["fwR"]);
        let mut now = 1_000;
        push(&mut s, Affinity::Fire, MoveDir::Right, &mut now);
        assert_eq!(s.outcome(), None, "fire passes water's cell safely");
        push(&mut s, Affinity::Fire, MoveDir::Right, &mut now);
        assert_eq!(s.outcome(), Some(Outcome::Lost));
    }

    #[test]
    fn abandon_is_neither_win_nor_loss() {
        let mut s = session(&["fw"]);
        s.abandon();
        assert_eq!(s.outcome(), Some(Outcome::Abandoned));
        assert!(s.tick(&input(HOLD, HOLD), 2_000).is_empty());
        assert_eq!(s.tick_count(), 0);
    }

    #[test]
    fn restart_rebuilds_from_grid() {
        let mut s = session(&["f<F", "w.W"]);
        let mut now = 1_000;
        push(&mut s, Affinity::Fire, MoveDir::Right, &mut now);
        s.tick(&input(HOLD, NONE), now + 100);
        assert_eq!(s.stones_collected(Affinity::Fire), 1);
        s.abandon();

        s.restart(5_000);
        assert_eq!(s.outcome(), None);
        assert_eq!(s.tick_count(), 0);
        assert_eq!(s.elapsed_ms(), 0);
        assert_eq!(s.stones_collected(Affinity::Fire), 0);
        let fire = s.world().player(Affinity::Fire).unwrap();
        assert_eq!((fire.rect.x, fire.rect.y), (0, 0));
    }
}
