/// LevelGrid: parsed terrain + element placements for one level.
///
/// ## Parsing contract
///
///   1. Trailing whitespace is trimmed per line; trailing blank lines dropped.
///   2. `width  = min(longest row, max_size)`, `height = min(rows, max_size)`.
///      Rows and columns past the cap are dropped, not rejected.
///   3. Short rows are padded on the right with Empty.
///   4. Element/player glyphs are recorded as placements and the cell
///      underneath becomes Floor. Remaining characters are classified by
///      `Block::from_char` (unknown → Floor).
///   5. Each cell gets a 4-bit edge index (N=1, E=2, S=4, W=8): the bit is set
///      iff that neighbor is on-board and has the same block kind.
///
/// The level is centered on a `max_size × max_size` board; the offset is
/// `⌊(max_size − dim) / 2⌋` per axis (odd remainder goes right/bottom).

use std::collections::BTreeMap;

use tracing::warn;

use super::geometry::RenderContext;
use super::tile::{Block, Glyph};

/// Bits of an edge index.
pub const EDGE_NORTH: u8 = 1;
pub const EDGE_EAST: u8 = 2;
pub const EDGE_SOUTH: u8 = 4;
pub const EDGE_WEST: u8 = 8;

/// Neighbor-adjacency code selecting a terrain tile variant. Always < 16.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct EdgeIndex(u8);

impl EdgeIndex {
    /// Panics on a value ≥ 16: edge indices are built from four bits, so a
    /// larger value means the grid computation is broken.
    pub fn new(bits: u8) -> Self {
        assert!(bits < 16, "edge index out of range: {bits}");
        EdgeIndex(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn has(self, bit: u8) -> bool {
        self.0 & bit != 0
    }
}

/// Level-local cell coordinate (col, row).
pub type Cell = (i32, i32);

/// Glyph placements in row-major scan order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Placements {
    order: Vec<(Glyph, Cell)>,
    by_glyph: BTreeMap<Glyph, Vec<Cell>>,
}

impl Placements {
    fn push(&mut self, glyph: Glyph, cell: Cell) {
        if glyph.is_singleton() && self.by_glyph.contains_key(&glyph) {
            warn!(?glyph, ?cell, "duplicate singleton glyph ignored");
            return;
        }
        self.order.push((glyph, cell));
        self.by_glyph.entry(glyph).or_default().push(cell);
    }

    /// All kept placements, scan order.
    pub fn in_scan_order(&self) -> &[(Glyph, Cell)] {
        &self.order
    }

    pub fn cells_of(&self, glyph: Glyph) -> &[Cell] {
        self.by_glyph.get(&glyph).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First (and only meaningful) cell of a singleton glyph.
    pub fn singleton(&self, glyph: Glyph) -> Option<Cell> {
        self.cells_of(glyph).first().copied()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelGrid {
    pub width: usize,
    pub height: usize,
    pub max_size: usize,
    blocks: Vec<Vec<Block>>,
    edges: Vec<Vec<EdgeIndex>>,
    pub placements: Placements,
}

impl LevelGrid {
    /// Parse level text. Returns None when the text has no rows.
    pub fn parse(text: &str, max_size: usize) -> Option<LevelGrid> {
        let mut rows: Vec<Vec<char>> = text
            .lines()
            .map(|line| line.trim_end().chars().collect())
            .collect();
        while rows.last().map_or(false, |r| r.is_empty()) {
            rows.pop();
        }
        if rows.is_empty() {
            return None;
        }

        let height = rows.len().min(max_size);
        let width = rows.iter().map(Vec::len).max().unwrap_or(0).min(max_size);
        rows.truncate(height);

        let mut blocks = vec![vec![Block::Empty; width]; height];
        let mut placements = Placements::default();

        for (row, line) in rows.iter().enumerate() {
            for (col, &ch) in line.iter().take(width).enumerate() {
                blocks[row][col] = match Glyph::from_char(ch) {
                    Some(glyph) => {
                        placements.push(glyph, (col as i32, row as i32));
                        Block::Floor
                    }
                    None => Block::from_char(ch),
                };
            }
        }

        let edges = compute_edges(&blocks, width, height);
        Some(LevelGrid { width, height, max_size, blocks, edges, placements })
    }

    /// Block at a level-local cell. Off-board reads as Empty.
    pub fn block_at(&self, col: i32, row: i32) -> Block {
        if col < 0 || row < 0 {
            return Block::Empty;
        }
        self.blocks
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .copied()
            .unwrap_or(Block::Empty)
    }

    pub fn edge_at(&self, col: usize, row: usize) -> EdgeIndex {
        self.edges[row][col]
    }

    /// Centering offset on the `max_size` board.
    pub fn render_context(&self) -> RenderContext {
        RenderContext {
            col_offset: ((self.max_size - self.width) / 2) as i32,
            row_offset: ((self.max_size - self.height) / 2) as i32,
        }
    }
}

fn compute_edges(blocks: &[Vec<Block>], width: usize, height: usize) -> Vec<Vec<EdgeIndex>> {
    let same = |col: i32, row: i32, kind: Block| -> bool {
        col >= 0
            && row >= 0
            && (col as usize) < width
            && (row as usize) < height
            && blocks[row as usize][col as usize] == kind
    };

    let mut edges = vec![vec![EdgeIndex::default(); width]; height];
    for row in 0..height {
        for col in 0..width {
            let kind = blocks[row][col];
            let (c, r) = (col as i32, row as i32);
            let mut bits = 0;
            if same(c, r - 1, kind) { bits |= EDGE_NORTH; }
            if same(c + 1, r, kind) { bits |= EDGE_EAST; }
            if same(c, r + 1, kind) { bits |= EDGE_SOUTH; }
            if same(c - 1, r, kind) { bits |= EDGE_WEST; }
            edges[row][col] = EdgeIndex::new(bits);
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::{Affinity, Kind};

    const MAX: usize = 25;

    fn grid(rows: &[&str]) -> LevelGrid {
        LevelGrid::parse(&rows.join("\n"), MAX).expect("non-empty level")
    }

    // ── Edge index ──

    #[test]
    fn edge_index_three_by_three_walls() {
        let g = grid(&["###", "###", "###"]);
        assert_eq!(g.edge_at(1, 1).bits(), 15);
        assert_eq!(g.edge_at(0, 0).bits(), EDGE_EAST | EDGE_SOUTH); // 6
        assert_eq!(g.edge_at(2, 0).bits(), EDGE_SOUTH | EDGE_WEST); // 12
        assert_eq!(g.edge_at(0, 2).bits(), EDGE_NORTH | EDGE_EAST); // 3
        assert_eq!(g.edge_at(2, 2).bits(), EDGE_NORTH | EDGE_WEST); // 9
        assert_eq!(g.edge_at(1, 0).bits(), 14);
    }

    #[test]
    fn edge_index_requires_same_kind() {
        let g = grid(&[
            "#L#",
            "LLL",
            "#.#",
        ]);
        // Center lava: lava west, east and north; floor to the south
        assert_eq!(g.edge_at(1, 1).bits(), EDGE_NORTH | EDGE_EAST | EDGE_WEST);
        // Corner walls have no wall neighbors
        assert_eq!(g.edge_at(0, 0).bits(), 0);
        // Floor below center: nothing matches
        assert_eq!(g.edge_at(1, 2).bits(), 0);
    }

    #[test]
    fn edge_index_bits_match_neighbors_everywhere() {
        let g = grid(&[
            "#..LL",
            "#R.LA",
            "##A  ",
        ]);
        for row in 0..g.height as i32 {
            for col in 0..g.width as i32 {
                let kind = g.block_at(col, row);
                let on = |c: i32, r: i32| {
                    c >= 0 && r >= 0 && (c as usize) < g.width && (r as usize) < g.height
                        && g.block_at(c, r) == kind
                };
                let e = g.edge_at(col as usize, row as usize);
                assert_eq!(e.has(EDGE_NORTH), on(col, row - 1));
                assert_eq!(e.has(EDGE_EAST), on(col + 1, row));
                assert_eq!(e.has(EDGE_SOUTH), on(col, row + 1));
                assert_eq!(e.has(EDGE_WEST), on(col - 1, row));
            }
        }
    }

    #[test]
    #[should_panic]
    fn edge_index_out_of_range_is_invariant_violation() {
        let _ = EdgeIndex::new(16);
    }

    // ── Dimensions, padding, centering ──

    #[test]
    fn short_rows_padded_with_empty() {
        let g = grid(&["#####", "#.", "###"]);
        assert_eq!((g.width, g.height), (5, 3));
        assert_eq!(g.block_at(1, 1), Block::Floor);
        assert_eq!(g.block_at(2, 1), Block::Empty);
        assert_eq!(g.block_at(4, 2), Block::Empty);
    }

    #[test]
    fn trailing_whitespace_trimmed_but_not_leading() {
        let g = LevelGrid::parse("  #.#   \n  ###\t\n\n\n", MAX).unwrap();
        assert_eq!((g.width, g.height), (5, 2));
        assert_eq!(g.block_at(0, 0), Block::Empty);
        assert_eq!(g.block_at(2, 0), Block::Wall);
    }

    #[test]
    fn oversized_level_truncated() {
        let wide = "#".repeat(40);
        let rows: Vec<&str> = std::iter::repeat(wide.as_str()).take(30).collect();
        let g = grid(&rows);
        assert_eq!((g.width, g.height), (MAX, MAX));
        assert_eq!(g.render_context(), RenderContext { col_offset: 0, row_offset: 0 });
    }

    #[test]
    fn centering_offset_floors_odd_remainder() {
        // 25 - 4 = 21 → 10 left, 11 right; 25 - 3 = 22 → 11 top, 11 bottom
        let g = grid(&["####", "#..#", "####"]);
        let ctx = g.render_context();
        assert_eq!(ctx.col_offset, 10);
        assert_eq!(ctx.row_offset, 11);
        let right = MAX as i32 - (ctx.col_offset + g.width as i32);
        assert_eq!(right, 11);
    }

    #[test]
    fn empty_text_is_not_a_level() {
        assert!(LevelGrid::parse("", MAX).is_none());
        assert!(LevelGrid::parse("   \n\n", MAX).is_none());
    }

    // ── Placements ──

    #[test]
    fn glyphs_sit_on_floor() {
        let g = grid(&["#fw<>#", "#bBdD#", "#iOyY#", "#FW?.#"]);
        for (col, row) in [(1, 0), (2, 0), (3, 0), (1, 1), (4, 1), (1, 2), (4, 2), (1, 3), (3, 3)] {
            assert_eq!(g.block_at(col, row), Block::Floor, "cell {col},{row}");
        }
        let p = &g.placements;
        assert_eq!(p.singleton(Glyph::Player(Affinity::Fire)), Some((1, 0)));
        assert_eq!(p.singleton(Glyph::Player(Affinity::Water)), Some((2, 0)));
        assert_eq!(p.cells_of(Glyph::DoorButton(Kind::Two)), &[(2, 1)]);
        assert_eq!(p.cells_of(Glyph::Door(Kind::One)), &[(3, 1)]);
        assert_eq!(p.singleton(Glyph::OutputPortal(Kind::Two)), Some((2, 2)));
        assert_eq!(p.singleton(Glyph::Exit(Affinity::Water)), Some((2, 3)));
    }

    #[test]
    fn duplicate_singletons_keep_first() {
        let g = grid(&["F.F", "bb."]);
        assert_eq!(g.placements.cells_of(Glyph::Exit(Affinity::Fire)), &[(0, 0)]);
        assert_eq!(g.placements.cells_of(Glyph::DoorButton(Kind::One)).len(), 2);
        assert_eq!(g.placements.in_scan_order().len(), 3);
    }

    #[test]
    fn parsing_is_deterministic() {
        let text = "#####\n#f.L#\n#<RA#\n# W #\n#####";
        let a = LevelGrid::parse(text, MAX).unwrap();
        let b = LevelGrid::parse(text, MAX).unwrap();
        assert_eq!(a, b);
    }
}
