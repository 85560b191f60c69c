/// Pixel-space geometry shared by players and elements.
///
/// Positions are level-local: cell (col, row) covers the square
/// `[col * CELL_SIZE, (col + 1) * CELL_SIZE)` on each axis. The centering
/// offset of a level is never baked into entity positions; it lives in
/// `RenderContext` and is applied only when a presenter asks for screen
/// coordinates.

/// Side of one grid cell, in sub-cell units ("pixels").
pub const CELL_SIZE: i32 = 32;

/// Axis-aligned rectangle in level-local pixels.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    /// The cell-sized rect covering (col, row).
    pub fn cell(col: i32, row: i32) -> Self {
        Rect { x: col * CELL_SIZE, y: row * CELL_SIZE, w: CELL_SIZE, h: CELL_SIZE }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Rect { x: self.x + dx, y: self.y + dy, ..self }
    }

    /// Strict overlap: rects that only share an edge do not collide.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }

    /// Every cell this rect touches, row-major.
    pub fn covered_cells(&self) -> impl Iterator<Item = (i32, i32)> {
        let c0 = self.x.div_euclid(CELL_SIZE);
        let c1 = (self.x + self.w - 1).div_euclid(CELL_SIZE);
        let r0 = self.y.div_euclid(CELL_SIZE);
        let r1 = (self.y + self.h - 1).div_euclid(CELL_SIZE);
        (r0..=r1).flat_map(move |r| (c0..=c1).map(move |c| (c, r)))
    }

    /// Cell containing the rect's center.
    pub fn center_cell(&self) -> (i32, i32) {
        (
            (self.x + self.w / 2).div_euclid(CELL_SIZE),
            (self.y + self.h / 2).div_euclid(CELL_SIZE),
        )
    }
}

/// Coordinate transform from level-local space to the fixed-size board.
///
/// Replaces a process-wide render offset: each loaded level carries its own
/// context, so two levels (or two sessions in tests) never share state.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct RenderContext {
    pub col_offset: i32,
    pub row_offset: i32,
}

impl RenderContext {
    /// Board cell for a level-local cell.
    pub fn board_cell(&self, col: i32, row: i32) -> (i32, i32) {
        (col + self.col_offset, row + self.row_offset)
    }
}
