/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The board is a fixed `max_size × max_size` square; the level sits in it
/// at the offset given by its `RenderContext`.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{Element, ElementKind, Facing, Player};
use crate::domain::geometry::RenderContext;
use crate::domain::grid::{EdgeIndex, EDGE_EAST};
use crate::domain::tile::{Affinity, Block, Kind};
use crate::sim::session::{GameSession, Outcome};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, also used
    /// for `Clear` so row gaps match cell color on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Renderer ──

/// Each board cell is two terminal columns.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const FLOOR_BG: Color = Color::Rgb { r: 40, g: 38, b: 48 };
const WALL_FG: Color = Color::Rgb { r: 170, g: 170, b: 185 };
const FIRE_FG: Color = Color::Rgb { r: 255, g: 110, b: 40 };
const WATER_FG: Color = Color::Rgb { r: 60, g: 160, b: 255 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_level: Option<u32>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_level: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, session: &GameSession) -> io::Result<()> {
        // Detect terminal resize or level change
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        let resized = tw as usize != self.term_w || th as usize != self.term_h;
        if resized || self.last_level != Some(session.level_number) {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_level = Some(session.level_number);
        }

        self.front.clear();
        self.compose_game(session);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the terminal default
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, session: &GameSession) {
        let world = session.world();
        let ctx = world.render_context();
        let board = world.grid.max_size;

        // ── HUD row ──
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &status_text(session), Color::White, HUD_BG);

        // ── Terrain ──
        for row in 0..world.grid.height {
            for col in 0..world.grid.width {
                let block = world.grid.block_at(col as i32, row as i32);
                let edges = world.grid.edge_at(col, row);
                let [c0, c1] = block_glyph(block, edges);
                self.put_board_cell(&ctx, col as i32, row as i32, [c0, c1]);
            }
        }

        // ── Elements (scan order; later ones draw on top) ──
        for el in world.live_elements() {
            let (c, r) = el.cell;
            self.put_board_cell(&ctx, c, r, element_glyph(el));
        }

        // ── Players ──
        for who in Affinity::ALL {
            if let Some(p) = world.player(who) {
                let (c, r) = p.rect.center_cell();
                self.put_board_cell(&ctx, c, r, player_glyph(p));
            }
        }

        // ── Message bar ──
        let msg_row = MAP_ROW + board + 1;
        if let Some(msg) = session.outcome().and_then(outcome_message) {
            let bg = Color::Rgb { r: 200, g: 180, b: 50 };
            self.front.fill_row(msg_row, bg);
            self.front.put_str(0, msg_row, msg, Color::Black, bg);
        }

        // ── Help bar ──
        let help = " Fire: WASD + E/Space   Water: Arrows + Enter/0   R: Restart   Esc: Quit";
        self.front.put_str(0, msg_row + 2, help, Color::DarkGrey, Color::Reset);
    }

    /// Place a two-column glyph at a level cell, shifted into the board.
    fn put_board_cell(&mut self, ctx: &RenderContext, col: i32, row: i32, glyph: [Cell; 2]) {
        let (bc, br) = ctx.board_cell(col, row);
        if bc < 0 || br < 0 { return; }
        let x = bc as usize * CELL_W;
        let y = MAP_ROW + br as usize;
        self.front.set(x, y, glyph[0]);
        self.front.set(x + 1, y, glyph[1]);
    }
}

// ── Glyph selection ──

fn affinity_color(who: Affinity) -> Color {
    match who {
        Affinity::Fire => FIRE_FG,
        Affinity::Water => WATER_FG,
    }
}

fn kind_color(kind: Kind) -> Color {
    match kind {
        Kind::One => Color::Rgb { r: 230, g: 210, b: 60 },
        Kind::Two => Color::Rgb { r: 200, g: 90, b: 220 },
    }
}

/// Box-drawing character for a wall, indexed by edge bits (N=1 E=2 S=4 W=8).
const WALL_CHARS: [char; 16] = [
    '■', '│', '─', '└', '│', '│', '┌', '├',
    '─', '┘', '─', '┴', '┐', '┤', '┬', '┼',
];

fn wall_char(edges: EdgeIndex) -> char {
    WALL_CHARS[edges.bits() as usize]
}

fn block_glyph(block: Block, edges: EdgeIndex) -> [Cell; 2] {
    let both = |ch: char, fg: Color, bg: Color| [Cell::new(ch, fg, bg), Cell::new(ch, fg, bg)];
    match block {
        Block::Empty => [Cell::BLANK; 2],
        Block::Floor => both(' ', Color::Reset, FLOOR_BG),
        Block::Wall => {
            // Right half continues the line when the east neighbor is a wall too
            let right = if edges.has(EDGE_EAST) { '─' } else { ' ' };
            [Cell::new(wall_char(edges), WALL_FG, Color::Reset), Cell::new(right, WALL_FG, Color::Reset)]
        }
        Block::Lava | Block::River | Block::Acid => {
            let (fg, bg) = match block {
                Block::Lava => (Color::Rgb { r: 255, g: 170, b: 60 }, Color::Rgb { r: 150, g: 30, b: 10 }),
                Block::River => (Color::Rgb { r: 150, g: 210, b: 255 }, Color::Rgb { r: 20, g: 60, b: 150 }),
                _ => (Color::Rgb { r: 200, g: 255, b: 120 }, Color::Rgb { r: 40, g: 110, b: 20 }),
            };
            both('≈', fg, bg)
        }
    }
}

fn element_glyph(el: &Element) -> [Cell; 2] {
    let pair = |a: char, b: char, fg: Color| [Cell::new(a, fg, FLOOR_BG), Cell::new(b, fg, FLOOR_BG)];
    match el.kind {
        ElementKind::Stone { affinity, .. } => pair('◆', ' ', affinity_color(affinity)),
        ElementKind::Exit { affinity, .. } => {
            let fg = if el.active { affinity_color(affinity) } else { Color::DarkGrey };
            pair('[', ']', fg)
        }
        ElementKind::DoorButton { kind, .. } => {
            pair(if el.active { '▪' } else { '▫' }, ' ', kind_color(kind))
        }
        ElementKind::Door { kind, .. } => {
            if el.active { pair('█', '█', kind_color(kind)) } else { pair('░', '░', kind_color(kind)) }
        }
        ElementKind::PortalSwitch { kind, .. } => {
            pair(if el.active { '\\' } else { '/' }, ' ', kind_color(kind))
        }
        ElementKind::Portal { kind, .. } => {
            pair(if el.is_input_portal() { '◎' } else { '○' }, ' ', kind_color(kind))
        }
    }
}

fn player_glyph(p: &Player) -> [Cell; 2] {
    let fg = affinity_color(p.affinity);
    let ch = if !p.alive {
        '✕'
    } else {
        match p.facing {
            Facing::Up => '▲',
            Facing::Down => '▼',
            Facing::Left => '◀',
            Facing::Right => '▶',
        }
    };
    [Cell::new(ch, fg, FLOOR_BG), Cell::new(' ', fg, FLOOR_BG)]
}

// ── Status text ──

fn format_elapsed(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn status_text(session: &GameSession) -> String {
    let stones = |who: Affinity| {
        format!("{} {}/{}", who.name(), session.stones_collected(who), session.stones_total(who))
    };
    format!(
        " Level {:<3} Time {}   {}   {} ",
        session.level_number,
        format_elapsed(session.elapsed_ms()),
        stones(Affinity::Fire),
        stones(Affinity::Water),
    )
}

fn outcome_message(outcome: Outcome) -> Option<&'static str> {
    match outcome {
        Outcome::Won => Some(" Level complete!  Enter: next level   R: play again "),
        Outcome::Lost => Some(" A player was lost.  R / Enter: try again   Esc: quit "),
        Outcome::Abandoned => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_chars_follow_edges() {
        // 3×3 wall block: corners and center
        assert_eq!(wall_char(EdgeIndex::new(6)), '┌');
        assert_eq!(wall_char(EdgeIndex::new(12)), '┐');
        assert_eq!(wall_char(EdgeIndex::new(3)), '└');
        assert_eq!(wall_char(EdgeIndex::new(9)), '┘');
        assert_eq!(wall_char(EdgeIndex::new(15)), '┼');
        assert_eq!(wall_char(EdgeIndex::new(0)), '■');
        assert_eq!(wall_char(EdgeIndex::new(5)), '│');
        assert_eq!(wall_char(EdgeIndex::new(10)), '─');
        assert_eq!(wall_char(EdgeIndex::new(14)), '┬');
    }

    #[test]
    fn elapsed_is_minutes_and_seconds() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(59_999), "00:59");
        assert_eq!(format_elapsed(83_000), "01:23");
    }

    #[test]
    fn abandon_shows_no_message() {
        assert!(outcome_message(Outcome::Abandoned).is_none());
        assert!(outcome_message(Outcome::Won).is_some());
    }
}
