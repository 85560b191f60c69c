/// Level loader.
///
/// ## Sources (priority order):
///   1. `levels_dir/level{N}.txt`
///   2. Built-in embedded levels
///
/// Levels are numbered from 1. A number with neither a file nor an
/// embedded level is an error, as is a file with no rows.
///
/// ## Tile legend:
///   ' ' = Void (impassable)     '.' = Floor
///   '#' = Wall                  'L' = Lava (kills Water)
///   'R' = River (kills Fire)    'A' = Acid (kills both)
///   'f' / 'w' = Fire / Water start
///   '<' / '>' = Ruby / Aquamarine
///   'F' / 'W' = Fire / Water exit
///   'b' 'B' = Door button       'd' 'D' = Door
///   'i' 'I' = Input portal      'o' 'O' = Output portal
///   'y' 'Y' = Portal switch
/// Lowercase/uppercase pairs are the two kinds; kinds never interact.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::GameConfig;
use crate::domain::grid::LevelGrid;
use crate::error::LevelError;

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Parse level `number` into a grid.
pub fn load_level(number: u32, config: &GameConfig) -> Result<LevelGrid, LevelError> {
    let text = level_text(number, &config.levels_dir)?;
    LevelGrid::parse(&text, config.level.max_size).ok_or(LevelError::Empty { number })
}

/// Number of consecutive levels available from 1.
pub fn level_count(config: &GameConfig) -> u32 {
    (1..).take_while(|&n| level_exists(n, &config.levels_dir)).count() as u32
}

// ══════════════════════════════════════════════════════════════
// Internal: source lookup
// ══════════════════════════════════════════════════════════════

fn level_path(dir: &Path, number: u32) -> PathBuf {
    dir.join(format!("level{}.txt", number))
}

fn level_exists(number: u32, dir: &Path) -> bool {
    level_path(dir, number).exists() || embedded_level(number).is_some()
}

fn level_text(number: u32, dir: &Path) -> Result<String, LevelError> {
    let path = level_path(dir, number);
    if path.exists() {
        let text = std::fs::read_to_string(&path)
            .map_err(|source| LevelError::Read { path: path.clone(), source })?;
        info!(level = number, path = %path.display(), "level read from file");
        return Ok(text);
    }

    match embedded_level(number) {
        Some(rows) => {
            debug!(level = number, "using embedded level");
            Ok(rows.join("\n"))
        }
        None => Err(LevelError::NotFound {
            number,
            available: (1..).take_while(|&n| level_exists(n, dir)).count() as u32,
        }),
    }
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

fn embedded_level(number: u32) -> Option<&'static [&'static str]> {
    let idx = usize::try_from(number).ok()?.checked_sub(1)?;
    EMBEDDED.get(idx).copied()
}

const EMBEDDED: &[&[&str]] = &[
    // 1 - Two paths
    &[
        "##########",
        "#f......F#",
        "#..LLRR..#",
        "#w......W#",
        "##########",
    ],
    // 2 - Gems
    &[
        "############",
        "#f.<..L..<F#",
        "#..........#",
        "#w.>..R..>W#",
        "############",
    ],
    // 3 - Hold the door
    &[
        "###########",
        "#f.b.d.bF.#",
        "#w.b.d.bW.#",
        "###########",
    ],
    // 4 - Reverse the flow
    &[
        "#############",
        "#f.o.#.i..F.#",
        "#w.y.#....W.#",
        "#############",
    ],
    // 5 - Acid bath
    &[
        "###############",
        "#f..<.#.A...F.#",
        "#.....d.b.....#",
        "#w.b.>#.A...W.#",
        "###############",
    ],
];
