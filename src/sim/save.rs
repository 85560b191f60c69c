/// Persistent progress: how many levels have been cleared.
///
/// ## File format:
///   Key-value lines, currently just `levels_done=N`.
///   Unknown keys are ignored, a missing or unreadable file means 0.
///
/// Stored as `progress.dat` in the save directory.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::SaveError;

const PROGRESS_FILE: &str = "progress.dat";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub levels_done: u32,
}

impl Progress {
    /// Level to start on when none is given: the first uncleared one,
    /// clamped to the levels that exist.
    pub fn next_level(&self, available: u32) -> u32 {
        (self.levels_done + 1).min(available.max(1))
    }

    /// Winning level N only advances progress when N is beyond it.
    /// Returns true if the value changed.
    pub fn apply_win(&mut self, level: u32) -> bool {
        if level > self.levels_done {
            self.levels_done += 1;
            true
        } else {
            false
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Paths
// ══════════════════════════════════════════════════════════════

fn save_dir() -> PathBuf {
    // 1. Try exe directory (works for local/portable installs)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            // System installs like /usr/games/ are not writable
            let test_path = parent.join(".write_test_firewater");
            if std::fs::write(&test_path, "").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return parent.to_path_buf();
            }
        }
    }

    // 2. XDG data home
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/firewater");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    // 3. Fallback to CWD
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

pub fn progress_path() -> PathBuf {
    save_dir().join(PROGRESS_FILE)
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

pub fn load_progress() -> Progress {
    let candidates = [progress_path(), PathBuf::from(PROGRESS_FILE)];
    candidates.iter()
        .find_map(|p| std::fs::read_to_string(p).ok())
        .map(|content| parse_progress(&content))
        .unwrap_or_default()
}

/// Record a won level and rewrite the file if progress moved.
pub fn record_level_won(level: u32) -> Result<Progress, SaveError> {
    record_level_won_at(&progress_path(), level)
}

fn record_level_won_at(path: &Path, level: u32) -> Result<Progress, SaveError> {
    let mut progress = std::fs::read_to_string(path)
        .map(|c| parse_progress(&c))
        .unwrap_or_default();
    if progress.apply_win(level) {
        write_progress(path, &progress)?;
        info!(levels_done = progress.levels_done, path = %path.display(), "progress saved");
    } else {
        debug!(level, levels_done = progress.levels_done, "replayed level; progress unchanged");
    }
    Ok(progress)
}

fn write_progress(path: &Path, progress: &Progress) -> Result<(), SaveError> {
    std::fs::write(path, serialize(progress)).map_err(|source| SaveError::Write {
        path: path.to_path_buf(),
        source,
    })
}

// ══════════════════════════════════════════════════════════════
// Serialization
// ══════════════════════════════════════════════════════════════

fn serialize(progress: &Progress) -> String {
    format!("levels_done={}\n", progress.levels_done)
}

fn parse_progress(content: &str) -> Progress {
    let mut progress = Progress::default();
    for line in content.lines() {
        if let Some(val) = line.trim().strip_prefix("levels_done=") {
            progress.levels_done = val.trim().parse().unwrap_or(0);
        }
    }
    progress
}
