/// Entry point and game loop.
///
/// Usage: `firewater [LEVEL]`. Without a level number, play resumes at
/// the first level not yet cleared.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::event::{KeyboardEnhancementFlags, PushKeyboardEnhancementFlags, PopKeyboardEnhancementFlags};
use crossterm::{execute, terminal};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use domain::entity::PlayerInput;
use domain::tile::Affinity;
use sim::event::GameEvent;
use sim::level::{level_count, load_level};
use sim::save;
use sim::session::{GameSession, Outcome};
use sim::step::TickInput;
use ui::gamepad::GamepadState;
use ui::input::{InputState, CANCEL_KEYS, CONFIRM_KEYS, FIRE_KEYS, RESTART_KEYS, WATER_KEYS};
use ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = GameConfig::load();
    init_tracing(&config.log_file);

    let available = level_count(&config);
    let progress = save::load_progress();
    let start = match std::env::args().nth(1) {
        Some(arg) => match arg.parse::<u32>() {
            Ok(n) => n,
            Err(_) => {
                eprintln!("Usage: firewater [LEVEL]  (got {arg:?})");
                return;
            }
        },
        None => progress.next_level(available),
    };
    info!(start, available, levels_done = progress.levels_done, "starting");

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let mut kb = InputState::new();
    kb.honor_release = enable_key_release_events();

    let result = game_loop(start, available, &mut renderer, &mut kb, &config);

    if kb.honor_release {
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
    }
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        error!(error = %e, "game aborted");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Fire & Water!");
}

/// Log to a file: the terminal is in raw mode while the game runs.
fn init_tracing(log_file: &Path) {
    let file = match OpenOptions::new().create(true).append(true).open(log_file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Logging disabled ({}: {e})", log_file.display());
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .compact()
        .init();
}

/// Ask the terminal for key release events. Returns true when they will come.
fn enable_key_release_events() -> bool {
    if !matches!(terminal::supports_keyboard_enhancement(), Ok(true)) {
        return false;
    }
    let flags = KeyboardEnhancementFlags::REPORT_EVENT_TYPES;
    execute!(std::io::stdout(), PushKeyboardEnhancementFlags(flags)).is_ok()
}

fn game_loop(
    start: u32,
    available: u32,
    renderer: &mut Renderer,
    kb: &mut InputState,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    if gp.connected {
        info!("gamepad detected");
    }

    let epoch = Instant::now();
    let now_ms = || epoch.elapsed().as_millis() as u64;
    let tick_rate = Duration::from_millis(config.speed.tick_rate_ms);

    let mut level = start;
    let mut session = GameSession::new(load_level(level, config)?, level, config, now_ms());
    let mut last_tick = Instant::now();

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            session.abandon();
            break;
        }

        let cancel = kb.any_pressed(CANCEL_KEYS) || gp.cancel_pressed();
        let restart = kb.any_pressed(RESTART_KEYS) || gp.restart_pressed();
        let confirm = kb.any_pressed(CONFIRM_KEYS) || gp.confirm_pressed();

        match session.outcome() {
            None if cancel => {
                session.abandon();
                break;
            }
            None if restart => session.restart(now_ms()),
            None => {}
            Some(_) if cancel => break,
            Some(Outcome::Won) if confirm => {
                if level >= available {
                    info!(level, "final level cleared");
                    break;
                }
                level += 1;
                session = GameSession::new(load_level(level, config)?, level, config, now_ms());
            }
            Some(Outcome::Won | Outcome::Lost) if restart || confirm => session.restart(now_ms()),
            Some(Outcome::Abandoned) => break,
            Some(_) => {}
        }

        if last_tick.elapsed() >= tick_rate {
            let input = TickInput {
                players: Affinity::ALL.map(|who| sample_player(kb, &gp, who)),
            };
            let events = session.tick(&input, now_ms());
            if events.contains(&GameEvent::LevelWon) {
                match save::record_level_won(level) {
                    Ok(p) => info!(levels_done = p.levels_done, "progress updated"),
                    Err(e) => warn!(error = %e, "could not save progress"),
                }
            }
            renderer.render(&session)?;
            last_tick = Instant::now();
        }

        std::thread::sleep(FRAME_SLEEP);
    }

    info!(level, ticks = session.tick_count(), elapsed_ms = session.elapsed_ms(), "session closed");
    Ok(())
}

/// Keyboard and gamepad combined: keyboard direction first.
fn sample_player(kb: &InputState, gp: &GamepadState, who: Affinity) -> PlayerInput {
    let keys = match who {
        Affinity::Fire => &FIRE_KEYS,
        Affinity::Water => &WATER_KEYS,
    };
    let k = kb.player_input(keys);
    let g = gp.player_input(who);
    PlayerInput {
        movement: k.movement.or(g.movement),
        interact: k.interact || g.interact,
    }
}
