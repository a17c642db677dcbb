/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use config::GameConfig;
use sim::event::GameEvent;
use sim::room;
use sim::step;
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::{Action, InputState};
use ui::renderer::{Renderer, INTRO_TICKS};
use ui::sound::{effects_for, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);
/// Frames the death pose holds before the game-over screen.
const DYING_TICKS: u32 = 75;

fn main() {
    let config = GameConfig::load();
    init_logging(&config);

    let seed = config.seed.unwrap_or_else(clock_seed);
    log::info!("blastmaze starting, seed {seed}");

    let mut world = WorldState::new(config.rules.clone(), seed);
    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        log::error!("game loop aborted: {e}");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Blast Maze!");
    println!("Final Score: {}", world.score);
}

/// stderr would tear the alternate screen, so warnings and up only unless
/// RUST_LOG says otherwise; `general.log_file` redirects everything.
fn init_logging(config: &GameConfig) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(path) = &config.log_file {
        match File::create(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("cannot open log file {}: {e}", path.display()),
        }
    }
    // A second init (tests, embedding) is harmless.
    let _ = builder.try_init();
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5eed)
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.tick_rate_ms);

    // Bomb presses land between ticks; hold them for the next step.
    let mut pending_bomb = false;
    let mut last_countdown: Option<u32> = None;

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, sound, &kb, &gp) {
            break;
        }

        if world.phase == Phase::Playing && !world.paused {
            let frame = kb.frame_input(&gp);
            pending_bomb |= frame.place_bomb;
        }

        let since = last_tick.elapsed();
        if since >= tick_rate {
            last_tick = Instant::now();
            world.anim_tick = world.anim_tick.wrapping_add(1);

            if world.paused {
                continue_message(world);
            } else {
                match world.phase {
                    Phase::Playing => {
                        let mut frame = kb.frame_input(&gp);
                        frame.place_bomb = std::mem::take(&mut pending_bomb);
                        let dt_ms = since.as_secs_f32() * 1000.0;
                        let events = step::step(world, frame, dt_ms);
                        play_effects(sound, &events);
                    }
                    Phase::RoomIntro => {
                        let remaining = INTRO_TICKS.saturating_sub(world.anim_tick) / 30 + 1;
                        if last_countdown != Some(remaining) {
                            if let Some(sfx) = sound {
                                sfx.play_countdown(remaining);
                            }
                            last_countdown = Some(remaining);
                        }
                        if world.anim_tick >= INTRO_TICKS {
                            world.phase = Phase::Playing;
                            last_countdown = None;
                            // Keys held through the banner do not fire.
                            pending_bomb = false;
                        }
                        continue_message(world);
                    }
                    Phase::Dying => {
                        if world.anim_tick >= DYING_TICKS {
                            world.phase = Phase::GameOver;
                            world.anim_tick = 0;
                        }
                    }
                    _ => continue_message(world),
                }
            }
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Outside `Playing` nothing else counts the message down.
fn continue_message(world: &mut WorldState) {
    if world.phase == Phase::Playing && !world.paused {
        return;
    }
    if world.message_timer > 0 {
        world.message_timer -= 1;
        if world.message_timer == 0 {
            world.message.clear();
        }
    }
}

fn play_effects(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let Some(sfx) = sound else { return };
    for effect in effects_for(events) {
        sfx.play(effect);
    }
}

/// Back to the title screen with a fresh world; the RNG stream carries on
/// so the next stage lays out differently.
fn return_to_title(world: &mut WorldState) {
    let seed = world.seed.wrapping_add(world.tick);
    let rules = world.rules.clone();
    *world = WorldState::new(rules, seed);
    world.phase = Phase::Title;
}

/// Phase transitions driven by non-gameplay keys. Returns true to quit.
fn handle_meta(
    world: &mut WorldState,
    sound: Option<&SoundEngine>,
    kb: &InputState,
    gp: &GamepadState,
) -> bool {
    let confirm = kb.pressed(Action::Confirm) || gp.confirm_pressed();
    let back = kb.pressed(Action::Back) || gp.cancel_pressed();
    let restart = kb.pressed(Action::Restart) || gp.restart_pressed();

    match world.phase {
        Phase::Title => {
            if confirm {
                let events = room::start_stage(world);
                play_effects(sound, &events);
            } else if back || kb.pressed(Action::Quit) {
                return true;
            }
        }
        Phase::RoomIntro | Phase::Playing => {
            if kb.pressed(Action::Pause) {
                world.paused = !world.paused;
                if world.paused {
                    world.set_message("PAUSED  [F1] Resume", 0);
                } else {
                    world.message.clear();
                    world.message_timer = 0;
                }
            } else if back {
                return_to_title(world);
            } else if restart {
                world.paused = false;
                let events = room::restart_room(world);
                play_effects(sound, &events);
                world.set_message("Room restarted", 60);
            }
        }
        Phase::Dying => {}
        Phase::GameOver => {
            if confirm || restart {
                let events = room::restart_room(world);
                play_effects(sound, &events);
            } else if back {
                return_to_title(world);
            }
        }
        Phase::StageComplete => {
            if confirm {
                let events = room::start_stage(world);
                play_effects(sound, &events);
            } else if back {
                return_to_title(world);
            }
        }
    }
    false
}
