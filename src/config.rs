/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
/// Every gameplay number lives here as plain data; nothing in this file
/// has behaviour beyond loading and sanity-fixing values.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub tick_rate_ms: u64,
    pub rules: RulesConfig,
    pub gamepad: GamepadConfig,
    /// Fixed RNG seed; `None` seeds from the clock.
    pub seed: Option<u64>,
    /// Log destination; `None` logs to stderr.
    pub log_file: Option<PathBuf>,
}

/// Simulation rules. Timers are in 60 Hz frames, distances in cells
/// unless noted, speeds in world units per frame at a 64-unit tile.
#[derive(Clone, Debug)]
pub struct RulesConfig {
    pub cols: i32,
    pub rows: i32,
    pub tile_size: f32,
    pub max_time_scale: f32,
    // bombs
    pub fuse_frames: f32,
    pub chain_fuse_frames: f32,
    pub blast_radius: i32,
    pub stun_radius: f32,
    pub stun_frames: f32,
    pub recharge_frames: f32,
    pub max_charges: u32,
    // enemies
    pub enemies_per_room: usize,
    pub sight_range: i32,
    pub enemy_speed: f32,
    pub chase_multiplier: f32,
    pub contact_radius: f32,   // world units
    pub spawn_min_player: f32,
    pub spawn_min_enemy: f32,
    pub spawn_attempts: u32,
    // player
    pub player_speed: f32,
    pub goal_radius: f32,      // world units
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub bomb: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub restart: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    grid: TomlGrid,
    #[serde(default)]
    bombs: TomlBombs,
    #[serde(default)]
    enemies: TomlEnemies,
    #[serde(default)]
    player: TomlPlayer,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_max_time_scale")]
    max_time_scale: f32,
}

#[derive(Deserialize, Debug)]
struct TomlGrid {
    #[serde(default = "default_cols")]
    cols: i32,
    #[serde(default = "default_rows")]
    rows: i32,
    #[serde(default = "default_tile_size")]
    tile_size: f32,
}

#[derive(Deserialize, Debug)]
struct TomlBombs {
    #[serde(default = "default_fuse")]
    fuse_frames: f32,
    #[serde(default = "default_chain_fuse")]
    chain_fuse_frames: f32,
    #[serde(default = "default_blast_radius")]
    blast_radius: i32,
    #[serde(default = "default_stun_radius")]
    stun_radius: f32,
    #[serde(default = "default_stun_frames")]
    stun_frames: f32,
    #[serde(default = "default_recharge")]
    recharge_frames: f32,
    #[serde(default = "default_max_charges")]
    max_charges: u32,
}

#[derive(Deserialize, Debug)]
struct TomlEnemies {
    #[serde(default = "default_per_room")]
    per_room: usize,
    #[serde(default = "default_sight_range")]
    sight_range: i32,
    #[serde(default = "default_enemy_speed")]
    speed: f32,
    #[serde(default = "default_chase_multiplier")]
    chase_multiplier: f32,
    #[serde(default = "default_contact_radius")]
    contact_radius: f32,
    #[serde(default = "default_spawn_min_player")]
    spawn_min_player: f32,
    #[serde(default = "default_spawn_min_enemy")]
    spawn_min_enemy: f32,
    #[serde(default = "default_spawn_attempts")]
    spawn_attempts: u32,
}

#[derive(Deserialize, Debug)]
struct TomlPlayer {
    #[serde(default = "default_player_speed")]
    speed: f32,
    #[serde(default = "default_goal_radius")]
    goal_radius: f32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_bomb")]
    bomb: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlGeneral {
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    log_file: Option<String>,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }        // ~60 Hz
fn default_max_time_scale() -> f32 { 4.0 }
fn default_cols() -> i32 { 17 }
fn default_rows() -> i32 { 11 }
fn default_tile_size() -> f32 { 64.0 }
fn default_fuse() -> f32 { 120.0 }          // 2s
fn default_chain_fuse() -> f32 { 2.0 }
fn default_blast_radius() -> i32 { 1 }
fn default_stun_radius() -> f32 { 3.0 }
fn default_stun_frames() -> f32 { 120.0 }
fn default_recharge() -> f32 { 180.0 }      // 3s
fn default_max_charges() -> u32 { 2 }
fn default_per_room() -> usize { 3 }
fn default_sight_range() -> i32 { 3 }
fn default_enemy_speed() -> f32 { 1.5 }
fn default_chase_multiplier() -> f32 { 1.3 }
fn default_contact_radius() -> f32 { 35.0 }
fn default_spawn_min_player() -> f32 { 5.0 }
fn default_spawn_min_enemy() -> f32 { 4.0 }
fn default_spawn_attempts() -> u32 { 1000 }
fn default_player_speed() -> f32 { 4.0 }
fn default_goal_radius() -> f32 { 64.0 }

fn default_pad_bomb() -> Vec<String> { vec!["A".into(), "B".into(), "X".into(), "Y".into()] }
fn default_confirm() -> Vec<String> { vec!["Start".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_restart() -> Vec<String> { vec!["Start".into()] }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate_ms: default_tick_rate(),
            max_time_scale: default_max_time_scale(),
        }
    }
}

impl Default for TomlGrid {
    fn default() -> Self {
        TomlGrid { cols: default_cols(), rows: default_rows(), tile_size: default_tile_size() }
    }
}

impl Default for TomlBombs {
    fn default() -> Self {
        TomlBombs {
            fuse_frames: default_fuse(),
            chain_fuse_frames: default_chain_fuse(),
            blast_radius: default_blast_radius(),
            stun_radius: default_stun_radius(),
            stun_frames: default_stun_frames(),
            recharge_frames: default_recharge(),
            max_charges: default_max_charges(),
        }
    }
}

impl Default for TomlEnemies {
    fn default() -> Self {
        TomlEnemies {
            per_room: default_per_room(),
            sight_range: default_sight_range(),
            speed: default_enemy_speed(),
            chase_multiplier: default_chase_multiplier(),
            contact_radius: default_contact_radius(),
            spawn_min_player: default_spawn_min_player(),
            spawn_min_enemy: default_spawn_min_enemy(),
            spawn_attempts: default_spawn_attempts(),
        }
    }
}

impl Default for TomlPlayer {
    fn default() -> Self {
        TomlPlayer { speed: default_player_speed(), goal_radius: default_goal_radius() }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            bomb: default_pad_bomb(),
            confirm: default_confirm(),
            cancel: default_cancel(),
            restart: default_restart(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        TomlConfig::default().rules()
    }
}

// ── Loading ──

impl TomlConfig {
    fn rules(&self) -> RulesConfig {
        RulesConfig {
            cols: sanitize_span("cols", self.grid.cols),
            rows: sanitize_span("rows", self.grid.rows),
            tile_size: if self.grid.tile_size > 0.0 {
                self.grid.tile_size
            } else {
                log::warn!("grid.tile_size must be positive, using {}", default_tile_size());
                default_tile_size()
            },
            max_time_scale: self.timing.max_time_scale.max(1.0),
            fuse_frames: self.bombs.fuse_frames,
            chain_fuse_frames: self.bombs.chain_fuse_frames,
            blast_radius: self.bombs.blast_radius.max(0),
            stun_radius: self.bombs.stun_radius,
            stun_frames: self.bombs.stun_frames,
            recharge_frames: self.bombs.recharge_frames,
            max_charges: self.bombs.max_charges,
            enemies_per_room: self.enemies.per_room,
            sight_range: self.enemies.sight_range,
            enemy_speed: self.enemies.speed,
            chase_multiplier: self.enemies.chase_multiplier,
            contact_radius: self.enemies.contact_radius,
            spawn_min_player: self.enemies.spawn_min_player,
            spawn_min_enemy: self.enemies.spawn_min_enemy,
            spawn_attempts: self.enemies.spawn_attempts,
            player_speed: self.player.speed,
            goal_radius: self.player.goal_radius,
        }
    }
}

/// Grid spans must be odd (walls on even lines) and leave room for a maze.
fn sanitize_span(name: &str, n: i32) -> i32 {
    const MIN_SPAN: i32 = 7;
    let fixed = if n < MIN_SPAN { MIN_SPAN } else if n % 2 == 0 { n + 1 } else { n };
    if fixed != n {
        log::warn!("grid.{name} = {n} is not a valid span, using {fixed}");
    }
    fixed
}

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let toml_cfg = load_toml(&candidate_dirs());
        GameConfig::from_toml(toml_cfg)
    }

    fn from_toml(toml_cfg: TomlConfig) -> Self {
        GameConfig {
            tick_rate_ms: toml_cfg.timing.tick_rate_ms.max(1),
            rules: toml_cfg.rules(),
            seed: toml_cfg.general.seed,
            log_file: toml_cfg.general.log_file.as_ref().map(PathBuf::from),
            gamepad: GamepadConfig {
                bomb: toml_cfg.gamepad.bomb,
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
                restart: toml_cfg.gamepad.restart,
            },
        }
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => return parse_toml(&text),
                Err(e) => log::warn!("could not read {}: {e}", path.display()),
            }
        }
    }
    TomlConfig::default()
}

fn parse_toml(text: &str) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            log::warn!("config.toml parse error, using default settings: {e}");
            TomlConfig::default()
        }
    }
}
