/// WorldState: the complete snapshot of a running stage.
///
/// ## Room Architecture
///
/// A stage is two rooms. Everything about the active room lives here:
///   - layout: `partitions`, `doors`, `goal` (replaced wholesale on entry)
///   - occupants: `player`, `enemies`, `bombs`
///   - effects: `explosions`, `ashes` (never collide)
///   - economy: `charges` (persists across rooms)
///
/// Subsystems read the room through `map_view()` / `collision()`; no
/// subsystem keeps its own copy of partitions or bombs.
///
/// ## Outcome Latch
///
/// `outcome` is set at most once per room by the step function. While it
/// is `Some`, `step` is a no-op. Only `room::enter_room` / `restart_room`
/// clear it.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::config::RulesConfig;
use crate::domain::barks::BarkBook;
use crate::domain::entity::{AshPile, Bomb, ChargePool, Enemy, Explosion, Facing, Player};
use crate::domain::grid::{Cell, Door, DoorKind, GridDims, Partition};
use crate::domain::physics::{CollisionMap, Geometry};
use crate::domain::rules::MapView;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    RoomIntro,
    Playing,
    Dying,
    GameOver,
    StageComplete,
}

/// Terminal result of the current room.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    Defeat,
    Victory,
}

pub struct WorldState {
    // ── Room layout ──
    pub dims: GridDims,
    pub geo: Geometry,
    pub partitions: Vec<Partition>,
    pub doors: Vec<Door>,
    pub goal: Option<Cell>,

    // ── Entities ──
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub bombs: Vec<Bomb>,
    pub explosions: Vec<Explosion>,
    pub ashes: Vec<AshPile>,
    pub charges: ChargePool,

    // ── Rules / randomness ──
    pub rules: RulesConfig,
    pub rng: Pcg32,
    pub seed: u64,
    pub barks: BarkBook,
    next_id: u32,

    // ── Stage tracking ──
    pub room: u32,
    /// Forced entry of the current room (`None` in the first room).
    pub entry: Option<Door>,
    pub outcome: Option<Outcome>,
    /// Seconds spent in play this stage.
    pub elapsed: f32,
    pub score: u32,
    pub tick: u64,

    // ── Meta / UI ──
    pub phase: Phase,
    pub message: String,
    pub message_timer: u32,
    pub anim_tick: u32,
    pub paused: bool,
}

// ── Room queries ──

impl WorldState {
    pub fn map_view(&self) -> MapView<'_> {
        MapView { dims: self.dims, partitions: &self.partitions, bombs: &self.bombs }
    }

    pub fn collision(&self) -> CollisionMap<'_> {
        CollisionMap { view: self.map_view(), doors: &self.doors, geo: &self.geo }
    }

    pub fn exit_door(&self) -> Option<Door> {
        self.doors.iter().copied().find(|d| d.kind == DoorKind::Exit)
    }

    pub fn player_cell(&self) -> Cell {
        self.geo.sprite_cell(self.player.x, self.player.y)
    }

    pub fn enemy_cell(&self, enemy: &Enemy) -> Cell {
        self.geo.sprite_cell(enemy.x, enemy.y)
    }

    /// Unique id for bombs, enemies, explosions and ash piles.
    pub fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

// ── Construction ──

impl WorldState {
    pub fn new(rules: RulesConfig, seed: u64) -> Self {
        let dims = GridDims::new(rules.cols, rules.rows);
        let geo = Geometry::for_tile(rules.tile_size);
        WorldState {
            dims,
            geo,
            partitions: vec![],
            doors: vec![],
            goal: None,
            player: Player::new(0.0, 0.0, Facing::Right),
            enemies: vec![],
            bombs: vec![],
            explosions: vec![],
            ashes: vec![],
            charges: ChargePool::new(rules.max_charges),
            rules,
            rng: Pcg32::seed_from_u64(seed),
            seed,
            barks: BarkBook::new(),
            next_id: 0,
            room: 0,
            entry: None,
            outcome: None,
            elapsed: 0.0,
            score: 0,
            tick: 0,
            phase: Phase::Title,
            message: String::new(),
            message_timer: 0,
            anim_tick: 0,
            paused: false,
        }
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }
}
