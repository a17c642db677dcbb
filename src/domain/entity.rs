/// Entities: Player, Enemy, Bomb, Explosion, AshPile, and the bomb-charge pool.
///
/// Every timer is counted in normalized 60 Hz frames (`f32`) and advanced by
/// the tick's time scale, so a stalled frame moves timers proportionally.

use super::grid::Cell;

/// Explosion `life` lost per normalized frame.
pub const EXPLOSION_DECAY: f32 = 0.02;
/// Ash `life` lost per normalized frame.
pub const ASH_DECAY: f32 = 0.01;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Up,
    Down,
    Left,
    Right,
}

impl Facing {
    pub const ALL: [Facing; 4] = [Facing::Up, Facing::Down, Facing::Left, Facing::Right];

    /// Unit step as (dcol, drow).
    pub fn delta(self) -> (i32, i32) {
        match self {
            Facing::Up => (0, -1),
            Facing::Down => (0, 1),
            Facing::Left => (-1, 0),
            Facing::Right => (1, 0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Facing::Left | Facing::Right)
    }
}

/// Frame input: movement is continuous (held key), bomb is edge-triggered.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub movement: Option<Facing>,
    pub place_bomb: bool,
}

impl FrameInput {
    /// Resolve held directions with fixed priority: left, right, up, down.
    pub fn from_held(left: bool, right: bool, up: bool, down: bool, place_bomb: bool) -> Self {
        let movement = if left {
            Some(Facing::Left)
        } else if right {
            Some(Facing::Right)
        } else if up {
            Some(Facing::Up)
        } else if down {
            Some(Facing::Down)
        } else {
            None
        };
        FrameInput { movement, place_bomb }
    }
}

// ── Speech bubble ──

#[derive(Clone, Debug)]
pub struct SpeechBubble {
    pub text: &'static str,
    pub timer: f32,
    pub max: f32,
}

impl SpeechBubble {
    pub fn new(text: &'static str, frames: f32) -> Self {
        SpeechBubble { text, timer: frames, max: frames }
    }

    /// Returns true once the bubble has run out.
    pub fn tick(&mut self, ts: f32) -> bool {
        self.timer -= ts;
        self.timer <= 0.0
    }
}

/// Advance an optional bubble, dropping it when it expires.
pub fn tick_bubble(bubble: &mut Option<SpeechBubble>, ts: f32) {
    if let Some(b) = bubble {
        if b.tick(ts) {
            *bubble = None;
        }
    }
}

// ── Actors ──

#[derive(Clone, Debug)]
pub struct Player {
    /// Sprite top-left in world units.
    pub x: f32,
    pub y: f32,
    pub facing: Facing,
    pub moving: bool,
    pub alive: bool,
    pub frame: f32,
    /// Bombs the player may still walk off (ghosting).
    pub standing_on: Vec<u32>,
    pub bubble: Option<SpeechBubble>,
}

impl Player {
    pub fn new(x: f32, y: f32, facing: Facing) -> Self {
        Player {
            x, y,
            facing,
            moving: false,
            alive: true,
            frame: 0.0,
            standing_on: vec![],
            bubble: None,
        }
    }

    /// True if a new line may replace whatever the player is saying.
    pub fn can_bark(&self) -> bool {
        self.bubble.as_ref().map_or(true, |b| b.timer < 30.0)
    }
}

/// Enemy state machine.
///   Patrol ⇄ Chase   (sight acquired / lost)
///   any → Stunned    (blast in stun radius)
///   Stunned → Patrol (timer ran out; never straight back to Chase)
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EnemyState {
    Patrol,
    Chase,
    Stunned,
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub facing: Facing,
    pub state: EnemyState,
    pub speed: f32,
    pub stun_timer: f32,
    pub frame: f32,
    pub bubble: Option<SpeechBubble>,
}

impl Enemy {
    pub fn new(id: u32, x: f32, y: f32, facing: Facing, speed: f32) -> Self {
        Enemy {
            id, x, y,
            facing,
            state: EnemyState::Patrol,
            speed,
            stun_timer: 0.0,
            frame: 0.0,
            bubble: None,
        }
    }

    /// Enter (or refresh) the stunned state.
    pub fn stun(&mut self, frames: f32) {
        self.state = EnemyState::Stunned;
        self.stun_timer = frames;
    }

    /// Count the stun down. Returns true on the tick the enemy recovers.
    pub fn tick_stun(&mut self, ts: f32) -> bool {
        if self.state != EnemyState::Stunned {
            return false;
        }
        self.stun_timer -= ts;
        if self.stun_timer <= 0.0 {
            self.stun_timer = 0.0;
            self.state = EnemyState::Patrol;
            return true;
        }
        false
    }
}

// ── Bombs and their aftermath ──

#[derive(Clone, Debug)]
pub struct Bomb {
    pub id: u32,
    pub cell: Cell,
    pub fuse: f32,
    pub fuse_max: f32,
}

impl Bomb {
    pub fn new(id: u32, cell: Cell, fuse: f32) -> Self {
        Bomb { id, cell, fuse, fuse_max: fuse }
    }

    /// Burn the fuse. Returns true when it has run out.
    pub fn tick(&mut self, ts: f32) -> bool {
        self.fuse -= ts;
        self.fuse <= 0.0
    }

    /// Chain reaction: clamp the fuse down, never up.
    pub fn accelerate(&mut self, chain_fuse: f32) {
        if self.fuse > chain_fuse {
            self.fuse = chain_fuse;
        }
    }

    /// 1.0 just placed → 0.0 about to blow.
    pub fn fuse_ratio(&self) -> f32 {
        if self.fuse_max <= 0.0 { return 0.0; }
        (self.fuse / self.fuse_max).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Debug)]
pub struct Explosion {
    pub id: u32,
    pub origin: Cell,
    pub cells: Vec<Cell>,
    pub life: f32,
}

impl Explosion {
    pub fn new(id: u32, origin: Cell, cells: Vec<Cell>) -> Self {
        Explosion { id, origin, cells, life: 1.0 }
    }

    /// Returns true once fully faded.
    pub fn tick(&mut self, ts: f32) -> bool {
        self.life -= EXPLOSION_DECAY * ts;
        self.life <= 0.0
    }
}

/// What is left of a destroyed enemy. Never collides.
#[derive(Clone, Debug)]
pub struct AshPile {
    pub id: u32,
    pub cell: Cell,
    pub life: f32,
    pub bubble: Option<SpeechBubble>,
}

impl AshPile {
    pub fn new(id: u32, cell: Cell) -> Self {
        AshPile { id, cell, life: 1.0, bubble: None }
    }

    pub fn tick(&mut self, ts: f32) -> bool {
        self.life -= ASH_DECAY * ts;
        tick_bubble(&mut self.bubble, ts);
        self.life <= 0.0
    }
}

/// Bomb-charge economy.
///
/// One recharge countdown per missing charge, so
/// `charges + recharge.len() == max` always holds.
#[derive(Clone, Debug)]
pub struct ChargePool {
    pub charges: u32,
    pub max: u32,
    pub recharge: Vec<f32>,
}

impl ChargePool {
    pub fn new(max: u32) -> Self {
        ChargePool { charges: max, max, recharge: vec![] }
    }

    /// Spend one charge, starting its recharge countdown.
    pub fn try_spend(&mut self, recharge_frames: f32) -> bool {
        if self.charges == 0 {
            return false;
        }
        self.charges -= 1;
        self.recharge.push(recharge_frames);
        true
    }

    /// Count recharges down. Returns how many charges came back this tick.
    pub fn tick(&mut self, ts: f32) -> u32 {
        if self.charges >= self.max {
            return 0;
        }
        for t in self.recharge.iter_mut() {
            *t -= ts;
        }
        let before = self.recharge.len();
        self.recharge.retain(|t| *t > 0.0);
        let restored = (before - self.recharge.len()) as u32;
        self.charges = (self.charges + restored).min(self.max);
        restored
    }

    pub fn refill(&mut self) {
        self.charges = self.max;
        self.recharge.clear();
    }

    /// Progress of the charge closest to returning, 0.0..=1.0.
    pub fn next_recharge_progress(&self, recharge_frames: f32) -> Option<f32> {
        self.recharge
            .iter()
            .cloned()
            .fold(None, |acc: Option<f32>, t| Some(acc.map_or(t, |a| a.min(t))))
            .map(|t| (1.0 - t / recharge_frames).clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn from_held_priority() {
        let i = FrameInput::from_held(true, true, true, true, false);
        assert_eq!(i.movement, Some(Facing::Left));
        let i = FrameInput::from_held(false, false, true, true, true);
        assert_eq!(i.movement, Some(Facing::Up));
        assert!(i.place_bomb);
        assert_eq!(FrameInput::from_held(false, false, false, false, false).movement, None);
    }

    #[test]
    fn fuse_burns_and_reports_once_empty() {
        let mut b = Bomb::new(1, Cell::new(1, 1), 3.0);
        assert!(!b.tick(1.0));
        assert!(!b.tick(1.0));
        assert!(b.tick(1.0));
    }

    #[test]
    fn accelerate_never_lengthens() {
        let mut b = Bomb::new(1, Cell::new(1, 1), 120.0);
        b.accelerate(2.0);
        assert_eq!(b.fuse, 2.0);
        b.fuse = 1.0;
        b.accelerate(2.0);
        assert_eq!(b.fuse, 1.0);
    }

    #[test]
    fn stun_returns_to_patrol() {
        let mut e = Enemy::new(0, 0.0, 0.0, Facing::Down, 1.5);
        e.state = EnemyState::Chase;
        e.stun(3.0);
        assert_eq!(e.state, EnemyState::Stunned);
        assert!(!e.tick_stun(1.0));
        assert!(!e.tick_stun(1.0));
        assert!(e.tick_stun(1.0));
        assert_eq!(e.state, EnemyState::Patrol);
        // Not stunned: nothing to count
        assert!(!e.tick_stun(1.0));
    }

    #[test]
    fn explosion_and_ash_fade() {
        let mut ex = Explosion::new(1, Cell::new(1, 1), vec![Cell::new(1, 1)]);
        for _ in 0..45 { assert!(!ex.tick(1.0)); }
        assert!((0..10).any(|_| ex.tick(1.0)));

        let mut ash = AshPile::new(2, Cell::new(3, 3));
        for _ in 0..95 { assert!(!ash.tick(1.0)); }
        assert!((0..10).any(|_| ash.tick(1.0)));
    }

    #[test]
    fn bubble_expires() {
        let mut b = Some(SpeechBubble::new("hey", 2.0));
        tick_bubble(&mut b, 1.0);
        assert!(b.is_some());
        tick_bubble(&mut b, 1.0);
        assert!(b.is_none());
    }

    #[test]
    fn charge_pool_spend_and_recharge() {
        let mut pool = ChargePool::new(2);
        assert!(pool.try_spend(3.0));
        assert!(pool.try_spend(5.0));
        assert!(!pool.try_spend(3.0));
        assert_eq!(pool.charges, 0);
        assert_eq!(pool.recharge.len(), 2);

        assert_eq!(pool.tick(3.0), 1);
        assert_eq!(pool.charges, 1);
        assert_eq!(pool.tick(2.0), 1);
        assert_eq!(pool.charges, 2);
        assert!(pool.recharge.is_empty());
        // Full pool: ticking is a no-op
        assert_eq!(pool.tick(10.0), 0);
    }

    #[test]
    fn recharge_progress_tracks_nearest() {
        let mut pool = ChargePool::new(2);
        assert_eq!(pool.next_recharge_progress(100.0), None);
        pool.try_spend(100.0);
        pool.tick(25.0);
        pool.try_spend(100.0);
        let p = pool.next_recharge_progress(100.0).unwrap_or(0.0);
        assert!((p - 0.25).abs() < 1e-4);
    }

    proptest! {
        #[test]
        fn charge_invariant_holds(
            max in 1u32..5,
            ops in proptest::collection::vec((any::<bool>(), 0.0f32..4.0), 0..300),
        ) {
            let mut pool = ChargePool::new(max);
            for (spend, ts) in ops {
                if spend {
                    pool.try_spend(180.0);
                }
                pool.tick(ts);
                prop_assert_eq!(pool.charges + pool.recharge.len() as u32, max);
                prop_assert!(pool.charges <= max);
            }
        }
    }
}
