/// The step function: advances the world by one frame of `dt_ms`.
///
/// Processing order:
///   1. Bomb placement
///   2. Fuses: burn every fuse, then detonate the spent ones in placement
///      order (partitions break, neighbours chain, enemies die or stun,
///      player dies)
///   3. Charge recharge
///   4. Effect decay (explosions, ash, player bubble)
///   5. Enemies: stun countdown, contact, sight, steering
///   6. Player movement (lane alignment + rect collision)
///   7. Ghost set upkeep
///   8. Room exit / goal check
///
/// Time: `ts = dt_ms / (1000/60)`, clamped to `max_time_scale`, so every
/// frame-denominated timer and speed scales by the same factor.
/// Non-positive `dt_ms` is a no-op.
///
/// Terminal outcomes latch: once `world.outcome` is set, later phases
/// and later steps do nothing.

use rand::Rng;

use crate::domain::ai;
use crate::domain::barks::{BarkKind, BUBBLE_FRAMES, LAST_WORDS_FRAMES, SPOT_BARK_CHANCE};
use crate::domain::entity::{
    tick_bubble, AshPile, Bomb, EnemyState, Explosion, Facing, FrameInput, SpeechBubble,
};
use crate::domain::physics::{align_step, CollisionMap};
use crate::domain::rules::{self, MapView};
use super::event::GameEvent;
use super::room::{self, STAGE_SCORE};
use super::world::{Outcome, Phase, WorldState};

/// One reference frame at 60 Hz.
pub const FRAME_MS: f32 = 1000.0 / 60.0;

pub fn time_scale(dt_ms: f32, max: f32) -> f32 {
    (dt_ms / FRAME_MS).min(max)
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: FrameInput, dt_ms: f32) -> Vec<GameEvent> {
    if world.phase != Phase::Playing || world.outcome.is_some() { return vec![]; }
    if !(dt_ms > 0.0) { return vec![]; }

    let ts = time_scale(dt_ms, world.rules.max_time_scale);
    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;
    world.elapsed += dt_ms / 1000.0;

    if world.message_timer > 0 {
        world.message_timer -= 1;
        if world.message_timer == 0 { world.message.clear(); }
    }

    if input.place_bomb { resolve_bomb_placement(world, &mut events); }
    resolve_fuses(world, ts, &mut events);
    if world.outcome.is_some() { return events; }
    resolve_charges(world, ts, &mut events);
    resolve_effects(world, ts);
    resolve_enemies(world, ts, &mut events);
    if world.outcome.is_some() { return events; }
    resolve_player_movement(world, input.movement, ts);
    resolve_ghosting(world);
    resolve_room_exit(world, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Bomb placement
// ══════════════════════════════════════════════════════════════

fn resolve_bomb_placement(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if !world.player.alive { return; }

    // The cell under the sprite centre; a partition cell refuses the bomb
    let cell = world.player_cell();
    if !rules::can_place_bomb(&world.map_view(), cell, world.charges.charges) { return; }
    if !world.charges.try_spend(world.rules.recharge_frames) { return; }

    let id = world.next_id();
    world.bombs.push(Bomb::new(id, cell, world.rules.fuse_frames));
    // The placer may walk off its own bomb
    world.player.standing_on.push(id);
    events.push(GameEvent::BombPlaced { id, cell });
    log::debug!("bomb {id} placed at {cell:?}, {} charges left", world.charges.charges);

    if world.player.can_bark() {
        if let Some(line) = world.barks.line(BarkKind::PlayerBomb, &mut world.rng) {
            world.player.bubble = Some(SpeechBubble::new(line, BUBBLE_FRAMES));
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Fuses and detonation
// ══════════════════════════════════════════════════════════════

fn resolve_fuses(world: &mut WorldState, ts: f32, events: &mut Vec<GameEvent>) {
    let mut due: Vec<u32> = Vec::new();
    for bomb in world.bombs.iter_mut() {
        if bomb.tick(ts) { due.push(bomb.id); }
    }
    for id in due {
        let Some(idx) = world.bombs.iter().position(|b| b.id == id) else { continue };
        let bomb = world.bombs.remove(idx);
        detonate(world, &bomb, events);
    }
}

fn detonate(world: &mut WorldState, bomb: &Bomb, events: &mut Vec<GameEvent>) {
    let blast = rules::blast_footprint(&world.map_view(), bomb.cell, world.rules.blast_radius);
    events.push(GameEvent::BombDetonated { id: bomb.id, cell: bomb.cell, cells: blast.cells.len() });

    // ── Partitions ──
    world.partitions.retain(|p| !blast.broken.contains(&p.cell));
    for &cell in &blast.broken {
        events.push(GameEvent::PartitionDestroyed { cell });
    }

    // ── Chain ──
    let chain = world.rules.chain_fuse_frames;
    for other in world.bombs.iter_mut() {
        if blast.contains(other.cell) { other.accelerate(chain); }
    }

    // ── Enemies: burn inside the blast, stun near it ──
    let mut killed = 0;
    let mut stunned = 0;
    let enemies = std::mem::take(&mut world.enemies);
    for mut enemy in enemies {
        let cell = world.enemy_cell(&enemy);
        if blast.contains(cell) {
            killed += 1;
            let ash_id = world.next_id();
            let mut ash = AshPile::new(ash_id, cell);
            if let Some(line) = world.barks.line(BarkKind::EnemyDie, &mut world.rng) {
                ash.bubble = Some(SpeechBubble::new(line, LAST_WORDS_FRAMES));
            }
            world.ashes.push(ash);
            events.push(GameEvent::EnemyDestroyed { id: enemy.id, cell });
            continue;
        }
        if cell.distance(bomb.cell) <= world.rules.stun_radius {
            if enemy.state != EnemyState::Stunned {
                stunned += 1;
                events.push(GameEvent::EnemyStunned { id: enemy.id });
                if let Some(line) = world.barks.line(BarkKind::EnemyStun, &mut world.rng) {
                    enemy.bubble = Some(SpeechBubble::new(line, BUBBLE_FRAMES));
                }
            }
            enemy.stun(world.rules.stun_frames);
        }
        world.enemies.push(enemy);
    }

    let explosion_id = world.next_id();
    world.explosions.push(Explosion::new(explosion_id, bomb.cell, blast.cells.clone()));
    log::debug!(
        "bomb {} at {:?}: {} cells, {} partitions, {killed} killed, {stunned} stunned",
        bomb.id, bomb.cell, blast.cells.len(), blast.broken.len()
    );

    // ── Player ──
    if world.player.alive && blast.contains(world.player_cell()) {
        player_die(world, events);
        return;
    }

    let kind = if killed > 0 {
        Some(BarkKind::PlayerKill)
    } else if stunned > 0 {
        Some(BarkKind::PlayerStun)
    } else {
        None
    };
    if let Some(kind) = kind {
        if let Some(line) = world.barks.line(kind, &mut world.rng) {
            world.player.bubble = Some(SpeechBubble::new(line, BUBBLE_FRAMES));
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Timers
// ══════════════════════════════════════════════════════════════

fn resolve_charges(world: &mut WorldState, ts: f32, events: &mut Vec<GameEvent>) {
    let restored = world.charges.tick(ts);
    for _ in 0..restored {
        events.push(GameEvent::ChargeRestored);
    }
}

fn resolve_effects(world: &mut WorldState, ts: f32) {
    world.explosions.retain_mut(|e| !e.tick(ts));
    world.ashes.retain_mut(|a| !a.tick(ts));
    tick_bubble(&mut world.player.bubble, ts);
}

// ══════════════════════════════════════════════════════════════
// Enemies
// ══════════════════════════════════════════════════════════════

fn resolve_enemies(world: &mut WorldState, ts: f32, events: &mut Vec<GameEvent>) {
    let geo = &world.geo;
    let cfg = &world.rules;
    let (px, py) = geo.sprite_center(world.player.x, world.player.y);
    let player_cell = geo.cell_at(px, py);
    let contact = cfg.contact_radius * geo.scale;
    let view = MapView { dims: world.dims, partitions: &world.partitions, bombs: &world.bombs };

    let mut caught = false;
    for enemy in world.enemies.iter_mut() {
        tick_bubble(&mut enemy.bubble, ts);

        if enemy.state == EnemyState::Stunned {
            if enemy.tick_stun(ts) {
                events.push(GameEvent::EnemyRecovered { id: enemy.id });
            }
            continue;
        }
        enemy.frame += ts;

        let (ex, ey) = geo.sprite_center(enemy.x, enemy.y);
        if world.player.alive && (ex - px).hypot(ey - py) < contact {
            caught = true;
            break;
        }

        let here = geo.cell_at(ex, ey);
        let sight = if world.player.alive {
            rules::line_of_sight(&view, here, player_cell, cfg.sight_range)
        } else {
            None
        };
        let seen = ai::perceive(enemy.state, enemy.facing, sight);
        enemy.state = seen.state;
        enemy.facing = seen.facing;
        if seen.acquired {
            events.push(GameEvent::EnemySpotted { id: enemy.id });
            if world.rng.random_bool(SPOT_BARK_CHANCE) {
                if let Some(line) = world.barks.line(BarkKind::EnemyChase, &mut world.rng) {
                    enemy.bubble = Some(SpeechBubble::new(line, BUBBLE_FRAMES));
                }
            }
        }
        if seen.lost {
            events.push(GameEvent::EnemyLostSight { id: enemy.id });
        }

        ai::steer(enemy, &view, geo, ts, cfg.chase_multiplier, &mut world.rng);
    }

    if caught { player_die(world, events); }
}

// ══════════════════════════════════════════════════════════════
// Player movement
// ══════════════════════════════════════════════════════════════

fn resolve_player_movement(world: &mut WorldState, movement: Option<Facing>, ts: f32) {
    if !world.player.alive { return; }
    world.player.moving = movement.is_some();
    let Some(dir) = movement else { return };

    let geo = &world.geo;
    let map = CollisionMap {
        view: MapView { dims: world.dims, partitions: &world.partitions, bombs: &world.bombs },
        doors: &world.doors,
        geo,
    };
    let player = &mut world.player;
    player.facing = dir;
    player.frame += ts;

    let speed = world.rules.player_speed * geo.scale * ts;
    let align = geo.player_align * ts;
    let (fx, fy) = dir.delta();
    let here = geo.sprite_cell(player.x, player.y);
    let ghosts = &player.standing_on;
    let (mut x, mut y) = (player.x, player.y);

    // Slide toward the lane centre, then advance along the axis
    if dir.is_horizontal() {
        let fix = align_step(y, geo.lane_y(here.row), align);
        if fix != 0.0 && map.passable(&geo.hitbox(x, y + fix), ghosts) { y += fix; }
        let nx = x + fx as f32 * speed;
        if map.passable(&geo.hitbox(nx, y), ghosts) { x = nx; }
    } else {
        let fix = align_step(x, geo.lane_x(here.col), align);
        if fix != 0.0 && map.passable(&geo.hitbox(x + fix, y), ghosts) { x += fix; }
        let ny = y + fy as f32 * speed;
        if map.passable(&geo.hitbox(x, ny), ghosts) { y = ny; }
    }

    player.x = x;
    player.y = y;
}

/// Drop ghost ids once the hitbox has left the bomb's cell (or the bomb is gone).
fn resolve_ghosting(world: &mut WorldState) {
    let map = world.collision();
    let hitbox = world.geo.hitbox(world.player.x, world.player.y);
    let keep: Vec<u32> = world
        .player
        .standing_on
        .iter()
        .copied()
        .filter(|&id| {
            map.view
                .bombs
                .iter()
                .find(|b| b.id == id)
                .map_or(false, |b| map.overlaps_cell(&hitbox, b.cell))
        })
        .collect();
    world.player.standing_on = keep;
}

// ══════════════════════════════════════════════════════════════
// Outcomes
// ══════════════════════════════════════════════════════════════

fn resolve_room_exit(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if !world.player.alive || world.outcome.is_some() { return; }

    if let Some(goal) = world.goal {
        let (px, py) = world.geo.sprite_center(world.player.x, world.player.y);
        let (gx, gy) = world.geo.cell_center(goal);
        if (gx - px).hypot(gy - py) < world.rules.goal_radius * world.geo.scale {
            stage_complete(world, events);
        }
        return;
    }

    let Some(exit) = world.exit_door() else { return };
    let hitbox = world.geo.hitbox(world.player.x, world.player.y);
    if hitbox.overlaps(&world.geo.cell_rect(exit.cell)) {
        let cleared = world.room;
        log::info!("room {cleared} cleared after {:.1}s", world.elapsed);
        events.push(GameEvent::RoomCleared { room: cleared });
        events.extend(room::enter_room(world, cleared + 1, Some(exit)));
    }
}

fn stage_complete(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    world.outcome = Some(Outcome::Victory);
    world.score += STAGE_SCORE;
    world.phase = Phase::StageComplete;
    world.anim_tick = 0;
    log::info!("stage complete in {:.1}s, score {}", world.elapsed, world.score);
    events.push(GameEvent::StageComplete { score: world.score, elapsed: world.elapsed });
}

fn player_die(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.outcome.is_some() { return; }
    world.player.alive = false;
    world.player.moving = false;
    world.outcome = Some(Outcome::Defeat);
    world.phase = Phase::Dying;
    world.anim_tick = 0;
    log::info!("room {}: player down after {:.1}s", world.room, world.elapsed);
    events.push(GameEvent::PlayerKilled);
    events.push(GameEvent::GameOver);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulesConfig;
    use crate::domain::entity::Enemy;
    use crate::domain::grid::{Axis, Cell, Partition};
    use proptest::prelude::*;

    fn idle() -> FrameInput {
        FrameInput::default()
    }

    fn bomb() -> FrameInput {
        FrameInput { movement: None, place_bomb: true }
    }

    fn walk(dir: Facing) -> FrameInput {
        FrameInput { movement: Some(dir), place_bomb: false }
    }

    /// Room 1, playing, no enemies.
    fn quiet_world(seed: u64) -> WorldState {
        let mut w = WorldState::new(RulesConfig::default(), seed);
        room::start_stage(&mut w);
        w.enemies.clear();
        w.phase = Phase::Playing;
        w
    }

    fn put_player(w: &mut WorldState, c: Cell) {
        let (x, y) = w.geo.sprite_origin(c);
        w.player.x = x;
        w.player.y = y;
    }

    fn put_enemy(w: &mut WorldState, c: Cell, facing: Facing) -> u32 {
        let id = w.next_id();
        let (x, y) = w.geo.sprite_origin(c);
        let speed = w.rules.enemy_speed;
        w.enemies.push(Enemy::new(id, x, y, facing, speed));
        id
    }

    fn run(w: &mut WorldState, input: FrameInput, frames: usize) -> Vec<GameEvent> {
        let mut all = vec![];
        for _ in 0..frames {
            all.extend(step(w, input, FRAME_MS));
        }
        all
    }

    fn count(events: &[GameEvent], pred: impl Fn(&GameEvent) -> bool) -> usize {
        events.iter().filter(|e| pred(e)).count()
    }

    // ── Time ──

    #[test]
    fn time_scale_is_clamped() {
        assert!((time_scale(FRAME_MS, 4.0) - 1.0).abs() < 1e-5);
        assert!((time_scale(FRAME_MS * 2.0, 4.0) - 2.0).abs() < 1e-5);
        assert_eq!(time_scale(1000.0, 4.0), 4.0);
    }

    #[test]
    fn non_positive_dt_is_noop() {
        let mut w = quiet_world(1);
        let (x, tick) = (w.player.x, w.tick);
        assert!(step(&mut w, walk(Facing::Right), 0.0).is_empty());
        assert!(step(&mut w, walk(Facing::Right), -5.0).is_empty());
        assert!(step(&mut w, bomb(), f32::NAN).is_empty());
        assert_eq!(w.player.x, x);
        assert_eq!(w.tick, tick);
        assert!(w.bombs.is_empty());
    }

    #[test]
    fn step_only_runs_while_playing() {
        let mut w = quiet_world(1);
        w.phase = Phase::RoomIntro;
        assert!(step(&mut w, bomb(), FRAME_MS).is_empty());
        assert!(w.bombs.is_empty());
    }

    // ── Bomb at spawn ──

    #[test]
    fn standing_on_own_bomb_is_fatal() {
        let mut w = quiet_world(21);
        let mut events = step(&mut w, bomb(), FRAME_MS);
        assert_eq!(w.bombs.len(), 1);
        events.extend(run(&mut w, idle(), 130));

        assert_eq!(count(&events, |e| *e == GameEvent::GameOver), 1);
        assert_eq!(count(&events, |e| *e == GameEvent::PlayerKilled), 1);
        assert_eq!(w.outcome, Some(Outcome::Defeat));
        assert_eq!(w.phase, Phase::Dying);
        // Latched
        w.phase = Phase::Playing;
        assert!(run(&mut w, idle(), 5).is_empty());
    }

    #[test]
    fn walking_clear_of_own_bomb_survives() {
        let mut w = quiet_world(21);
        step(&mut w, bomb(), FRAME_MS);
        // Entry corridor is always open: (1,1) → (3,1)
        let events = run(&mut w, walk(Facing::Right), 35);
        assert_eq!(w.player_cell(), Cell::new(3, 1));
        let rest = run(&mut w, idle(), 100);

        assert!(events.iter().chain(rest.iter()).all(|e| *e != GameEvent::GameOver));
        assert_eq!(count(&rest, |e| matches!(e, GameEvent::BombDetonated { .. })), 1);
        assert!(w.player.alive);
        assert!(w.bombs.is_empty());
        assert_eq!(w.explosions.len(), 1);
    }

    // ── Ghosting ──

    #[test]
    fn ghost_then_solid() {
        let mut w = quiet_world(5);
        step(&mut w, bomb(), FRAME_MS);
        let id = w.bombs[0].id;
        assert_eq!(w.player.standing_on, vec![id]);

        let x0 = w.player.x;
        step(&mut w, walk(Facing::Right), FRAME_MS);
        assert!(w.player.x > x0, "placer must be able to walk off");

        run(&mut w, walk(Facing::Right), 20);
        assert!(w.player.standing_on.is_empty());

        run(&mut w, walk(Facing::Left), 20);
        let hitbox = w.geo.hitbox(w.player.x, w.player.y);
        assert!(!hitbox.overlaps(&w.geo.cell_rect(Cell::new(1, 1))));
        assert!(w.player.standing_on.is_empty());
    }

    #[test]
    fn bomb_refused_inside_partition_cell() {
        let mut w = quiet_world(4);
        w.partitions = vec![Partition { cell: Cell::new(2, 1), axis: Axis::Vertical }];
        // Flush against the strip from the right, centre over the partition cell
        w.player.x = 117.0;
        w.player.y = w.geo.lane_y(1);
        w.player.facing = Facing::Left;
        assert_eq!(w.player_cell(), Cell::new(2, 1));
        assert!(w.collision().passable(&w.geo.hitbox(w.player.x, w.player.y), &[]));

        let events = step(&mut w, bomb(), FRAME_MS);
        assert!(w.bombs.is_empty());
        assert_eq!(w.charges.charges, w.charges.max);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::BombPlaced { .. })));
    }

    #[test]
    fn no_second_bomb_on_same_cell() {
        let mut w = quiet_world(5);
        step(&mut w, bomb(), FRAME_MS);
        let events = step(&mut w, bomb(), FRAME_MS);
        assert_eq!(w.bombs.len(), 1);
        assert_eq!(w.charges.charges, w.charges.max - 1);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::BombPlaced { .. })), 0);
    }

    // ── Fuses and chains ──

    #[test]
    fn fuse_burns_down_and_fires_once() {
        let mut w = quiet_world(8);
        put_player(&mut w, Cell::new(9, 9));
        let id = w.next_id();
        w.bombs.push(Bomb::new(id, Cell::new(3, 3), 120.0));

        let mut last = f32::INFINITY;
        let mut fired = 0;
        for _ in 0..200 {
            let events = step(&mut w, idle(), FRAME_MS);
            fired += count(&events, |e| matches!(e, GameEvent::BombDetonated { id: i, .. } if *i == id));
            if let Some(b) = w.bombs.iter().find(|b| b.id == id) {
                assert!(b.fuse < last);
                last = b.fuse;
            }
        }
        assert_eq!(fired, 1);
    }

    #[test]
    fn chain_shortens_fuse_without_instant_blast() {
        let mut w = quiet_world(8);
        put_player(&mut w, Cell::new(9, 9));
        w.partitions.clear();
        let a = w.next_id();
        let b = w.next_id();
        w.bombs.push(Bomb::new(a, Cell::new(3, 3), 1.0));
        w.bombs.push(Bomb::new(b, Cell::new(4, 3), 100.0));

        let events = step(&mut w, idle(), FRAME_MS);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::BombDetonated { .. })), 1);
        let fuse = w.bombs.iter().find(|x| x.id == b).map(|x| x.fuse);
        assert_eq!(fuse, Some(w.rules.chain_fuse_frames));

        let events = step(&mut w, idle(), FRAME_MS);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::BombDetonated { .. })), 0);
        let events = step(&mut w, idle(), FRAME_MS);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::BombDetonated { id, .. } if *id == b)), 1);
        assert!(w.bombs.is_empty());
    }

    #[test]
    fn blast_breaks_partition_and_stops() {
        let mut w = quiet_world(8);
        put_player(&mut w, Cell::new(9, 9));
        w.partitions = vec![Partition { cell: Cell::new(4, 3), axis: Axis::Vertical }];
        let id = w.next_id();
        w.bombs.push(Bomb::new(id, Cell::new(3, 3), 1.0));

        let events = step(&mut w, idle(), FRAME_MS);
        assert!(events.contains(&GameEvent::PartitionDestroyed { cell: Cell::new(4, 3) }));
        assert!(w.partitions.is_empty());
    }

    // ── Enemies vs blasts ──

    #[test]
    fn blast_burns_enemy_to_ash() {
        let mut w = quiet_world(8);
        put_player(&mut w, Cell::new(9, 9));
        w.partitions.clear();
        let e = put_enemy(&mut w, Cell::new(3, 2), Facing::Down);
        let id = w.next_id();
        w.bombs.push(Bomb::new(id, Cell::new(3, 3), 1.0));

        let events = step(&mut w, idle(), FRAME_MS);
        assert!(events.contains(&GameEvent::EnemyDestroyed { id: e, cell: Cell::new(3, 2) }));
        assert!(w.enemies.is_empty());
        assert_eq!(w.ashes.len(), 1);
        assert!(w.ashes[0].bubble.is_some());
    }

    #[test]
    fn nearby_blast_stuns_and_enemy_recovers() {
        let mut w = quiet_world(8);
        put_player(&mut w, Cell::new(15, 9));
        w.partitions.clear();
        let e = put_enemy(&mut w, Cell::new(5, 5), Facing::Down);
        let id = w.next_id();
        w.bombs.push(Bomb::new(id, Cell::new(3, 5), 1.0));

        let events = step(&mut w, idle(), FRAME_MS);
        assert!(events.contains(&GameEvent::EnemyStunned { id: e }));
        assert_eq!(w.enemies[0].state, EnemyState::Stunned);
        let pos = (w.enemies[0].x, w.enemies[0].y);

        // Detonation stuns with the full duration; one frame already elapsed
        let frames = w.rules.stun_frames as usize;
        let events = run(&mut w, idle(), frames - 2);
        assert_eq!(w.enemies[0].state, EnemyState::Stunned);
        assert_eq!((w.enemies[0].x, w.enemies[0].y), pos, "stunned enemies hold still");
        assert!(!events.contains(&GameEvent::EnemyRecovered { id: e }));

        let events = run(&mut w, idle(), 1);
        assert!(events.contains(&GameEvent::EnemyRecovered { id: e }));
        assert_eq!(w.enemies[0].state, EnemyState::Patrol);
    }

    #[test]
    fn refreshed_stun_is_quiet() {
        let mut w = quiet_world(8);
        put_player(&mut w, Cell::new(15, 9));
        w.player.bubble = None;
        w.partitions.clear();
        let e = put_enemy(&mut w, Cell::new(5, 5), Facing::Down);
        w.enemies[0].stun(30.0);
        let id = w.next_id();
        w.bombs.push(Bomb::new(id, Cell::new(3, 5), 1.0));

        let events = step(&mut w, idle(), FRAME_MS);
        assert!(!events.contains(&GameEvent::EnemyStunned { id: e }));
        // Timer still refreshed to the full duration
        assert!(w.enemies[0].stun_timer > 30.0);
        assert!(w.player.bubble.is_none(), "no stun bark for an already stunned enemy");
    }

    #[test]
    fn stun_lasts_exactly_its_duration() {
        let mut w = quiet_world(3);
        put_player(&mut w, Cell::new(15, 9));
        let e = put_enemy(&mut w, Cell::new(1, 9), Facing::Right);
        w.enemies[0].stun(120.0);

        run(&mut w, idle(), 119);
        assert_eq!(w.enemies[0].state, EnemyState::Stunned);
        let events = run(&mut w, idle(), 1);
        assert_eq!(w.enemies[0].state, EnemyState::Patrol);
        assert!(events.contains(&GameEvent::EnemyRecovered { id: e }));
    }

    #[test]
    fn stunned_enemy_is_harmless() {
        let mut w = quiet_world(3);
        put_player(&mut w, Cell::new(5, 5));
        put_enemy(&mut w, Cell::new(5, 5), Facing::Right);
        w.enemies[0].stun(60.0);
        let events = run(&mut w, idle(), 10);
        assert!(!events.contains(&GameEvent::GameOver));
        assert!(w.player.alive);
    }

    // ── Contact and sight ──

    #[test]
    fn contact_kills() {
        let mut w = quiet_world(3);
        put_player(&mut w, Cell::new(5, 5));
        put_enemy(&mut w, Cell::new(5, 5), Facing::Right);
        let events = step(&mut w, idle(), FRAME_MS);
        assert!(events.contains(&GameEvent::GameOver));
        assert_eq!(w.outcome, Some(Outcome::Defeat));
    }

    #[test]
    fn sight_needs_a_clear_line() {
        let mut w = quiet_world(3);
        w.partitions.clear();
        put_player(&mut w, Cell::new(5, 3));
        let e = put_enemy(&mut w, Cell::new(3, 3), Facing::Down);

        let events = step(&mut w, idle(), FRAME_MS);
        assert!(events.contains(&GameEvent::EnemySpotted { id: e }));
        assert_eq!(w.enemies[0].state, EnemyState::Chase);
        assert_eq!(w.enemies[0].facing, Facing::Right);

        w.partitions.push(Partition { cell: Cell::new(4, 3), axis: Axis::Vertical });
        let events = step(&mut w, idle(), FRAME_MS);
        assert!(events.contains(&GameEvent::EnemyLostSight { id: e }));
        assert_ne!(w.enemies[0].state, EnemyState::Chase);
    }

    // ── Rooms ──

    #[test]
    fn exit_door_leads_to_final_room() {
        let mut w = quiet_world(14);
        let exit = w.exit_door().expect("first room has an exit");
        put_player(&mut w, exit.cell);

        let events = step(&mut w, idle(), FRAME_MS);
        assert!(events.contains(&GameEvent::RoomCleared { room: 1 }));
        assert!(events.contains(&GameEvent::RoomEntered { room: 2 }));
        assert_eq!(w.room, 2);
        assert_eq!(w.entry.map(|d| d.cell), Some(w.dims.mirror(exit.cell)));
        assert_eq!(w.phase, Phase::RoomIntro);
        assert!(w.goal.is_some());
        assert!(w.outcome.is_none());
    }

    #[test]
    fn reaching_goal_completes_once() {
        let mut w = quiet_world(14);
        let exit = w.exit_door().expect("first room has an exit");
        room::enter_room(&mut w, 2, Some(exit));
        w.enemies.clear();
        w.phase = Phase::Playing;
        let goal = w.goal.expect("final room has a goal");
        put_player(&mut w, goal);

        let events = step(&mut w, idle(), FRAME_MS);
        let done = count(&events, |e| matches!(e, GameEvent::StageComplete { .. }));
        assert_eq!(done, 1);
        assert_eq!(w.score, STAGE_SCORE);
        assert_eq!(w.outcome, Some(Outcome::Victory));
        w.phase = Phase::Playing;
        assert!(run(&mut w, idle(), 3).is_empty());
    }

    // ── Charges ──

    proptest! {
        #[test]
        fn charge_pool_stays_balanced(
            script in proptest::collection::vec((any::<bool>(), 0u8..5, 1.0f32..70.0), 1..120)
        ) {
            let mut w = quiet_world(2);
            for (place, dir, dt) in script {
                let movement = Facing::ALL.get(dir as usize).copied();
                step(&mut w, FrameInput { movement, place_bomb: place }, dt);
                let c = &w.charges;
                prop_assert!(c.charges <= c.max);
                prop_assert_eq!(c.charges as usize + c.recharge.len(), c.max as usize);
            }
        }
    }
}
