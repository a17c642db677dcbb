/// Room orchestration: starting a stage, entering and restarting rooms,
/// placing the player, spawning enemies.
///
/// Room N+1's entry door is room N's exit door mirrored to the opposite
/// edge. The final room has no exit; it has a goal instead.

use rand::Rng;

use crate::domain::barks::{BarkKind, START_FRAMES};
use crate::domain::entity::{Enemy, Facing, SpeechBubble};
use crate::domain::grid::{Cell, Door};
use crate::domain::maze;
use crate::domain::rules::MapView;
use super::event::GameEvent;
use super::world::{Phase, WorldState};

pub const FINAL_ROOM: u32 = 2;
pub const STAGE_SCORE: u32 = 1000;

/// Fresh stage: score, clock and charges reset, then room 1.
pub fn start_stage(world: &mut WorldState) -> Vec<GameEvent> {
    world.score = 0;
    world.elapsed = 0.0;
    world.tick = 0;
    world.charges.refill();
    let events = enter_room(world, 1, None);
    if let Some(line) = world.barks.line(BarkKind::PlayerStart, &mut world.rng) {
        world.player.bubble = Some(SpeechBubble::new(line, START_FRAMES));
    }
    events
}

/// Enter room `n`. `previous_exit` is the exit the player just walked
/// through; its mirror becomes this room's entry.
pub fn enter_room(world: &mut WorldState, n: u32, previous_exit: Option<Door>) -> Vec<GameEvent> {
    let forced = previous_exit.map(|d| d.mirrored(world.dims));
    build_room(world, n, forced)
}

/// Regenerate the current room behind the same entry and start over.
pub fn restart_room(world: &mut WorldState) -> Vec<GameEvent> {
    world.charges.refill();
    let forced = world.entry;
    let n = world.room.max(1);
    build_room(world, n, forced)
}

fn build_room(world: &mut WorldState, n: u32, forced: Option<Door>) -> Vec<GameEvent> {
    let mut events = Vec::new();
    let final_room = n >= FINAL_ROOM;
    let layout = maze::generate(world.dims, forced, final_room, &mut world.rng);
    let entry = layout.entry().unwrap_or_else(maze::default_entry);

    world.partitions = layout.partitions;
    world.doors = layout.doors;
    world.goal = layout.goal;
    world.entry = forced;
    world.room = n;
    world.outcome = None;
    world.enemies.clear();
    world.bombs.clear();
    world.explosions.clear();
    world.ashes.clear();

    place_player(world, entry);

    let wanted = world.rules.enemies_per_room;
    let spawned = spawn_enemies(world);
    if spawned < wanted {
        log::warn!("room {n}: spawned {spawned} of {wanted} enemies");
        events.push(GameEvent::EnemySpawnShortfall { wanted, spawned });
    }

    log::info!(
        "room {n}: entry {:?} {:?}, {} partitions, {} enemies",
        entry.cell, entry.side, world.partitions.len(), world.enemies.len()
    );

    world.phase = Phase::RoomIntro;
    world.anim_tick = 0;
    events.push(GameEvent::RoomEntered { room: n });
    events
}

fn place_player(world: &mut WorldState, entry: Door) {
    let (x, y) = world.geo.sprite_origin(entry.landing());
    let p = &mut world.player;
    p.x = x;
    p.y = y;
    p.facing = entry.side.arrival_facing();
    p.moving = false;
    p.alive = true;
    p.frame = 0.0;
    p.standing_on.clear();
    p.bubble = None;
}

/// Rejection-sample open cells away from the player and from each other.
/// Returns how many enemies were placed.
fn spawn_enemies(world: &mut WorldState) -> usize {
    let rules = &world.rules;
    let dims = world.dims;
    let player_cell = world.geo.sprite_cell(world.player.x, world.player.y);
    let view = MapView { dims, partitions: &world.partitions, bombs: &world.bombs };

    let mut picked: Vec<Cell> = Vec::new();
    let mut attempts = 0;
    while picked.len() < rules.enemies_per_room && attempts < rules.spawn_attempts {
        attempts += 1;
        let c = Cell::new(
            world.rng.random_range(1..dims.cols - 1),
            world.rng.random_range(1..dims.rows - 1),
        );
        if !view.cell_open(c) { continue; }
        if c.distance(player_cell) < rules.spawn_min_player { continue; }
        if picked.iter().any(|&o| o.distance(c) < rules.spawn_min_enemy) { continue; }
        picked.push(c);
    }

    let speed = world.rules.enemy_speed;
    for c in &picked {
        let id = world.next_id();
        let (x, y) = world.geo.sprite_origin(*c);
        let facing = if world.rng.random_bool(0.5) { Facing::Down } else { Facing::Right };
        world.enemies.push(Enemy::new(id, x, y, facing, speed));
    }
    picked.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulesConfig;
    use crate::domain::grid::DoorKind;
    use crate::sim::world::Outcome;

    fn world(seed: u64) -> WorldState {
        let mut w = WorldState::new(RulesConfig::default(), seed);
        start_stage(&mut w);
        w
    }

    #[test]
    fn first_room_uses_default_entry() {
        let w = world(1);
        assert_eq!(w.room, 1);
        assert_eq!(w.entry, None);
        assert_eq!(w.doors[0].cell, Cell::new(0, 1));
        assert_eq!(w.player_cell(), Cell::new(1, 1));
        assert_eq!(w.player.facing, Facing::Right);
        assert!(w.exit_door().is_some());
        assert!(w.goal.is_none());
        assert_eq!(w.phase, Phase::RoomIntro);
        assert!(w.player.bubble.is_some());
    }

    #[test]
    fn enemies_keep_their_distance() {
        for seed in 0..60 {
            let w = world(seed);
            let pc = w.player_cell();
            let cells: Vec<Cell> = w.enemies.iter().map(|e| w.enemy_cell(e)).collect();
            for (i, c) in cells.iter().enumerate() {
                assert!(w.map_view().cell_open(*c), "seed {seed}: enemy on blocked {c:?}");
                assert!(c.distance(pc) >= w.rules.spawn_min_player);
                for o in &cells[i + 1..] {
                    assert!(c.distance(*o) >= w.rules.spawn_min_enemy);
                }
            }
            assert!(w.enemies.iter().all(|e| matches!(e.facing, Facing::Down | Facing::Right)));
        }
    }

    #[test]
    fn shortfall_is_reported_not_fatal() {
        let mut rules = RulesConfig::default();
        rules.spawn_attempts = 0;
        let mut w = WorldState::new(rules, 4);
        let events = start_stage(&mut w);
        assert!(w.enemies.is_empty());
        assert!(events.contains(&GameEvent::EnemySpawnShortfall { wanted: 3, spawned: 0 }));
        assert!(events.contains(&GameEvent::RoomEntered { room: 1 }));
    }

    #[test]
    fn second_room_mirrors_the_exit() {
        let mut w = world(9);
        let exit = w.exit_door().unwrap_or_else(maze::default_entry);
        enter_room(&mut w, 2, Some(exit));
        let entry = w.doors[0];
        assert_eq!(entry.kind, DoorKind::Entry);
        assert_eq!(entry.cell, w.dims.mirror(exit.cell));
        assert_eq!(w.entry, Some(entry));
        assert!(w.goal.is_some());
        assert!(w.exit_door().is_none());
        assert_eq!(w.player_cell(), entry.landing());
        assert_eq!(w.player.facing, entry.side.arrival_facing());
    }

    #[test]
    fn restart_keeps_entry_and_refills() {
        let mut w = world(12);
        let exit = w.exit_door().unwrap_or_else(maze::default_entry);
        enter_room(&mut w, 2, Some(exit));
        let entry = w.entry;
        w.charges.try_spend(300.0);
        w.charges.try_spend(300.0);
        w.player.alive = false;
        w.outcome = Some(Outcome::Defeat);

        restart_room(&mut w);
        assert_eq!(w.room, 2);
        assert_eq!(w.entry, entry);
        assert_eq!(w.charges.charges, w.charges.max);
        assert!(w.charges.recharge.is_empty());
        assert!(w.player.alive);
        assert_eq!(w.outcome, None);
    }

    #[test]
    fn charges_carry_into_next_room() {
        let mut w = world(3);
        w.charges.try_spend(300.0);
        let exit = w.exit_door().unwrap_or_else(maze::default_entry);
        enter_room(&mut w, 2, Some(exit));
        assert_eq!(w.charges.charges, w.charges.max - 1);
    }
}
