/// Enemy AI: patrol / chase / stunned, driven by grid-aligned sight.
///
/// Two pieces:
///   1. **Perception**: turn a sight result into a state transition.
///      No memory: sight lost this tick means patrol this tick.
///   2. **Steering**: re-centre on the lane, advance along the facing,
///      and pick a fresh open direction when the probe cell is blocked.
///
/// Stunned enemies are skipped by the caller; neither piece runs for them.

use rand::seq::IndexedRandom;
use rand::Rng;

use super::entity::{Enemy, EnemyState, Facing};
use super::physics::{align_step, sign, Geometry};
use super::rules::MapView;

/// Outcome of one perception pass.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Perception {
    pub state: EnemyState,
    pub facing: Facing,
    /// Sight was gained this tick (patrol → chase).
    pub acquired: bool,
    /// Sight was lost this tick (chase → patrol).
    pub lost: bool,
}

/// Apply a sight check result to an enemy's current state.
pub fn perceive(state: EnemyState, facing: Facing, sight: Option<Facing>) -> Perception {
    if state == EnemyState::Stunned {
        return Perception { state, facing, acquired: false, lost: false };
    }
    match sight {
        Some(toward) => Perception {
            state: EnemyState::Chase,
            facing: toward,
            acquired: state != EnemyState::Chase,
            lost: false,
        },
        None => Perception {
            state: EnemyState::Patrol,
            facing,
            acquired: false,
            lost: state == EnemyState::Chase,
        },
    }
}

pub fn move_speed(enemy: &Enemy, chase_multiplier: f32) -> f32 {
    if enemy.state == EnemyState::Chase {
        enemy.speed * chase_multiplier
    } else {
        enemy.speed
    }
}

/// Pick a new facing uniformly from the open directions.
pub fn pick_facing<R: Rng + ?Sized>(options: &[Facing], rng: &mut R) -> Option<Facing> {
    options.choose(rng).copied()
}

/// Move one enemy for one tick. Returns false if it bumped and turned.
pub fn steer<R: Rng + ?Sized>(
    enemy: &mut Enemy,
    map: &MapView,
    geo: &Geometry,
    ts: f32,
    chase_multiplier: f32,
    rng: &mut R,
) -> bool {
    let here = geo.sprite_cell(enemy.x, enemy.y);
    let align = geo.enemy_align * ts;

    // Stay on the lane perpendicular to travel
    if enemy.facing.is_horizontal() {
        let target = geo.lane_y(here.row);
        enemy.y += align_step(enemy.y, target, align);
    } else {
        let target = geo.lane_x(here.col);
        enemy.x += align_step(enemy.x, target, align);
    }

    let speed = move_speed(enemy, chase_multiplier) * geo.scale * ts;
    let (fx, fy) = enemy.facing.delta();
    let dx = fx as f32 * speed;
    let dy = fy as f32 * speed;
    let nx = enemy.x + dx;
    let ny = enemy.y + dy;

    // Probe ahead of the sprite centre in the direction of travel
    let (cx, cy) = geo.sprite_center(nx, ny);
    let probe = geo.cell_at(cx + sign(dx) * geo.probe_x, cy + sign(dy) * geo.probe_y);

    if map.cell_open(probe) {
        enemy.x = nx;
        enemy.y = ny;
        return true;
    }

    let here = geo.sprite_cell(enemy.x, enemy.y);
    if let Some(f) = pick_facing(&map.open_directions(here), rng) {
        enemy.facing = f;
    }
    enemy.state = EnemyState::Patrol;
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::{Axis, Cell, GridDims, Partition};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const DIMS: GridDims = GridDims::new(9, 7);

    fn enemy_at(c: Cell, facing: Facing) -> Enemy {
        let g = Geometry::for_tile(64.0);
        let (x, y) = g.sprite_origin(c);
        Enemy::new(0, x, y, facing, 1.5)
    }

    // ── Perception ──

    #[test]
    fn patrol_acquires_chase() {
        let p = perceive(EnemyState::Patrol, Facing::Up, Some(Facing::Left));
        assert_eq!(p.state, EnemyState::Chase);
        assert_eq!(p.facing, Facing::Left);
        assert!(p.acquired);
    }

    #[test]
    fn chase_keeps_chasing_without_reacquire() {
        let p = perceive(EnemyState::Chase, Facing::Left, Some(Facing::Left));
        assert_eq!(p.state, EnemyState::Chase);
        assert!(!p.acquired);
    }

    #[test]
    fn chase_drops_immediately() {
        let p = perceive(EnemyState::Chase, Facing::Left, None);
        assert_eq!(p.state, EnemyState::Patrol);
        assert_eq!(p.facing, Facing::Left);
        assert!(p.lost);
    }

    #[test]
    fn stunned_ignores_sight() {
        let p = perceive(EnemyState::Stunned, Facing::Down, Some(Facing::Up));
        assert_eq!(p.state, EnemyState::Stunned);
        assert_eq!(p.facing, Facing::Down);
    }

    // ── Speed ──

    #[test]
    fn chase_is_faster() {
        let mut e = enemy_at(Cell::new(1, 1), Facing::Right);
        assert_eq!(move_speed(&e, 1.3), 1.5);
        e.state = EnemyState::Chase;
        assert!((move_speed(&e, 1.3) - 1.95).abs() < 1e-5);
    }

    // ── Steering ──

    #[test]
    fn steer_advances_in_open_corridor() {
        let g = Geometry::for_tile(64.0);
        let m = MapView { dims: DIMS, partitions: &[], bombs: &[] };
        let mut rng = Pcg32::seed_from_u64(1);
        let mut e = enemy_at(Cell::new(1, 1), Facing::Right);
        let x0 = e.x;
        assert!(steer(&mut e, &m, &g, 1.0, 1.3, &mut rng));
        assert!((e.x - (x0 + 1.5)).abs() < 1e-5);
        assert_eq!(e.facing, Facing::Right);
    }

    #[test]
    fn steer_recentres_on_lane() {
        let g = Geometry::for_tile(64.0);
        let m = MapView { dims: DIMS, partitions: &[], bombs: &[] };
        let mut rng = Pcg32::seed_from_u64(1);
        let mut e = enemy_at(Cell::new(3, 1), Facing::Right);
        let lane = e.y;
        e.y += 6.0;
        steer(&mut e, &m, &g, 1.0, 1.3, &mut rng);
        assert!((e.y - (lane + 3.5)).abs() < 1e-5);
    }

    #[test]
    fn steer_turns_at_partition() {
        let g = Geometry::for_tile(64.0);
        let parts = [Partition { cell: Cell::new(2, 1), axis: Axis::Vertical }];
        let m = MapView { dims: DIMS, partitions: &parts, bombs: &[] };
        let mut rng = Pcg32::seed_from_u64(7);
        let mut e = enemy_at(Cell::new(1, 1), Facing::Right);
        e.state = EnemyState::Chase;
        // Walk until the probe hits the partition
        let mut bumped = false;
        for _ in 0..40 {
            if !steer(&mut e, &m, &g, 1.0, 1.3, &mut rng) {
                bumped = true;
                break;
            }
        }
        assert!(bumped);
        // (1,1) only opens downward
        assert_eq!(e.facing, Facing::Down);
        assert_eq!(e.state, EnemyState::Patrol);
        assert_eq!(g.sprite_cell(e.x, e.y), Cell::new(1, 1));
    }

    #[test]
    fn pick_facing_empty() {
        let mut rng = Pcg32::seed_from_u64(3);
        assert_eq!(pick_facing(&[], &mut rng), None);
        assert_eq!(pick_facing(&[Facing::Up], &mut rng), Some(Facing::Up));
    }
}
