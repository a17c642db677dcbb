/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and messages;
/// the terminal ones (`GameOver`, `StageComplete`) fire at most once per room.

use crate::domain::grid::Cell;

#[derive(Clone, Debug, PartialEq)]
#[allow(dead_code)]
pub enum GameEvent {
    BombPlaced { id: u32, cell: Cell },
    BombDetonated { id: u32, cell: Cell, cells: usize },
    PartitionDestroyed { cell: Cell },
    ChargeRestored,
    EnemySpotted { id: u32 },
    EnemyLostSight { id: u32 },
    EnemyStunned { id: u32 },
    EnemyRecovered { id: u32 },
    EnemyDestroyed { id: u32, cell: Cell },
    EnemySpawnShortfall { wanted: usize, spawned: usize },
    PlayerKilled,
    RoomEntered { room: u32 },
    RoomCleared { room: u32 },
    GameOver,
    StageComplete { score: u32, elapsed: f32 },
}
