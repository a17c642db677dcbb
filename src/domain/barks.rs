/// Speech barks: short lines shown in bubbles over actors.
///
/// `RecentRing` is the reusable part: it remembers the last few picks and
/// leaves them out of the next draw, so a line never repeats back to back.

use std::collections::VecDeque;

use rand::Rng;

/// How many recent picks are excluded per category.
pub const RECENT_WINDOW: usize = 2;

/// Bubble lifetimes in frames.
pub const BUBBLE_FRAMES: f32 = 90.0;
pub const LAST_WORDS_FRAMES: f32 = 120.0;
pub const START_FRAMES: f32 = 180.0;

/// Chance an enemy says something when it first spots the player.
pub const SPOT_BARK_CHANCE: f64 = 0.3;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BarkKind {
    PlayerStart,
    PlayerBomb,
    PlayerStun,
    PlayerKill,
    EnemyChase,
    EnemyStun,
    EnemyDie,
}

impl BarkKind {
    const COUNT: usize = 7;

    fn slot(self) -> usize {
        self as usize
    }

    pub fn lines(self) -> &'static [&'static str] {
        match self {
            BarkKind::PlayerStart => &["Quiet in here...", "Let's find the way out.", "Nobody panic."],
            BarkKind::PlayerBomb => &["Fire in the hole!", "Stand back!", "Tick tock.", "Special delivery!"],
            BarkKind::PlayerStun => &["Sit tight.", "Seeing stars?", "Nap time!"],
            BarkKind::PlayerKill => &["Cleared!", "Sorry, paper walls.", "That one's done."],
            BarkKind::EnemyChase => &["Intruder!", "Stop right there!", "Found you!", "Over here!"],
            BarkKind::EnemyStun => &["My ears...", "Everything's spinning.", "Ugh..."],
            BarkKind::EnemyDie => &["Not the paper!", "I'll be back...", "Argh!"],
        }
    }
}

/// Ring buffer of recent picks, excluded from the next draw.
#[derive(Clone, Debug)]
pub struct RecentRing {
    recent: VecDeque<usize>,
    window: usize,
}

impl RecentRing {
    pub fn new(window: usize) -> Self {
        RecentRing { recent: VecDeque::with_capacity(window + 1), window }
    }

    /// Pick an index in `0..len`, avoiding the recent window when possible.
    pub fn draw<R: Rng + ?Sized>(&mut self, len: usize, rng: &mut R) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let fresh: Vec<usize> = (0..len).filter(|i| !self.recent.contains(i)).collect();
        let pick = if fresh.is_empty() {
            rng.random_range(0..len)
        } else {
            fresh[rng.random_range(0..fresh.len())]
        };
        self.recent.push_back(pick);
        while self.recent.len() > self.window {
            self.recent.pop_front();
        }
        Some(pick)
    }
}

/// One ring per category.
#[derive(Clone, Debug)]
pub struct BarkBook {
    rings: Vec<RecentRing>,
}

impl BarkBook {
    pub fn new() -> Self {
        BarkBook { rings: vec![RecentRing::new(RECENT_WINDOW); BarkKind::COUNT] }
    }

    pub fn line<R: Rng + ?Sized>(&mut self, kind: BarkKind, rng: &mut R) -> Option<&'static str> {
        let lines = kind.lines();
        let i = self.rings[kind.slot()].draw(lines.len(), rng)?;
        lines.get(i).copied()
    }
}

impl Default for BarkBook {
    fn default() -> Self {
        BarkBook::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn never_repeats_inside_window() {
        let mut rng = Pcg32::seed_from_u64(11);
        let mut ring = RecentRing::new(2);
        let mut history = vec![];
        for _ in 0..200 {
            history.push(ring.draw(4, &mut rng).unwrap_or(99));
        }
        for w in history.windows(3) {
            assert_ne!(w[2], w[1]);
            assert_ne!(w[2], w[0]);
        }
        assert!(history.iter().all(|&i| i < 4));
    }

    #[test]
    fn small_sets_fall_back() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut ring = RecentRing::new(2);
        // Two options, window two: third draw has nothing fresh
        let a = ring.draw(2, &mut rng);
        let b = ring.draw(2, &mut rng);
        assert_ne!(a, b);
        assert!(ring.draw(2, &mut rng).is_some());
        assert_eq!(ring.draw(0, &mut rng), None);
    }

    #[test]
    fn every_category_has_lines() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut book = BarkBook::new();
        for kind in [
            BarkKind::PlayerStart, BarkKind::PlayerBomb, BarkKind::PlayerStun,
            BarkKind::PlayerKill, BarkKind::EnemyChase, BarkKind::EnemyStun,
            BarkKind::EnemyDie,
        ] {
            assert!(kind.lines().len() > RECENT_WINDOW);
            assert!(book.line(kind, &mut rng).is_some());
        }
    }

    #[test]
    fn categories_keep_separate_history() {
        let mut rng = Pcg32::seed_from_u64(8);
        let mut book = BarkBook::new();
        let a = book.line(BarkKind::EnemyChase, &mut rng);
        let b = book.line(BarkKind::EnemyChase, &mut rng);
        assert_ne!(a, b);
        // Another category starts with a clean ring
        assert!(book.line(BarkKind::EnemyDie, &mut rng).is_some());
    }
}
