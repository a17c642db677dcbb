/// Keyboard input tracker.
///
/// Tracks which keys are held and which were freshly pressed this frame,
/// then answers in terms of `Action`s rather than raw key codes:
///   - movement is level-triggered (held)
///   - bomb / confirm / restart are edge-triggered (fresh press only)
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't
/// report releases.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::FrameInput;
use super::gamepad::GamepadState;

/// After this long without a Press/Repeat, a key counts as released.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Left,
    Right,
    Up,
    Down,
    Bomb,
    Confirm,
    Back,
    Restart,
    Pause,
    Quit,
}

impl Action {
    pub fn keys(self) -> &'static [KeyCode] {
        match self {
            Action::Left => &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')],
            Action::Right => &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')],
            Action::Up => &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')],
            Action::Down => &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')],
            Action::Bomb => &[KeyCode::Char(' '), KeyCode::Char('z'), KeyCode::Char('Z')],
            Action::Confirm => &[KeyCode::Enter],
            Action::Back => &[KeyCode::Esc],
            Action::Restart => &[KeyCode::Char('r'), KeyCode::Char('R')],
            Action::Pause => &[KeyCode::F(1), KeyCode::Char('p'), KeyCode::Char('P')],
            Action::Quit => &[KeyCode::Char('q'), KeyCode::Char('Q')],
        }
    }
}

pub struct InputState {
    /// Last Press/Repeat per key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from released to held during the last drain.
    fresh_presses: Vec<KeyCode>,
    pub raw_events: Vec<KeyEvent>,
    /// Only honour Release events once keyboard enhancement is confirmed.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events. Call once per frame.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            let Ok(Event::Key(key)) = event::read() else { continue };
            self.raw_events.push(key);
            match key.kind {
                KeyEventKind::Release if self.honor_release => {
                    self.last_active.remove(&key.code);
                }
                KeyEventKind::Release => {}
                _ => self.note_press(key.code, Instant::now()),
            }
        }

        self.expire(Instant::now());
    }

    fn note_press(&mut self, code: KeyCode, now: Instant) {
        let was_held = self.held_at(code, now);
        self.last_active.insert(code, now);
        if !was_held {
            self.fresh_presses.push(code);
        }
    }

    fn expire(&mut self, now: Instant) {
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active
            .get(&code)
            .map_or(false, |t| now.duration_since(*t) < HOLD_TIMEOUT)
    }

    // ── Action queries ──

    pub fn held(&self, action: Action) -> bool {
        let now = Instant::now();
        action.keys().iter().any(|&k| self.held_at(k, now))
    }

    pub fn pressed(&self, action: Action) -> bool {
        action.keys().iter().any(|k| self.fresh_presses.contains(k))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        })
    }

    /// Merge keyboard and gamepad into one gameplay frame.
    /// A fresh press also counts as held so a tap always moves.
    pub fn frame_input(&self, pad: &GamepadState) -> FrameInput {
        let dir = |a: Action, pad_held: bool| self.held(a) || self.pressed(a) || pad_held;
        FrameInput::from_held(
            dir(Action::Left, pad.left_held()),
            dir(Action::Right, pad.right_held()),
            dir(Action::Up, pad.up_held()),
            dir(Action::Down, pad.down_held()),
            self.pressed(Action::Bomb) || pad.bomb_pressed(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_press_is_fresh_repeat_is_not() {
        let mut input = InputState::new();
        let t0 = Instant::now();
        input.note_press(KeyCode::Char(' '), t0);
        assert!(input.pressed(Action::Bomb));

        input.fresh_presses.clear();
        input.note_press(KeyCode::Char(' '), t0 + Duration::from_millis(30));
        assert!(!input.pressed(Action::Bomb));
    }

    #[test]
    fn keys_time_out() {
        let mut input = InputState::new();
        let t0 = Instant::now();
        input.note_press(KeyCode::Left, t0);
        assert!(input.held_at(KeyCode::Left, t0 + Duration::from_millis(100)));
        input.expire(t0 + HOLD_TIMEOUT + Duration::from_millis(1));
        assert!(!input.held_at(KeyCode::Left, t0 + HOLD_TIMEOUT));
    }

    #[test]
    fn bindings_do_not_overlap() {
        let all = [
            Action::Left, Action::Right, Action::Up, Action::Down, Action::Bomb,
            Action::Confirm, Action::Back, Action::Restart, Action::Pause, Action::Quit,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert!(a.keys().iter().all(|k| !b.keys().contains(k)), "{a:?} vs {b:?}");
            }
        }
    }
}
