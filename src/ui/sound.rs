/// Sound engine: procedural 8-bit style effects via rodio.
///
/// Every effect is synthesised into an in-memory WAV buffer at start-up
/// and played fire-and-forget through a detached Sink.
///
/// Build without the "sound" feature to compile the silent stub instead.

use crate::sim::event::GameEvent;

/// One entry per distinct effect.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sfx {
    Place,
    Boom,
    Crumble,
    Stun,
    Spot,
    Burn,
    Recharge,
    Die,
    Door,
    Clear,
}

impl Sfx {
    pub const ALL: [Sfx; 10] = [
        Sfx::Place, Sfx::Boom, Sfx::Crumble, Sfx::Stun, Sfx::Spot,
        Sfx::Burn, Sfx::Recharge, Sfx::Die, Sfx::Door, Sfx::Clear,
    ];

    /// Which effect, if any, a simulation event makes.
    pub fn for_event(event: &GameEvent) -> Option<Sfx> {
        match event {
            GameEvent::BombPlaced { .. } => Some(Sfx::Place),
            GameEvent::BombDetonated { .. } => Some(Sfx::Boom),
            GameEvent::PartitionDestroyed { .. } => Some(Sfx::Crumble),
            GameEvent::EnemyStunned { .. } => Some(Sfx::Stun),
            GameEvent::EnemySpotted { .. } => Some(Sfx::Spot),
            GameEvent::EnemyDestroyed { .. } => Some(Sfx::Burn),
            GameEvent::ChargeRestored => Some(Sfx::Recharge),
            GameEvent::PlayerKilled => Some(Sfx::Die),
            GameEvent::RoomCleared { .. } => Some(Sfx::Door),
            GameEvent::StageComplete { .. } => Some(Sfx::Clear),
            _ => None,
        }
    }
}

/// Play each distinct effect in `events` once, in first-seen order.
/// A chain of five explosions in one frame is one boom, not five.
pub fn effects_for(events: &[GameEvent]) -> Vec<Sfx> {
    let mut out: Vec<Sfx> = Vec::new();
    for sfx in events.iter().filter_map(Sfx::for_event) {
        if !out.contains(&sfx) {
            out.push(sfx);
        }
    }
    out
}

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Sfx;

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: Vec<(Sfx, Arc<Vec<u8>>)>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("no audio output, running silent: {e}");
                    return None;
                }
            };
            let buffers = Sfx::ALL
                .iter()
                .map(|&sfx| (sfx, Arc::new(make_wav(&synth(sfx)))))
                .collect();
            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        pub fn play(&self, sfx: Sfx) {
            let Some((_, buf)) = self.buffers.iter().find(|(s, _)| *s == sfx) else { return };
            let Ok(sink) = Sink::try_new(&self.handle) else { return };
            match rodio::Decoder::new(Cursor::new(buf.as_ref().clone())) {
                Ok(src) => {
                    sink.append(src);
                    sink.detach();
                }
                Err(e) => log::debug!("sfx {sfx:?} failed to decode: {e}"),
            }
        }

        /// Countdown pip on the room intro; pitch rises as it nears zero.
        pub fn play_countdown(&self, remaining: u32) {
            let freq = 440.0 + (3u32.saturating_sub(remaining)) as f32 * 220.0;
            let buf = make_wav(&tone(freq, 0.06, 0.25, 1.0));
            if let Ok(sink) = Sink::try_new(&self.handle) {
                if let Ok(src) = rodio::Decoder::new(Cursor::new(buf)) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Synthesis: mono f32 samples
    // ════════════════════════════════════════════════════════════

    fn samples(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// Sine with a fade-out envelope of the given curve.
    fn tone(freq: f32, duration: f32, volume: f32, curve: f32) -> Vec<f32> {
        let n = samples(duration);
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = (1.0 - i as f32 / n as f32).powf(curve);
                (t * freq * TAU).sin() * env * volume
            })
            .collect()
    }

    /// Frequency sweep from `f0` to `f1`, optionally mixed with noise.
    fn sweep(f0: f32, f1: f32, duration: f32, noise: f32, volume: f32) -> Vec<f32> {
        let n = samples(duration);
        let mut lcg: u32 = 0x2545_f491;
        let mut phase = 0.0f32;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                let freq = f0 + (f1 - f0) * p;
                phase += freq / SAMPLE_RATE as f32;
                lcg = lcg.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                let white = (lcg >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
                let wave = (phase * TAU).sin() * (1.0 - noise) + white * noise;
                wave * (1.0 - p).powf(0.8) * volume
            })
            .collect()
    }

    fn arpeggio(notes: &[f32], note_dur: f32, volume: f32) -> Vec<f32> {
        notes.iter().flat_map(|&f| tone(f, note_dur, volume, 0.3)).collect()
    }

    fn synth(sfx: Sfx) -> Vec<f32> {
        match sfx {
            Sfx::Place => tone(220.0, 0.06, 0.3, 2.0),
            Sfx::Boom => sweep(160.0, 40.0, 0.35, 0.75, 0.45),
            Sfx::Crumble => sweep(900.0, 300.0, 0.12, 0.9, 0.2),
            Sfx::Stun => {
                // Wobble: vibrato around 700 Hz
                let n = samples(0.3);
                (0..n)
                    .map(|i| {
                        let t = i as f32 / SAMPLE_RATE as f32;
                        let f = 700.0 + (t * 18.0 * TAU).sin() * 120.0;
                        (t * f * TAU).sin() * (1.0 - i as f32 / n as f32) * 0.2
                    })
                    .collect()
            }
            Sfx::Spot => arpeggio(&[988.0, 1319.0], 0.05, 0.22),
            Sfx::Burn => sweep(500.0, 120.0, 0.25, 0.5, 0.3),
            Sfx::Recharge => tone(1568.0, 0.04, 0.15, 1.0),
            Sfx::Die => arpeggio(&[440.0, 370.0, 311.0, 261.0], 0.12, 0.3),
            Sfx::Door => arpeggio(&[523.0, 784.0], 0.08, 0.25),
            Sfx::Clear => {
                let mut s = arpeggio(&[523.0, 659.0, 784.0, 1047.0], 0.1, 0.3);
                s.extend(tone(1047.0, 0.25, 0.3, 1.0));
                s
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: 16-bit mono PCM
    // ════════════════════════════════════════════════════════════

    fn make_wav(pcm: &[f32]) -> Vec<u8> {
        const CHANNELS: u16 = 1;
        const BITS: u16 = 16;
        let block_align = CHANNELS * BITS / 8;
        let byte_rate = SAMPLE_RATE * block_align as u32;
        let data_len = pcm.len() as u32 * block_align as u32;

        fn chunk(buf: &mut Vec<u8>, tag: &[u8; 4], len: u32) {
            buf.extend_from_slice(tag);
            buf.extend_from_slice(&len.to_le_bytes());
        }

        let mut buf = Vec::with_capacity(44 + data_len as usize);
        chunk(&mut buf, b"RIFF", 36 + data_len);
        buf.extend_from_slice(b"WAVE");
        chunk(&mut buf, b"fmt ", 16);
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&CHANNELS.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&BITS.to_le_bytes());
        chunk(&mut buf, b"data", data_len);
        for &s in pcm {
            let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API: the stub compiles to no-ops when sound is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _sfx: Sfx) {}
    pub fn play_countdown(&self, _remaining: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::Cell;

    #[test]
    fn chain_plays_one_boom() {
        let c = Cell::new(1, 1);
        let events = vec![
            GameEvent::BombDetonated { id: 1, cell: c, cells: 3 },
            GameEvent::PartitionDestroyed { cell: c },
            GameEvent::BombDetonated { id: 2, cell: c, cells: 4 },
            GameEvent::EnemyLostSight { id: 4 },
        ];
        assert_eq!(effects_for(&events), vec![Sfx::Boom, Sfx::Crumble]);
    }

    #[test]
    fn quiet_events_map_to_nothing() {
        assert_eq!(Sfx::for_event(&GameEvent::GameOver), None);
        assert_eq!(Sfx::for_event(&GameEvent::RoomEntered { room: 2 }), None);
        assert_eq!(Sfx::for_event(&GameEvent::PlayerKilled), Some(Sfx::Die));
    }
}
