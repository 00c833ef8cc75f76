// src/looper.rs
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LooperState {
    Empty,
    Recording,
    Playing,
    Overdubbing,
    Stopped,
}

impl From<u8> for LooperState {
    fn from(val: u8) -> Self {
        match val {
            0 => LooperState::Empty,
            1 => LooperState::Recording,
            2 => LooperState::Playing,
            3 => LooperState::Overdubbing,
            4 => LooperState::Stopped,
            _ => LooperState::Empty, // Default fallback
        }
    }
}

/// State that is shared between the control and audio threads. The audio
/// thread writes, control threads only read.
#[derive(Clone)]
pub struct SharedLooperState {
    state: Arc<AtomicU8>,
    loop_len: Arc<AtomicUsize>,
    playhead: Arc<AtomicUsize>,
}

impl SharedLooperState {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(LooperState::Empty as u8)),
            loop_len: Arc::new(AtomicUsize::new(0)),
            playhead: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn get(&self) -> LooperState {
        self.state.load(Ordering::Relaxed).into()
    }

    pub fn set(&self, state: LooperState) {
        self.state.store(state as u8, Ordering::Relaxed);
    }

    pub fn get_loop_len(&self) -> usize {
        self.loop_len.load(Ordering::Relaxed)
    }

    pub fn set_loop_len(&self, len: usize) {
        self.loop_len.store(len, Ordering::Relaxed);
    }

    pub fn get_playhead(&self) -> usize {
        self.playhead.load(Ordering::Relaxed)
    }

    pub fn set_playhead(&self, playhead: usize) {
        self.playhead.store(playhead, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_the_atomic() {
        let shared = SharedLooperState::new();
        for state in [
            LooperState::Empty,
            LooperState::Recording,
            LooperState::Playing,
            LooperState::Overdubbing,
            LooperState::Stopped,
        ] {
            shared.set(state);
            assert_eq!(shared.get(), state);
        }
    }

    #[test]
    fn unknown_discriminant_falls_back_to_empty() {
        assert_eq!(LooperState::from(200), LooperState::Empty);
    }
}
