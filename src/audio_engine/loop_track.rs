// FILE: src\audio_engine\loop_track.rs
// ====================================

use crate::looper::LooperState;

/// Single-track circular looper. The first recording pass sets the loop
/// length; later passes overdub into the captured region. Owns all of its
/// state so it can be driven (and tested) without any audio hardware.
///
/// Every method is O(1) per call and allocation-free; the buffer is
/// allocated once in `new`.
pub struct LoopTrack {
    buffer: Vec<f32>,
    write_pos: usize,
    loop_len: usize,
    recorded_len: usize,
    recording: bool,
    playing: bool,
    first_pass: bool,
}

impl LoopTrack {
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            buffer: vec![0.0; max_size],
            write_pos: 0,
            loop_len: max_size,
            recorded_len: 0,
            recording: false,
            playing: false,
            first_pass: true,
        }
    }

    pub fn max_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn loop_len(&self) -> usize {
        self.loop_len
    }

    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_first_pass(&self) -> bool {
        self.first_pass
    }

    /// Loop length as the control surface should report it: the captured
    /// length once the loop exists, the in-progress sample count while the
    /// first pass is still open.
    pub fn current_len(&self) -> usize {
        if self.first_pass {
            self.recorded_len
        } else {
            self.loop_len
        }
    }

    pub fn state(&self) -> LooperState {
        if self.first_pass {
            if self.recording {
                LooperState::Recording
            } else {
                LooperState::Empty
            }
        } else if self.recording {
            LooperState::Overdubbing
        } else if self.playing {
            LooperState::Playing
        } else {
            LooperState::Stopped
        }
    }

    /// Clears all captured audio and returns to the empty state.
    pub fn reset(&mut self) {
        self.playing = false;
        self.recording = false;
        self.first_pass = true;
        self.write_pos = 0;
        self.recorded_len = 0;
        self.buffer.fill(0.0);
        self.loop_len = self.buffer.len();
    }

    /// Flips recording. Entering recording on an empty track also starts
    /// playback; leaving the first pass freezes the loop length at the
    /// recorded sample count.
    pub fn toggle_record(&mut self) {
        if self.first_pass {
            if self.recording {
                self.finalize_first_pass();
            } else {
                self.playing = true;
            }
        }
        self.recording = !self.recording;
    }

    /// Flips playback. A track that has never captured anything has nothing
    /// to play, so the call is a no-op there.
    pub fn toggle_play(&mut self) {
        if self.first_pass && self.recorded_len == 0 {
            return;
        }
        self.playing = !self.playing;
    }

    /// Processes one input sample and returns the output sample. Reads at
    /// the pre-advance position so playback reflects the last finalized
    /// sample, not the one about to be overwritten.
    pub fn process_sample(&mut self, input: f32, dry_wet: f32) -> f32 {
        if self.recording {
            let slot = &mut self.buffer[self.write_pos];
            *slot = *slot * 0.5 + input * 0.5;
            if self.first_pass {
                self.recorded_len += 1;
            }
        }

        let mut output = self.buffer[self.write_pos];

        // Hard capacity limit: close the pass here instead of letting the
        // recording run off the end of the buffer.
        if self.first_pass && self.recorded_len >= self.buffer.len() {
            self.finalize_first_pass();
        }

        if self.playing {
            self.write_pos = (self.write_pos + 1) % self.loop_len;
        }

        if !self.recording {
            output = output * dry_wet + input * (1.0 - dry_wet);
        }

        output
    }

    /// Replaces the loop with already-captured audio (a loaded WAV). The
    /// imported length becomes the loop length, capped at capacity, and
    /// playback starts from the top.
    pub fn load(&mut self, samples: &[f32]) {
        self.reset();
        let len = samples.len().min(self.buffer.len());
        if len == 0 {
            return;
        }
        self.buffer[..len].copy_from_slice(&samples[..len]);
        self.loop_len = len;
        self.first_pass = false;
        self.playing = true;
    }

    /// Copy of the captured loop region, empty until a first pass has
    /// completed.
    pub fn snapshot(&self) -> Vec<f32> {
        if self.first_pass {
            Vec::new()
        } else {
            self.buffer[..self.loop_len].to_vec()
        }
    }

    fn finalize_first_pass(&mut self) {
        if self.recorded_len == 0 {
            // Nothing was captured; drop back to the empty state rather
            // than freeze a zero-length loop.
            self.playing = false;
            return;
        }
        self.loop_len = self.recorded_len;
        self.recorded_len = 0;
        self.first_pass = false;
        // The pass leaves the position one past the captured region; wrap
        // it so playback restarts at the top of the loop.
        self.write_pos %= self.loop_len;
    }
}
