// src/audio_engine.rs

mod command;
mod helpers;
mod loop_track;

pub use command::AudioCommand;
pub use loop_track::LoopTrack;

use crate::looper::SharedLooperState;
use crate::params::{ControllableParameter, EngineParams, ParamSmoother, PARAM_SCALER};
use ringbuf::HeapConsumer;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;

/// The audio-thread side of the application: owns the loop track, drains
/// control commands at the top of every callback, and runs the per-sample
/// processing loop.
pub struct AudioEngine {
    command_consumer: HeapConsumer<AudioCommand>,
    pub input_consumer: HeapConsumer<f32>,
    track: LoopTrack,
    shared_state: SharedLooperState,
    params: EngineParams,
    dry_wet_smoother: ParamSmoother,
    input_gain_smoother: ParamSmoother,
    master_volume_smoother: ParamSmoother,
    sample_rate: f32,
    pub input_latency_compensation_ms: Arc<AtomicU32>,
    input_peak_meter: Arc<AtomicU32>,
    output_peak_meter: Arc<AtomicU32>,
    output_buffer: Vec<f32>,
}

impl AudioEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        command_consumer: HeapConsumer<AudioCommand>,
        input_consumer: HeapConsumer<f32>,
        sample_rate: f32,
        max_loop_samples: usize,
        params: EngineParams,
        input_peak_meter: Arc<AtomicU32>,
        output_peak_meter: Arc<AtomicU32>,
        input_latency_compensation_ms: Arc<AtomicU32>,
    ) -> (Self, SharedLooperState) {
        let shared_state = SharedLooperState::new();

        let dry_wet = params.get(ControllableParameter::DryWet);
        let input_gain = params.get(ControllableParameter::InputGain);
        let master_volume = params.get(ControllableParameter::MasterVolume);

        let engine = Self {
            command_consumer,
            input_consumer,
            track: LoopTrack::new(max_loop_samples),
            shared_state: shared_state.clone(),
            params,
            dry_wet_smoother: ParamSmoother::new(dry_wet),
            input_gain_smoother: ParamSmoother::new(input_gain),
            master_volume_smoother: ParamSmoother::new(master_volume),
            sample_rate,
            input_latency_compensation_ms,
            input_peak_meter,
            output_peak_meter,
            output_buffer: Vec::new(),
        };

        (engine, shared_state)
    }

    pub fn handle_commands(&mut self) {
        while let Some(command) = self.command_consumer.pop() {
            match command {
                AudioCommand::ToggleRecord => self.track.toggle_record(),
                AudioCommand::TogglePlay => self.track.toggle_play(),
                AudioCommand::ClearLoop => self.track.reset(),
                AudioCommand::SaveLoopAudio { output_path } => {
                    let audio_data = self.track.snapshot();
                    if audio_data.is_empty() {
                        println!("Loop is empty. Nothing to save.");
                        continue;
                    }
                    let sample_rate = self.sample_rate;
                    thread::spawn(move || {
                        if let Err(e) =
                            helpers::write_wav_file(&output_path, &audio_data, sample_rate)
                        {
                            eprintln!("Failed to save loop: {}", e);
                        } else {
                            println!("Loop saved to {}", output_path.display());
                        }
                    });
                }
                AudioCommand::LoadLoopAudio { path } => {
                    match helpers::read_wav_file(&path, self.sample_rate) {
                        Ok(audio_data) => {
                            self.track.load(&audio_data);
                            println!(
                                "Loaded {} samples from {}",
                                self.track.loop_len(),
                                path.display()
                            );
                        }
                        Err(e) => eprintln!("Failed to load loop {}: {}", path.display(), e),
                    }
                }
            }
        }
        self.publish_state();
    }

    pub fn process_buffer(&mut self, mic_buffer: &[f32]) -> &[f32] {
        let num_samples = mic_buffer.len();
        if self.output_buffer.len() != num_samples {
            self.output_buffer.resize(num_samples, 0.0);
        }

        let target_dry_wet = self.params.get(ControllableParameter::DryWet);
        let target_input_gain = self.params.get(ControllableParameter::InputGain);
        let target_master = self.params.get(ControllableParameter::MasterVolume);

        let mut input_peak = 0.0f32;
        let mut output_peak = 0.0f32;

        for (i, &sample) in mic_buffer.iter().enumerate() {
            let dry_wet = self.dry_wet_smoother.next(target_dry_wet);
            let input_gain = self.input_gain_smoother.next(target_input_gain);
            let master = self.master_volume_smoother.next(target_master);

            let input = sample * input_gain;
            input_peak = input_peak.max(input.abs());

            let out = self.track.process_sample(input, dry_wet) * master;
            output_peak = output_peak.max(out.abs());
            self.output_buffer[i] = out;
        }

        self.input_peak_meter
            .store((input_peak * PARAM_SCALER) as u32, Ordering::Relaxed);
        self.output_peak_meter
            .store((output_peak * PARAM_SCALER) as u32, Ordering::Relaxed);
        self.publish_state();

        &self.output_buffer
    }

    fn publish_state(&self) {
        self.shared_state.set(self.track.state());
        self.shared_state.set_loop_len(self.track.current_len());
        self.shared_state.set_playhead(self.track.write_pos());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::looper::LooperState;
    use ringbuf::HeapRb;

    fn test_engine(max_loop_samples: usize) -> (ringbuf::HeapProducer<AudioCommand>, AudioEngine) {
        let command_rb = HeapRb::<AudioCommand>::new(16);
        let (command_producer, command_consumer) = command_rb.split();
        let audio_rb = HeapRb::<f32>::new(16);
        let (_audio_producer, audio_consumer) = audio_rb.split();

        let (engine, _shared) = AudioEngine::new(
            command_consumer,
            audio_consumer,
            48000.0,
            max_loop_samples,
            EngineParams::default(),
            Arc::new(AtomicU32::new(0)),
            Arc::new(AtomicU32::new(0)),
            Arc::new(AtomicU32::new(0)),
        );
        (command_producer, engine)
    }

    #[test]
    fn commands_drive_the_track_through_the_ring() {
        let (mut producer, mut engine) = test_engine(1024);
        let shared = engine.shared_state.clone();

        producer.push(AudioCommand::ToggleRecord).unwrap();
        engine.handle_commands();
        assert_eq!(shared.get(), LooperState::Recording);

        let input = vec![0.5; 64];
        engine.process_buffer(&input);

        producer.push(AudioCommand::ToggleRecord).unwrap();
        engine.handle_commands();
        assert_eq!(shared.get(), LooperState::Playing);
        assert_eq!(shared.get_loop_len(), 64);

        producer.push(AudioCommand::ClearLoop).unwrap();
        engine.handle_commands();
        assert_eq!(shared.get(), LooperState::Empty);
        assert_eq!(shared.get_loop_len(), 0);
    }

    #[test]
    fn playback_repeats_the_captured_buffer() {
        let (mut producer, mut engine) = test_engine(4096);
        // Force fully wet mix and unity gains so output equals loop content.
        engine.params.set(ControllableParameter::DryWet, 1.0);
        engine.dry_wet_smoother = ParamSmoother::new(1.0);

        producer.push(AudioCommand::ToggleRecord).unwrap();
        engine.handle_commands();

        let captured: Vec<f32> = (0..32).map(|i| i as f32 / 64.0).collect();
        engine.process_buffer(&captured);

        producer.push(AudioCommand::ToggleRecord).unwrap();
        engine.handle_commands();

        let silence = vec![0.0; 32];
        let output = engine.process_buffer(&silence).to_vec();
        for (out, orig) in output.iter().zip(captured.iter()) {
            // Recorded content is the 50/50 blend of input over silence.
            assert!((out - orig * 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn playhead_mirror_tracks_the_audio_thread() {
        let (mut producer, mut engine) = test_engine(4096);
        let shared = engine.shared_state.clone();

        producer.push(AudioCommand::ToggleRecord).unwrap();
        engine.handle_commands();
        engine.process_buffer(&vec![0.1; 100]);
        producer.push(AudioCommand::ToggleRecord).unwrap();
        engine.handle_commands();

        engine.process_buffer(&vec![0.0; 30]);
        assert_eq!(shared.get_playhead(), 30);
        assert_eq!(shared.get_loop_len(), 100);
    }
}
