// src/main.rs

mod audio_engine;
mod audio_io;
mod looper;
mod midi;
mod params;
mod settings;

use crate::audio_engine::{AudioCommand, AudioEngine};
use crate::params::{ControllableParameter, EngineParams, PARAM_SCALER};
use anyhow::Result;
use ringbuf::HeapRb;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

fn main() -> Result<()> {
    let settings = settings::load_settings();

    let sample_rate_hint = settings.sample_rate.unwrap_or(48000);
    let max_loop_samples = (sample_rate_hint as usize) * settings.max_loop_seconds as usize;

    let (mpsc_sender, mpsc_receiver) = mpsc::channel::<AudioCommand>();
    let command_rb = HeapRb::<AudioCommand>::new(256);
    let (mut ringbuf_producer, ringbuf_consumer) = command_rb.split();
    let audio_rb = HeapRb::<f32>::new((sample_rate_hint * 4) as usize);
    let (audio_producer, audio_consumer) = audio_rb.split();

    // Forwarder: control threads send over mpsc, a dedicated thread pushes
    // into the SPSC ring the audio callback drains.
    let _command_thread_handle = thread::spawn(move || {
        while let Ok(command) = mpsc_receiver.recv() {
            if ringbuf_producer.push(command).is_err() {
                eprintln!("Command ringbuffer full. Command dropped.");
            }
        }
    });

    let params = EngineParams::default();
    let input_peak_meter = Arc::new(AtomicU32::new(0));
    let output_peak_meter = Arc::new(AtomicU32::new(0));
    let input_latency_compensation_ms = Arc::new(AtomicU32::new(
        (settings.input_latency_compensation_ms * 100.0) as u32,
    ));
    let xrun_count = Arc::new(AtomicUsize::new(0));

    let (engine, shared_state) = AudioEngine::new(
        ringbuf_consumer,
        audio_consumer,
        sample_rate_hint as f32,
        max_loop_samples,
        params.clone(),
        input_peak_meter.clone(),
        output_peak_meter.clone(),
        input_latency_compensation_ms.clone(),
    );

    let host_id = audio_io::host_id_by_name(settings.host_name.as_deref());
    let (_input_stream, _output_stream, active_sr, active_bs) = audio_io::init_and_run_streams(
        host_id,
        settings.input_device.clone(),
        settings.output_device.clone(),
        settings.sample_rate,
        settings.buffer_size,
        audio_producer,
        engine,
        xrun_count.clone(),
    )?;

    if active_sr != sample_rate_hint {
        println!(
            "Note: device opened at {} Hz (loop capacity was sized for {} Hz)",
            active_sr, sample_rate_hint
        );
    }

    let should_exit = Arc::new(AtomicBool::new(false));
    let midi_config = midi::MidiConfig {
        channel: settings.midi_channel,
        record_note: settings.record_note,
        play_note: settings.play_note,
        cc_map: settings.cc_map.clone(),
    };
    let _midi_connection = match midi::get_midi_ports() {
        Ok(ports) if !ports.is_empty() => {
            let chosen = settings
                .midi_port_name
                .as_ref()
                .and_then(|wanted| ports.iter().find(|(name, _)| name == wanted))
                .or_else(|| ports.first());
            match chosen {
                Some((name, port)) => match midi::connect_midi(
                    mpsc_sender.clone(),
                    params.clone(),
                    port.clone(),
                    name.clone(),
                    midi_config,
                    should_exit.clone(),
                ) {
                    Ok(conn) => Some(conn),
                    Err(e) => {
                        eprintln!("MIDI unavailable: {}", e);
                        None
                    }
                },
                None => None,
            }
        }
        Ok(_) => {
            println!("No MIDI ports found. Console control only.");
            None
        }
        Err(e) => {
            eprintln!("MIDI unavailable: {}", e);
            None
        }
    };

    println!();
    println!("Loopdeck ready at {} Hz / {} samples.", active_sr, active_bs);
    print_help();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let mut parts = line.trim().splitn(2, ' ');
        let cmd = parts.next().unwrap_or("");
        let arg = parts.next().map(str::trim).filter(|s| !s.is_empty());

        match cmd {
            "r" => {
                mpsc_sender.send(AudioCommand::ToggleRecord).ok();
            }
            "p" => {
                mpsc_sender.send(AudioCommand::TogglePlay).ok();
            }
            "c" => {
                mpsc_sender.send(AudioCommand::ClearLoop).ok();
            }
            "w" => {
                let output_path = match arg {
                    Some(path) => PathBuf::from(path),
                    None => default_export_path(),
                };
                mpsc_sender
                    .send(AudioCommand::SaveLoopAudio { output_path })
                    .ok();
            }
            "o" => match arg {
                Some(path) => {
                    mpsc_sender
                        .send(AudioCommand::LoadLoopAudio {
                            path: PathBuf::from(path),
                        })
                        .ok();
                }
                None => println!("Usage: o <path to mono wav>"),
            },
            "s" => {
                let state = shared_state.get();
                let loop_len = shared_state.get_loop_len();
                let playhead = shared_state.get_playhead();
                let in_peak = input_peak_meter.load(Ordering::Relaxed) as f32 / PARAM_SCALER;
                let out_peak = output_peak_meter.load(Ordering::Relaxed) as f32 / PARAM_SCALER;
                println!(
                    "state: {:?} | loop: {} samples ({:.2}s) | playhead: {} | in: {:.3} out: {:.3} | xruns: {}",
                    state,
                    loop_len,
                    loop_len as f32 / active_sr as f32,
                    playhead,
                    in_peak,
                    out_peak,
                    xrun_count.load(Ordering::Relaxed)
                );
                println!(
                    "dry/wet: {:.2} | input gain: {:.2} | master: {:.2}",
                    params.get(ControllableParameter::DryWet),
                    params.get(ControllableParameter::InputGain),
                    params.get(ControllableParameter::MasterVolume)
                );
            }
            "h" | "?" => print_help(),
            "q" => break,
            "" => {}
            other => println!("Unknown command '{}'. Type h for help.", other),
        }
        io::stdout().flush().ok();
    }

    should_exit.store(true, Ordering::Relaxed);
    settings::save_settings(&settings);
    println!("Goodbye.");
    Ok(())
}

fn default_export_path() -> PathBuf {
    let file_name = format!(
        "loop-{}.wav",
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    match settings::get_loops_dir() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  r          toggle record (tap again to close the loop, or to overdub)");
    println!("  p          toggle playback");
    println!("  c          clear the loop");
    println!("  w [path]   write the loop to a wav file");
    println!("  o <path>   load a mono wav into the loop");
    println!("  s          print engine status");
    println!("  q          quit");
}
