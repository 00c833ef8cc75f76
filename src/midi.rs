// src/midi.rs

use crate::audio_engine::AudioCommand;
use crate::params::{ControllableParameter, EngineParams};
use anyhow::Result;
use midir::{Ignore, MidiInput, MidiInputConnection, MidiInputPort};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc::Sender, Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const APP_NAME: &str = "Loopdeck";

const DEBOUNCE_DURATION: Duration = Duration::from_millis(50);
const LONG_PRESS_DURATION: Duration = Duration::from_millis(500);
const HOLD_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// Note and CC assignments for one controller, taken from the settings file.
#[derive(Debug, Clone)]
pub struct MidiConfig {
    pub channel: u8,
    pub record_note: u8,
    pub play_note: u8,
    pub cc_map: BTreeMap<u8, ControllableParameter>,
}

pub fn get_midi_ports() -> Result<Vec<(String, MidiInputPort)>> {
    let midi_in = MidiInput::new(APP_NAME)?;
    let ports = midi_in.ports();
    let mut result = Vec::with_capacity(ports.len());
    for port in ports.iter() {
        let name = midi_in.port_name(port)?;
        result.push((name, port.clone()));
    }
    Ok(result)
}

/// Opens the port and spawns the hold-watch timer. The returned connection
/// and handle must be kept alive for the duration of the session.
pub fn connect_midi(
    command_sender: Sender<AudioCommand>,
    params: EngineParams,
    port: MidiInputPort,
    port_name: String,
    config: MidiConfig,
    should_exit: Arc<AtomicBool>,
) -> Result<(MidiInputConnection<()>, JoinHandle<()>)> {
    let mut midi_in = MidiInput::new(APP_NAME)?;
    midi_in.ignore(Ignore::None);

    let in_port_name = midi_in.port_name(&port)?;
    println!("Opening MIDI connection to: {}", in_port_name);

    // Record-button press time, shared with the timer thread. A hold past
    // LONG_PRESS_DURATION clears the loop; the timer removes the entry so
    // the clear fires once per hold.
    let held_record = Arc::new(RwLock::new(Option::<Instant>::None));

    let held_record_clone = held_record.clone();
    let command_sender_clone = command_sender.clone();
    let timer_handle = thread::spawn(move || {
        while !should_exit.load(Ordering::Relaxed) {
            thread::sleep(HOLD_CHECK_INTERVAL);
            let expired = held_record_clone
                .read()
                .map(|held| matches!(*held, Some(t) if t.elapsed() >= LONG_PRESS_DURATION))
                .unwrap_or(false);
            if expired {
                command_sender_clone.send(AudioCommand::ClearLoop).ok();
                if let Ok(mut held) = held_record_clone.write() {
                    *held = None;
                }
            }
        }
        println!("MIDI timer thread for '{}' exited gracefully.", in_port_name);
    });

    let mut last_press_times: BTreeMap<u8, Instant> = BTreeMap::new();

    let conn_out = match midi_in.connect(
        &port,
        &format!("loopdeck-midi-in-{}", port_name),
        move |_stamp, message, _| {
            if message.len() < 3 {
                return;
            }
            let status = message[0] & 0xF0;
            let channel = message[0] & 0x0F;
            if channel != config.channel {
                return;
            }

            match status {
                0x90 | 0x80 => {
                    let note = message[1];
                    let velocity = message[2];
                    let is_note_on = status == 0x90 && velocity > 0;

                    if note == config.record_note {
                        if is_note_on {
                            let now = Instant::now();
                            let last_press = last_press_times.entry(note).or_insert_with(|| {
                                now.checked_sub(DEBOUNCE_DURATION * 2).unwrap_or(now)
                            });
                            if now.duration_since(*last_press) > DEBOUNCE_DURATION {
                                command_sender.send(AudioCommand::ToggleRecord).ok();
                                *last_press = now;
                            }
                            if let Ok(mut held) = held_record.write() {
                                held.get_or_insert(Instant::now());
                            }
                        } else if let Ok(mut held) = held_record.write() {
                            *held = None;
                        }
                    } else if note == config.play_note && is_note_on {
                        let now = Instant::now();
                        let last_press = last_press_times.entry(note).or_insert_with(|| {
                            now.checked_sub(DEBOUNCE_DURATION * 2).unwrap_or(now)
                        });
                        if now.duration_since(*last_press) > DEBOUNCE_DURATION {
                            command_sender.send(AudioCommand::TogglePlay).ok();
                            *last_press = now;
                        }
                    }
                }
                0xB0 => {
                    let cc = message[1];
                    let value = message[2];
                    if let Some(&param) = config.cc_map.get(&cc) {
                        params.set_normalized(param, value as f32 / 127.0);
                    }
                }
                _ => {}
            }
        },
        (),
    ) {
        Ok(conn) => conn,
        Err(e) => return Err(anyhow::anyhow!("Failed to connect to MIDI port: {}", e)),
    };

    println!("Connection open to {}. Enjoy!", port_name);
    Ok((conn_out, timer_handle))
}
