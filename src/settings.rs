// src/settings.rs

use crate::params::ControllableParameter;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct AppSettings {
    pub host_name: Option<String>,
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub sample_rate: Option<u32>,
    pub buffer_size: Option<u32>,
    pub input_latency_compensation_ms: f32,
    pub midi_port_name: Option<String>,
    pub midi_channel: u8,
    pub record_note: u8,
    pub play_note: u8,
    pub cc_map: BTreeMap<u8, ControllableParameter>,
    pub max_loop_seconds: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        let mut cc_map = BTreeMap::new();
        cc_map.insert(1, ControllableParameter::DryWet);
        cc_map.insert(7, ControllableParameter::MasterVolume);
        cc_map.insert(16, ControllableParameter::InputGain);
        Self {
            host_name: None,
            input_device: None,
            output_device: None,
            sample_rate: None,
            buffer_size: None,
            input_latency_compensation_ms: 5.0, // Default to 5ms safety buffer
            midi_port_name: None,
            midi_channel: 0,
            record_note: 60,
            play_note: 62,
            cc_map,
            max_loop_seconds: 300,
        }
    }
}

pub fn get_config_dir() -> Option<PathBuf> {
    let Some(proj_dirs) = ProjectDirs::from("", "", "Loopdeck") else {
        eprintln!("Could not determine a configuration directory.");
        return None;
    };
    let config_dir = proj_dirs.config_dir().to_path_buf();

    for dir in [&config_dir, &config_dir.join("Loops")] {
        if !dir.exists() {
            if let Err(e) = fs::create_dir_all(dir) {
                eprintln!("Failed to create directory at {}: {}", dir.display(), e);
                return None;
            }
        }
    }
    Some(config_dir)
}

/// Default destination for exported loop WAVs.
pub fn get_loops_dir() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("Loops"))
}

pub fn save_settings(settings: &AppSettings) {
    if let Some(dir) = get_config_dir() {
        let path = dir.join("settings.json");
        match serde_json::to_string_pretty(settings) {
            Ok(json_string) => {
                if let Err(e) = fs::write(&path, json_string) {
                    eprintln!("Failed to write settings to {}: {}", path.display(), e);
                }
            }
            Err(e) => {
                eprintln!("Failed to serialize settings: {}", e);
            }
        }
    }
}

pub fn load_settings() -> AppSettings {
    if let Some(dir) = get_config_dir() {
        let path = dir.join("settings.json");
        if path.exists() {
            return match fs::read_to_string(&path) {
                Ok(json_string) => match serde_json::from_str(&json_string) {
                    Ok(settings) => settings,
                    Err(e) => {
                        eprintln!("Failed to parse settings file, using defaults. Error: {}", e);
                        AppSettings::default()
                    }
                },
                Err(e) => {
                    eprintln!("Failed to read settings file, using defaults. Error: {}", e);
                    AppSettings::default()
                }
            };
        }
    }
    AppSettings::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_standard_cc_layout() {
        let settings = AppSettings::default();
        assert_eq!(settings.record_note, 60);
        assert_eq!(settings.play_note, 62);
        assert_eq!(settings.cc_map.get(&1), Some(&ControllableParameter::DryWet));
        assert_eq!(
            settings.cc_map.get(&7),
            Some(&ControllableParameter::MasterVolume)
        );
        assert_eq!(
            settings.cc_map.get(&16),
            Some(&ControllableParameter::InputGain)
        );
    }

    #[test]
    fn partial_settings_files_fill_in_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{ "midi_channel": 9, "max_loop_seconds": 30 }"#).unwrap();
        assert_eq!(settings.midi_channel, 9);
        assert_eq!(settings.max_loop_seconds, 30);
        assert_eq!(settings.record_note, 60);
        assert!((settings.input_latency_compensation_ms - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn settings_round_trip_through_json() {
        let mut settings = AppSettings::default();
        settings.sample_rate = Some(44100);
        settings.midi_port_name = Some("Test Port".to_string());

        let json = serde_json::to_string_pretty(&settings).unwrap();
        let restored: AppSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.sample_rate, Some(44100));
        assert_eq!(restored.midi_port_name.as_deref(), Some("Test Port"));
        assert_eq!(restored.cc_map, settings.cc_map);
    }
}
