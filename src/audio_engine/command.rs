// FILE: src\audio_engine\command.rs
// ==================================

use std::path::PathBuf;

/// Control events for the audio thread. Every control surface (MIDI,
/// console) funnels into this one type, and the engine dispatches on it in
/// a single place.
#[derive(Debug)]
pub enum AudioCommand {
    ToggleRecord,
    TogglePlay,
    ClearLoop,
    SaveLoopAudio {
        output_path: PathBuf,
    },
    LoadLoopAudio {
        path: PathBuf,
    },
}
