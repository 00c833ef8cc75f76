// FILE: src\audio_engine\helpers.rs
// =================================

use anyhow::Result;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub fn write_wav_file(path: &Path, audio_buffer: &[f32], sample_rate: f32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sample_rate as u32,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in audio_buffer {
        let amplitude = i16::MAX as f32;
        writer.write_sample((sample * amplitude) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

pub fn read_wav_file(path: &Path, expected_sample_rate: f32) -> Result<Vec<f32>> {
    let file = BufReader::new(File::open(path)?);
    let reader = hound::WavReader::new(file)?;
    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(anyhow::anyhow!("Expected mono WAV file for loop audio"));
    }
    if spec.sample_rate != expected_sample_rate as u32 {
        return Err(anyhow::anyhow!(
            "Loop WAV is {} Hz but the engine is running at {} Hz",
            spec.sample_rate,
            expected_sample_rate as u32
        ));
    }

    Ok(reader
        .into_samples::<i16>()
        .filter_map(Result::ok)
        .map(|s| s as f32 / i16::MAX as f32)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn wav_round_trip_preserves_samples() {
        let path = env::temp_dir().join("loopdeck_helpers_round_trip.wav");
        let original: Vec<f32> = (0..480).map(|i| (i as f32 / 480.0) - 0.5).collect();

        write_wav_file(&path, &original, 48000.0).unwrap();
        let loaded = read_wav_file(&path, 48000.0).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.len(), original.len());
        // 16-bit quantization: within one LSB of the original.
        for (a, b) in original.iter().zip(loaded.iter()) {
            assert!((a - b).abs() < 2.0 / i16::MAX as f32);
        }
    }

    #[test]
    fn sample_rate_mismatch_is_rejected() {
        let path = env::temp_dir().join("loopdeck_helpers_rate_mismatch.wav");
        write_wav_file(&path, &[0.0; 10], 44100.0).unwrap();

        let result = read_wav_file(&path, 48000.0);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }
}
