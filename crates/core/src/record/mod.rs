use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{ClickTrack, MetronomeError, Result};

/// Configuration options for writing rendered audio to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSettings {
    pub output_path: PathBuf,
    /// 16 or 32; 32 writes IEEE float samples.
    pub bits_per_sample: u16,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("click.wav"),
            bits_per_sample: 16,
        }
    }
}

/// Writes click tracks as mono WAV files.
#[derive(Debug, Default)]
pub struct Recorder {
    settings: RecordingSettings,
}

impl Recorder {
    pub fn new(settings: RecordingSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RecordingSettings {
        &self.settings
    }

    pub fn write(&self, track: &ClickTrack) -> Result<()> {
        let float = match self.settings.bits_per_sample {
            16 => false,
            32 => true,
            other => {
                return Err(MetronomeError::msg(format!(
                    "unsupported bit depth {other}, expected 16 or 32"
                )))
            }
        };

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: track.sample_rate,
            bits_per_sample: self.settings.bits_per_sample,
            sample_format: if float {
                hound::SampleFormat::Float
            } else {
                hound::SampleFormat::Int
            },
        };

        let mut writer = hound::WavWriter::create(&self.settings.output_path, spec)
            .map_err(|err| MetronomeError::msg(format!("cannot create wav file: {err}")))?;
        for sample in &track.samples {
            let sample = sample.clamp(-1.0, 1.0);
            let written = if float {
                writer.write_sample(sample)
            } else {
                writer.write_sample((sample * i16::MAX as f32) as i16)
            };
            written.map_err(|err| MetronomeError::msg(format!("cannot write wav sample: {err}")))?;
        }
        writer
            .finalize()
            .map_err(|err| MetronomeError::msg(format!("cannot finalize wav file: {err}")))?;

        tracing::info!(
            path = ?self.settings.output_path,
            frames = track.samples.len(),
            "click track written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::decode_wav;

    fn track() -> ClickTrack {
        ClickTrack {
            samples: vec![0.0, 0.5, -0.5, 2.0],
            sample_rate: 8_000,
            beat_times: vec![0.0],
            blocks: 1,
        }
    }

    #[test]
    fn written_file_decodes_back() {
        let path =
            std::env::temp_dir().join(format!("metronome-record-{}.wav", std::process::id()));
        let recorder = Recorder::new(RecordingSettings {
            output_path: path.clone(),
            bits_per_sample: 32,
        });

        recorder.write(&track()).unwrap();
        let decoded = decode_wav(&std::fs::read(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(decoded.sample_rate(), 8_000);
        assert_eq!(decoded.samples(), &[0.0, 0.5, -0.5, 1.0]);
    }

    #[test]
    fn rejects_unsupported_bit_depth() {
        let recorder = Recorder::new(RecordingSettings {
            output_path: PathBuf::from("unused.wav"),
            bits_per_sample: 24,
        });

        let err = recorder.write(&track()).unwrap_err();
        assert!(format!("{err}").contains("24"));
    }
}
