use crate::{config::TunerConfig, FrequencyTable, PlaybackEngine, Result, SampleBuffer};

/// Plays reference notes by pitch-shifting a single recorded tone.
#[derive(Debug, Clone)]
pub struct TunerController {
    engine: PlaybackEngine,
    frequencies: FrequencyTable,
    reference_hz: f64,
    stop_after: f64,
}

impl TunerController {
    /// Fails when the configured reference note is not in `frequencies`.
    pub fn new(
        engine: PlaybackEngine,
        frequencies: FrequencyTable,
        config: &TunerConfig,
    ) -> Result<Self> {
        let reference_hz = frequencies.frequency(&config.reference_note)?;
        Ok(Self {
            engine,
            frequencies,
            reference_hz,
            stop_after: config.stop_after_secs,
        })
    }

    pub fn reference_hz(&self) -> f64 {
        self.reference_hz
    }

    /// Playback rate that turns the reference recording into `note`.
    pub fn playback_rate(&self, note: &str) -> Result<f64> {
        Ok(self.frequencies.frequency(note)? / self.reference_hz)
    }

    /// Starts `note` immediately and stops it after the configured horizon.
    /// Overlapping calls produce independent voices. Returns the rate used.
    pub fn play(&self, tone: &SampleBuffer, note: &str) -> Result<f64> {
        let rate = self.playback_rate(note).inspect_err(|err| {
            tracing::warn!(note, %err, "ignoring request for an unknown note");
        })?;

        let context = self.engine.context();
        context.resume().inspect_err(|err| {
            tracing::error!(note, %err, "cannot play note");
        })?;

        let now = context.current_time();
        self.engine.trigger(tone, now, rate, Some(self.stop_after));
        tracing::debug!(note, rate, start_time = now, "note triggered");
        Ok(rate)
    }
}
