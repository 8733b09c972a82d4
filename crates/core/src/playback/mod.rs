use crate::{AudioContext, GainStage, PlaybackRequest, SampleBuffer};

/// Schedules one-shot sample playback on the audio clock. Every trigger
/// becomes its own voice; all voices share the context's gain stage.
#[derive(Debug, Clone)]
pub struct PlaybackEngine {
    context: AudioContext,
}

impl PlaybackEngine {
    pub fn new(context: AudioContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    pub fn gain(&self) -> &GainStage {
        self.context.gain()
    }

    /// Maps a 0..=100 volume onto the shared gain. Applies to sounds that are
    /// already playing as well as future ones.
    pub fn set_volume(&self, volume: u32) {
        let gain = volume.min(100) as f32 / 100.0;
        self.gain().set(gain);
        tracing::debug!(volume, gain, "volume changed");
    }

    /// Plays `buffer` at the absolute clock time `at_time`. With `stop_after`
    /// the voice is cut `stop_after` seconds after it starts.
    pub fn trigger(
        &self,
        buffer: &SampleBuffer,
        at_time: f64,
        rate: f64,
        stop_after: Option<f64>,
    ) {
        let request = PlaybackRequest {
            buffer: buffer.clone(),
            start_time: at_time,
            playback_rate: rate,
            stop_time: stop_after.map(|secs| at_time + secs),
        };

        if let Err(err) = self.context.submit(request) {
            tracing::error!(%err, at_time, "playback triggered without a renderer");
        }
    }

    /// Plays `buffer` at its native pitch with no stop horizon.
    pub fn trigger_at(&self, buffer: &SampleBuffer, at_time: f64) {
        self.trigger(buffer, at_time, 1.0, None);
    }
}
