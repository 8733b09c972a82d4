use crate::{
    config::AppConfig, AudioContext, BeatScheduler, PlaybackEngine, Result, SampleBuffer,
};

/// Result of an offline metronome run.
#[derive(Debug, Clone)]
pub struct ClickTrack {
    /// Mono output, `sample_rate` frames per second.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Every beat the scheduler committed, in clock seconds.
    pub beat_times: Vec<f64>,
    /// Number of audio blocks the renderer produced.
    pub blocks: usize,
}

/// Offline renderer that runs the live scheduling path against a simulated
/// clock. Audio is produced in blocks of `audio.block_size` frames and the
/// scheduler runs once at least a tick interval of audio has elapsed.
#[derive(Debug, Clone)]
pub struct ClickTrackRenderer {
    sample_rate: u32,
    tick_frames: usize,
    block_frames: usize,
    schedule_ahead: f64,
    volume: u32,
}

impl ClickTrackRenderer {
    pub fn new(config: &AppConfig) -> Self {
        let sample_rate = config.audio.sample_rate.max(1);
        let tick_frames =
            (sample_rate as u64 * config.scheduler.tick_interval_ms / 1_000).max(1) as usize;

        Self {
            sample_rate,
            tick_frames,
            block_frames: config.audio.block_size.clamp(1, tick_frames),
            schedule_ahead: config.scheduler.schedule_ahead_secs,
            volume: config.volume,
        }
    }

    pub fn with_volume(mut self, volume: u32) -> Self {
        self.volume = volume;
        self
    }

    pub fn render(
        &self,
        click: &SampleBuffer,
        tempo_bpm: u32,
        seconds: f64,
    ) -> Result<ClickTrack> {
        let (context, mut renderer) = AudioContext::new(self.sample_rate);
        let engine = PlaybackEngine::new(context.clone());
        engine.set_volume(self.volume);
        context.resume()?;

        let total = (seconds.max(0.0) * self.sample_rate as f64).round() as usize;
        let mut samples = vec![0.0; total];
        let mut beat_times = Vec::new();

        let mut scheduler = BeatScheduler::new(tempo_bpm, self.schedule_ahead);
        scheduler.start(context.current_time());

        let mut blocks = 0;
        let mut since_tick = self.tick_frames;
        for block in samples.chunks_mut(self.block_frames) {
            if since_tick >= self.tick_frames {
                scheduler.schedule(context.current_time(), |beat_time| {
                    engine.trigger_at(click, beat_time);
                    beat_times.push(beat_time);
                });
                since_tick = 0;
            }
            renderer.render(block, 1);
            since_tick += block.len();
            blocks += 1;
        }

        tracing::info!(
            tempo_bpm,
            seconds,
            beats = beat_times.len(),
            blocks,
            "rendered click track"
        );

        Ok(ClickTrack {
            samples,
            sample_rate: self.sample_rate,
            beat_times,
            blocks,
        })
    }
}
