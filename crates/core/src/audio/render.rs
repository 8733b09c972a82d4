use std::sync::Arc;

use crossbeam_channel::Receiver;

use super::{ClockShared, ContextState, GainStage, SampleBuffer};

/// One triggered sound, sent from the control side to the renderer.
#[derive(Debug, Clone)]
pub struct PlaybackRequest {
    pub buffer: SampleBuffer,
    /// Absolute clock time in seconds.
    pub start_time: f64,
    /// 1.0 plays at the native pitch.
    pub playback_rate: f64,
    pub stop_time: Option<f64>,
}

/// Playing instance of a [`PlaybackRequest`]. Dropped by the renderer as soon
/// as it ends.
#[derive(Debug)]
struct Voice {
    buffer: SampleBuffer,
    start_frame: u64,
    stop_frame: Option<u64>,
    position: f64,
    step: f64,
    done: bool,
}

impl Voice {
    fn new(request: PlaybackRequest, output_rate: u32) -> Self {
        let to_frame = |seconds: f64| (seconds.max(0.0) * output_rate as f64).round() as u64;
        let step = request.playback_rate.max(0.0) * request.buffer.sample_rate() as f64
            / output_rate as f64;

        Self {
            start_frame: to_frame(request.start_time),
            stop_frame: request.stop_time.map(to_frame),
            buffer: request.buffer,
            position: 0.0,
            step,
            done: false,
        }
    }

    fn next(&mut self, frame: u64) -> f32 {
        if self.done || frame < self.start_frame {
            return 0.0;
        }
        if self.stop_frame.is_some_and(|stop| frame >= stop) {
            self.done = true;
            return 0.0;
        }

        let samples = self.buffer.samples();
        let index = self.position as usize;
        if index >= samples.len() || self.step == 0.0 {
            self.done = true;
            return 0.0;
        }

        let frac = (self.position - index as f64) as f32;
        let current = samples[index];
        let following = samples.get(index + 1).copied().unwrap_or(0.0);
        self.position += self.step;

        current + (following - current) * frac
    }
}

/// Audio-thread half of an [`AudioContext`](super::AudioContext): mixes the
/// scheduled voices through the shared gain and advances the clock.
pub struct Renderer {
    clock: Arc<ClockShared>,
    gain: GainStage,
    inbox: Receiver<PlaybackRequest>,
    voices: Vec<Voice>,
}

impl Renderer {
    pub(crate) fn new(
        clock: Arc<ClockShared>,
        gain: GainStage,
        inbox: Receiver<PlaybackRequest>,
    ) -> Self {
        Self {
            clock,
            gain,
            inbox,
            voices: Vec::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.clock.sample_rate
    }

    /// Fills an interleaved block. Every channel receives the same mono mix.
    /// A suspended or closed context yields silence and a frozen clock.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        self.collect_requests();

        if self.clock.state() != ContextState::Running {
            out.fill(0.0);
            return;
        }

        let gain = self.gain.value();
        let first = self.clock.frames();
        let mut rendered = 0u64;

        for frame in out.chunks_mut(channels) {
            let now = first + rendered;
            let mix: f32 = self.voices.iter_mut().map(|voice| voice.next(now)).sum();
            frame.fill(mix * gain);
            rendered += 1;
        }

        self.voices.retain(|voice| !voice.done);
        self.clock.advance(rendered);
    }

    /// Number of voices that are scheduled or still sounding.
    pub fn active_voices(&mut self) -> usize {
        self.collect_requests();
        self.voices.len()
    }

    /// Start times of every voice that has not begun yet, in seconds.
    pub fn pending_start_times(&mut self) -> Vec<f64> {
        self.collect_requests();
        let now = self.clock.frames();
        let rate = self.clock.sample_rate as f64;
        self.voices
            .iter()
            .filter(|voice| voice.start_frame >= now && voice.position == 0.0)
            .map(|voice| voice.start_frame as f64 / rate)
            .collect()
    }

    fn collect_requests(&mut self) {
        let rate = self.clock.sample_rate;
        self.voices
            .extend(self.inbox.try_iter().map(|request| Voice::new(request, rate)));
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("frames", &self.clock.frames())
            .field("voices", &self.voices.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::AudioContext;
    use super::*;

    fn request(buffer: &SampleBuffer, start_time: f64) -> PlaybackRequest {
        PlaybackRequest {
            buffer: buffer.clone(),
            start_time,
            playback_rate: 1.0,
            stop_time: None,
        }
    }

    #[test]
    fn voice_starts_on_its_frame() {
        let (context, mut renderer) = AudioContext::new(100);
        context.resume().unwrap();
        let buffer = SampleBuffer::new(vec![1.0; 10], 100);
        context.submit(request(&buffer, 0.05)).unwrap();

        let mut out = vec![0.0; 10];
        renderer.render(&mut out, 1);

        assert!(out[..5].iter().all(|s| *s == 0.0));
        assert!(out[5..].iter().all(|s| *s == 1.0));
    }

    #[test]
    fn finished_voices_are_released() {
        let (context, mut renderer) = AudioContext::new(100);
        context.resume().unwrap();
        let buffer = SampleBuffer::new(vec![0.5; 4], 100);
        for _ in 0..8 {
            context.submit(request(&buffer, 0.0)).unwrap();
        }
        assert_eq!(renderer.active_voices(), 8);

        let mut out = vec![0.0; 16];
        renderer.render(&mut out, 1);

        assert_eq!(out[0], 4.0);
        assert_eq!(renderer.active_voices(), 0);
    }

    #[test]
    fn stop_time_cuts_playback() {
        let (context, mut renderer) = AudioContext::new(100);
        context.resume().unwrap();
        let buffer = SampleBuffer::new(vec![1.0; 100], 100);
        context
            .submit(PlaybackRequest {
                stop_time: Some(0.03),
                ..request(&buffer, 0.0)
            })
            .unwrap();

        let mut out = vec![0.0; 10];
        renderer.render(&mut out, 1);

        assert_eq!(&out[..3], &[1.0, 1.0, 1.0]);
        assert!(out[3..].iter().all(|s| *s == 0.0));
        assert_eq!(renderer.active_voices(), 0);
    }

    #[test]
    fn playback_rate_resamples() {
        let (context, mut renderer) = AudioContext::new(100);
        context.resume().unwrap();
        let ramp: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let buffer = SampleBuffer::new(ramp, 100);
        context
            .submit(PlaybackRequest {
                playback_rate: 0.5,
                ..request(&buffer, 0.0)
            })
            .unwrap();

        let mut out = vec![0.0; 4];
        renderer.render(&mut out, 1);

        assert_eq!(out, vec![0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn suspended_context_renders_silence() {
        let (context, mut renderer) = AudioContext::new(100);
        let buffer = SampleBuffer::new(vec![1.0; 10], 100);
        context.submit(request(&buffer, 0.0)).unwrap();

        let mut out = vec![1.0; 10];
        renderer.render(&mut out, 1);

        assert!(out.iter().all(|s| *s == 0.0));
        assert_eq!(context.current_time(), 0.0);
        assert_eq!(renderer.active_voices(), 1);
    }

    #[test]
    fn writes_every_channel() {
        let (context, mut renderer) = AudioContext::new(100);
        context.resume().unwrap();
        let buffer = SampleBuffer::new(vec![0.25; 4], 100);
        context.submit(request(&buffer, 0.0)).unwrap();

        let mut out = vec![0.0; 4];
        renderer.render(&mut out, 2);

        assert_eq!(out, vec![0.25; 4]);
    }
}
