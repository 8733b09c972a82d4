use std::sync::{
    atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering},
    Arc,
};

use crossbeam_channel::{unbounded, Sender};

use crate::{MetronomeError, Result};

mod render;

pub use render::{PlaybackRequest, Renderer};

/// Decoded mono audio shared read-only between the loader, the playback
/// engine and every voice that plays it.
#[derive(Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Native duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

impl std::fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("len", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

/// Power state of the audio clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContextState {
    /// Clock frozen, output silent. Initial state.
    Suspended = 0,
    Running = 1,
    /// Terminal; the clock can never be resumed.
    Closed = 2,
}

impl ContextState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Suspended,
            1 => Self::Running,
            _ => Self::Closed,
        }
    }
}

/// Master volume shared by every voice. Stores `f32` bits so the audio thread
/// reads it without locking.
#[derive(Clone)]
pub struct GainStage {
    bits: Arc<AtomicU32>,
}

impl GainStage {
    pub fn new(gain: f32) -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(gain.to_bits())),
        }
    }

    pub fn set(&self, gain: f32) {
        self.bits.store(gain.max(0.0).to_bits(), Ordering::Relaxed);
    }

    pub fn value(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

impl std::fmt::Debug for GainStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("GainStage").field(&self.value()).finish()
    }
}

#[derive(Debug)]
pub(crate) struct ClockShared {
    sample_rate: u32,
    frames: AtomicU64,
    state: AtomicU8,
}

impl ClockShared {
    pub(crate) fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub(crate) fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::AcqRel);
    }

    pub(crate) fn state(&self) -> ContextState {
        ContextState::from_u8(self.state.load(Ordering::Acquire))
    }
}

/// Control-side handle to the audio clock. Cheap to clone; every clone talks
/// to the same [`Renderer`].
#[derive(Clone)]
pub struct AudioContext {
    clock: Arc<ClockShared>,
    gain: GainStage,
    requests: Sender<PlaybackRequest>,
}

impl AudioContext {
    /// Creates a suspended context and the renderer that advances its clock.
    /// The renderer belongs on the audio output thread.
    pub fn new(sample_rate: u32) -> (Self, Renderer) {
        let clock = Arc::new(ClockShared {
            sample_rate,
            frames: AtomicU64::new(0),
            state: AtomicU8::new(ContextState::Suspended as u8),
        });
        let gain = GainStage::new(1.0);
        let (requests, inbox) = unbounded();
        let renderer = Renderer::new(clock.clone(), gain.clone(), inbox);

        let context = Self {
            clock,
            gain,
            requests,
        };
        (context, renderer)
    }

    pub fn sample_rate(&self) -> u32 {
        self.clock.sample_rate
    }

    /// Seconds of audio rendered since the context was created.
    pub fn current_time(&self) -> f64 {
        self.clock.frames() as f64 / self.clock.sample_rate as f64
    }

    pub fn state(&self) -> ContextState {
        self.clock.state()
    }

    /// Brings a suspended clock back to life. Resuming a running clock is a
    /// no-op; a closed clock cannot be resumed.
    pub fn resume(&self) -> Result<()> {
        let resumed = self.clock.state.compare_exchange(
            ContextState::Suspended as u8,
            ContextState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        match resumed.map_err(ContextState::from_u8) {
            Ok(_) => {
                tracing::debug!(time = self.current_time(), "audio clock resumed");
                Ok(())
            }
            Err(ContextState::Running) => Ok(()),
            Err(_) => Err(MetronomeError::ClockResume(
                "audio context is closed".to_string(),
            )),
        }
    }

    pub fn suspend(&self) {
        let _ = self.clock.state.compare_exchange(
            ContextState::Running as u8,
            ContextState::Suspended as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn close(&self) {
        self.clock
            .state
            .store(ContextState::Closed as u8, Ordering::Release);
    }

    pub fn gain(&self) -> &GainStage {
        &self.gain
    }

    /// Hands a request to the renderer. Fails only once the renderer is gone.
    pub(crate) fn submit(&self, request: PlaybackRequest) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| MetronomeError::msg("audio renderer has been dropped"))
    }
}

impl std::fmt::Debug for AudioContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioContext")
            .field("sample_rate", &self.clock.sample_rate)
            .field("time", &self.current_time())
            .field("state", &self.state())
            .finish()
    }
}
