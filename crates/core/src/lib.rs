//! Core library for the metronome and reference-pitch tuner.
//!
//! Beats are never timed by the wake-up timer itself. A [`Metronome`] wakes
//! every few milliseconds and asks the [`BeatScheduler`] to commit every beat
//! that falls inside a short look-ahead window; each beat is handed to the
//! [`PlaybackEngine`] with its exact time on the audio clock, and the
//! [`Renderer`] starts it on the right frame. The [`TunerController`] plays a
//! single recorded guitar tone at different playback rates. A [`Session`]
//! wires all of it together for a front end.

pub mod assets;
pub mod audio;
pub mod config;
pub mod error;
pub mod notes;
pub mod playback;
pub mod record;
pub mod render;
pub mod session;
pub mod timeline;
pub mod tuner;

pub use assets::{
    decode_wav, load_all, AssetKind, AssetSource, DirectorySource, LoadCause, LoadError,
    LoadFailure, SampleBank,
};
pub use audio::{
    AudioContext, ContextState, GainStage, PlaybackRequest, Renderer, SampleBuffer,
};
pub use config::{
    AppConfig, AssetConfig, AudioConfig, SchedulerConfig, TempoConfig, TunerConfig,
};
pub use error::{MetronomeError, Result};
pub use notes::{FrequencyTable, TuningSet};
pub use playback::PlaybackEngine;
pub use record::{Recorder, RecordingSettings};
pub use render::{ClickTrack, ClickTrackRenderer};
pub use session::{ReadyState, Session, StatusPanel};
pub use timeline::{seconds_per_beat, BeatScheduler, Metronome, MetronomeState};
pub use tuner::TunerController;
