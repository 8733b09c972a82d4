use serde::Serialize;

use crate::{
    assets::{load_all, AssetSource, SampleBank},
    config::AppConfig,
    AudioContext, FrequencyTable, Metronome, MetronomeError, PlaybackEngine, Result,
    TunerController, TuningSet,
};

/// Sample loading progress shown to the user. Leaves `Loading` exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReadyState {
    Loading,
    Ready,
    Failed(String),
}

impl ReadyState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Loading => "Loading...",
            Self::Ready => "Ready",
            Self::Failed(_) => "Error loading sounds",
        }
    }
}

/// Snapshot of everything a front end displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusPanel {
    /// Caption for the start/stop toggle.
    pub toggle_label: &'static str,
    pub running: bool,
    pub tempo_bpm: u32,
    /// Volume at 1/10 scale, as shown next to the slider.
    pub volume_display: f32,
    pub ready_label: &'static str,
    /// Whether the tempo control accepts edits.
    pub tempo_editable: bool,
    /// Whether start and note buttons are enabled.
    pub playback_enabled: bool,
}

/// Composition root: owns the audio context, the loaded samples and every
/// controller, and exposes the operations a front end wires to its inputs.
#[derive(Debug)]
pub struct Session {
    config: AppConfig,
    engine: PlaybackEngine,
    metronome: Metronome,
    tuner: TunerController,
    samples: Option<SampleBank>,
    ready: ReadyState,
    volume: u32,
}

impl Session {
    pub fn new(config: AppConfig, context: AudioContext) -> Result<Self> {
        let engine = PlaybackEngine::new(context);
        let tempo_bpm = config.tempo.default_bpm;
        if !config.tempo.contains(tempo_bpm) {
            return Err(MetronomeError::TempoOutOfRange {
                bpm: tempo_bpm,
                min: config.tempo.min_bpm,
                max: config.tempo.max_bpm,
            });
        }
        let volume = config.volume.min(100);
        engine.set_volume(volume);

        let metronome = Metronome::new(engine.clone(), &config.scheduler, tempo_bpm);
        let tuner =
            TunerController::new(engine.clone(), FrequencyTable::standard(), &config.tuner)?;

        Ok(Self {
            config,
            engine,
            metronome,
            tuner,
            samples: None,
            ready: ReadyState::Loading,
            volume,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn context(&self) -> &AudioContext {
        self.engine.context()
    }

    pub fn tuner(&self) -> &TunerController {
        &self.tuner
    }

    pub fn metronome(&self) -> &Metronome {
        &self.metronome
    }

    /// Loads both samples. Only the first call does any work; the ready state
    /// never changes afterwards.
    pub fn load(&mut self, source: &dyn AssetSource) -> Result<()> {
        match &self.ready {
            ReadyState::Ready => return Ok(()),
            ReadyState::Failed(reason) => return Err(MetronomeError::msg(reason.clone())),
            ReadyState::Loading => {}
        }

        match load_all(source, &self.config.assets) {
            Ok(bank) => {
                self.samples = Some(bank);
                self.ready = ReadyState::Ready;
                tracing::info!("sounds loaded, playback enabled");
                Ok(())
            }
            Err(failure) => {
                self.ready = ReadyState::Failed(failure.to_string());
                tracing::error!(%failure, "playback disabled");
                Err(failure.into())
            }
        }
    }

    pub fn buffers_loaded(&self) -> bool {
        self.samples.is_some()
    }

    pub fn ready_state(&self) -> &ReadyState {
        &self.ready
    }

    pub fn is_running(&self) -> bool {
        self.metronome.is_running()
    }

    pub fn start(&mut self) -> Result<()> {
        let bank = self.samples.as_ref().ok_or(MetronomeError::NotReady)?;
        self.metronome.start(&bank.hi_hat).inspect_err(|err| {
            tracing::error!(%err, "metronome did not start");
        })
    }

    /// No-op when already stopped.
    pub fn stop(&mut self) {
        self.metronome.stop();
    }

    /// Returns whether the metronome is running afterwards.
    pub fn toggle(&mut self) -> Result<bool> {
        if self.is_running() {
            self.stop();
        } else {
            self.start()?;
        }
        Ok(self.is_running())
    }

    /// Tempo the scheduler currently uses, whichever path last changed it.
    pub fn tempo(&self) -> Result<u32> {
        self.metronome.tempo()
    }

    /// Tempo edits are locked while the metronome runs.
    pub fn set_tempo(&mut self, bpm: u32) -> Result<()> {
        if self.is_running() {
            return Err(MetronomeError::TempoLocked);
        }
        let tempo = &self.config.tempo;
        if !tempo.contains(bpm) {
            return Err(MetronomeError::TempoOutOfRange {
                bpm,
                min: tempo.min_bpm,
                max: tempo.max_bpm,
            });
        }
        self.metronome.set_tempo(bpm)
    }

    pub fn volume(&self) -> u32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: u32) -> Result<()> {
        if volume > 100 {
            return Err(MetronomeError::VolumeOutOfRange(volume));
        }
        self.engine.set_volume(volume);
        self.volume = volume;
        Ok(())
    }

    /// Plays a reference note; returns the playback rate used.
    pub fn play_note(&self, note: &str) -> Result<f64> {
        let bank = self.samples.as_ref().ok_or(MetronomeError::NotReady)?;
        self.tuner.play(&bank.guitar, note)
    }

    pub fn tuning_sets(&self) -> [TuningSet; 2] {
        TuningSet::all()
    }

    pub fn status(&self) -> Result<StatusPanel> {
        let running = self.is_running();
        Ok(StatusPanel {
            toggle_label: if running { "Stop" } else { "Start" },
            running,
            tempo_bpm: self.tempo()?,
            volume_display: self.volume as f32 / 10.0,
            ready_label: self.ready.label(),
            tempo_editable: !running,
            playback_enabled: self.buffers_loaded(),
        })
    }
}
