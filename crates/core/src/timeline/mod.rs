use std::{
    sync::{Arc, Mutex, MutexGuard},
    thread::JoinHandle,
    time::Duration,
};

use crossbeam_channel::{bounded, select, Sender};
use serde::Serialize;

use crate::{config::SchedulerConfig, MetronomeError, PlaybackEngine, Result, SampleBuffer};

/// Length of one beat at `tempo_bpm`.
pub fn seconds_per_beat(tempo_bpm: u32) -> f64 {
    60.0 / tempo_bpm.max(1) as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetronomeState {
    pub is_running: bool,
    pub tempo_bpm: u32,
    /// Audio clock time of the next beat that has not been scheduled yet.
    pub next_beat_time: f64,
}

/// Look-ahead beat scheduler.
///
/// Each call to [`BeatScheduler::schedule`] commits every beat that falls
/// inside `now + schedule_ahead`. How often it is called only decides how far
/// in advance beats are committed, never where they land: beat times are
/// derived purely from the previous beat and the tempo.
#[derive(Debug, Clone)]
pub struct BeatScheduler {
    state: MetronomeState,
    schedule_ahead: f64,
}

impl BeatScheduler {
    pub fn new(tempo_bpm: u32, schedule_ahead: f64) -> Self {
        Self {
            state: MetronomeState {
                is_running: false,
                tempo_bpm: tempo_bpm.max(1),
                next_beat_time: 0.0,
            },
            schedule_ahead,
        }
    }

    pub fn state(&self) -> MetronomeState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn tempo(&self) -> u32 {
        self.state.tempo_bpm
    }

    /// Takes effect from the next beat computed after the change.
    pub fn set_tempo(&mut self, tempo_bpm: u32) {
        self.state.tempo_bpm = tempo_bpm.max(1);
    }

    pub fn schedule_ahead(&self) -> f64 {
        self.schedule_ahead
    }

    /// First beat lands at `now`. Starting a running scheduler does nothing.
    pub fn start(&mut self, now: f64) {
        if self.state.is_running {
            return;
        }
        self.state.is_running = true;
        self.state.next_beat_time = now;
    }

    /// Returns whether the scheduler was running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.state.is_running;
        self.state.is_running = false;
        self.state.next_beat_time = 0.0;
        was_running
    }

    /// Commits every beat due before `now + schedule_ahead`, in order.
    /// Returns how many beats were emitted.
    pub fn schedule(&mut self, now: f64, mut emit: impl FnMut(f64)) -> usize {
        if !self.state.is_running {
            return 0;
        }

        let horizon = now + self.schedule_ahead;
        let mut emitted = 0;
        while self.state.next_beat_time < horizon {
            emit(self.state.next_beat_time);
            self.state.next_beat_time += seconds_per_beat(self.state.tempo_bpm);
            emitted += 1;
        }
        emitted
    }
}

struct Ticker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Drives a [`BeatScheduler`] from a periodic background tick and turns each
/// committed beat into a hi-hat trigger on the audio clock.
pub struct Metronome {
    scheduler: Arc<Mutex<BeatScheduler>>,
    engine: PlaybackEngine,
    tick_interval: Duration,
    ticker: Option<Ticker>,
}

impl Metronome {
    pub fn new(engine: PlaybackEngine, config: &SchedulerConfig, tempo_bpm: u32) -> Self {
        Self {
            scheduler: Arc::new(Mutex::new(BeatScheduler::new(
                tempo_bpm,
                config.schedule_ahead_secs,
            ))),
            engine,
            tick_interval: Duration::from_millis(config.tick_interval_ms.max(1)),
            ticker: None,
        }
    }

    /// False once the tick thread has exited, even if `stop` was never called.
    pub fn is_running(&self) -> bool {
        self.ticker
            .as_ref()
            .is_some_and(|ticker| !ticker.handle.is_finished())
    }

    pub fn state(&self) -> Result<MetronomeState> {
        Ok(self.lock()?.state())
    }

    pub fn tempo(&self) -> Result<u32> {
        Ok(self.lock()?.tempo())
    }

    /// Unguarded tempo change; a running metronome picks it up on the next
    /// beat it computes.
    pub fn set_tempo(&self, tempo_bpm: u32) -> Result<()> {
        self.lock()?.set_tempo(tempo_bpm);
        tracing::debug!(tempo_bpm, "tempo changed");
        Ok(())
    }

    /// Resumes the clock if needed, anchors the first beat at the current
    /// clock time and starts ticking. The first tick fires one interval later.
    pub fn start(&mut self, click: &SampleBuffer) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        // Reap a tick thread that exited on its own.
        self.stop();

        self.engine.context().resume()?;
        let now = self.engine.context().current_time();
        self.lock()?.start(now);

        let (stop, stopped) = bounded::<()>(0);
        let scheduler = self.scheduler.clone();
        let engine = self.engine.clone();
        let click = click.clone();
        let ticks = crossbeam_channel::tick(self.tick_interval);

        let handle = std::thread::Builder::new()
            .name("metronome-tick".to_string())
            .spawn(move || loop {
                select! {
                    recv(stopped) -> _ => break,
                    recv(ticks) -> _ => {
                        if let Err(err) = schedule_pass(&scheduler, &engine, &click) {
                            tracing::error!(%err, "metronome tick failed");
                            break;
                        }
                    }
                }
            })?;

        self.ticker = Some(Ticker { stop, handle });
        tracing::info!(
            start_time = now,
            interval = ?self.tick_interval,
            "metronome started"
        );
        Ok(())
    }

    /// Halts future scheduling. Beats already handed to the renderer still
    /// play. Stopping a stopped metronome is a no-op.
    pub fn stop(&mut self) -> bool {
        let Some(ticker) = self.ticker.take() else {
            return false;
        };

        drop(ticker.stop);
        if ticker.handle.join().is_err() {
            tracing::error!("metronome tick thread panicked");
        }
        if let Ok(mut scheduler) = self.lock() {
            scheduler.stop();
        }
        tracing::info!("metronome stopped");
        true
    }

    /// Runs one scheduling pass immediately, outside the periodic tick.
    pub fn tick(&self, click: &SampleBuffer) -> Result<usize> {
        schedule_pass(&self.scheduler, &self.engine, click)
    }

    fn lock(&self) -> Result<MutexGuard<'_, BeatScheduler>> {
        lock_scheduler(&self.scheduler)
    }
}

impl Drop for Metronome {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Metronome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metronome")
            .field("running", &self.is_running())
            .field("tick_interval", &self.tick_interval)
            .finish()
    }
}

fn lock_scheduler(scheduler: &Mutex<BeatScheduler>) -> Result<MutexGuard<'_, BeatScheduler>> {
    scheduler
        .lock()
        .map_err(|_| MetronomeError::msg("beat scheduler has been poisoned"))
}

fn schedule_pass(
    scheduler: &Mutex<BeatScheduler>,
    engine: &PlaybackEngine,
    click: &SampleBuffer,
) -> Result<usize> {
    let now = engine.context().current_time();
    let mut scheduler = lock_scheduler(scheduler)?;
    Ok(scheduler.schedule(now, |beat_time| {
        tracing::trace!(beat_time, "beat scheduled");
        engine.trigger_at(click, beat_time);
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AudioContext;

    fn beats_while_polling(tempo: u32, steps: &[f64], until: f64) -> Vec<f64> {
        let mut scheduler = BeatScheduler::new(tempo, 0.1);
        let mut beats = Vec::new();
        let mut now = 0.0;
        scheduler.start(now);

        let mut step = steps.iter().cycle();
        while now < until {
            scheduler.schedule(now, |t| beats.push(t));
            now += step.next().copied().unwrap_or(0.025);
        }
        beats
    }

    #[test]
    fn beat_spacing_matches_tempo_for_every_supported_tempo() {
        for tempo in 40..=240 {
            let expected = seconds_per_beat(tempo);
            let beats = beats_while_polling(tempo, &[0.025, 0.013, 0.071, 0.002], 5.0);

            assert!(beats.len() >= 3, "tempo {tempo}");
            for pair in beats.windows(2) {
                let delta = pair[1] - pair[0];
                assert!((delta - expected).abs() < 1e-9, "tempo {tempo}: {delta}");
            }
        }
    }

    #[test]
    fn polling_interval_does_not_move_beats() {
        let fine = beats_while_polling(120, &[0.001], 3.0);
        let coarse = beats_while_polling(120, &[0.09], 3.0);

        let common = fine.len().min(coarse.len());
        assert!(common >= 6);
        assert_eq!(&fine[..common], &coarse[..common]);
    }

    #[test]
    fn beat_times_form_arithmetic_progression() {
        for (tempo, spb) in [(120, 0.5), (60, 1.0)] {
            assert_eq!(seconds_per_beat(tempo), spb);
            let beats = beats_while_polling(tempo, &[0.025], 4.0);
            for (index, beat) in beats.iter().enumerate() {
                assert!((beat - index as f64 * spb).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn one_pass_drains_the_whole_window_in_order() {
        let mut scheduler = BeatScheduler::new(240, 1.0);
        scheduler.start(2.0);

        let mut beats = Vec::new();
        let count = scheduler.schedule(2.0, |t| beats.push(t));

        assert_eq!(count, 4);
        assert_eq!(beats, vec![2.0, 2.25, 2.5, 2.75]);
        assert_eq!(scheduler.state().next_beat_time, 3.0);
    }

    #[test]
    fn tempo_change_applies_from_the_next_beat() {
        let mut scheduler = BeatScheduler::new(120, 0.1);
        scheduler.start(0.0);
        let mut beats = Vec::new();

        scheduler.schedule(0.0, |t| beats.push(t));
        scheduler.set_tempo(60);
        scheduler.schedule(0.45, |t| beats.push(t));
        scheduler.schedule(1.45, |t| beats.push(t));

        assert_eq!(beats, vec![0.0, 0.5, 1.5]);
    }

    #[test]
    fn stopped_scheduler_emits_nothing_and_stop_is_idempotent() {
        let mut scheduler = BeatScheduler::new(120, 0.1);
        assert_eq!(scheduler.schedule(0.0, |_| panic!("not running")), 0);

        scheduler.start(0.0);
        assert!(scheduler.stop());
        assert!(!scheduler.stop());
        assert_eq!(scheduler.state().next_beat_time, 0.0);
    }

    fn metronome() -> (Metronome, crate::Renderer, SampleBuffer) {
        let (context, renderer) = AudioContext::new(1_000);
        let engine = PlaybackEngine::new(context);
        let metronome = Metronome::new(engine, &SchedulerConfig::default(), 120);
        (metronome, renderer, SampleBuffer::new(vec![1.0; 10], 1_000))
    }

    #[test]
    fn start_then_immediate_stop_schedules_nothing() {
        let (mut metronome, mut renderer, click) = metronome();

        metronome.start(&click).unwrap();
        assert!(metronome.stop());

        assert!(renderer.pending_start_times().is_empty());
        assert!(!metronome.is_running());
    }

    #[test]
    fn ticks_commit_only_the_look_ahead_window() {
        let (mut metronome, mut renderer, click) = metronome();

        metronome.start(&click).unwrap();
        std::thread::sleep(Duration::from_millis(120));
        assert!(metronome.stop());
        assert!(!metronome.stop());

        // The clock never advanced, so only the beat at t=0 is inside the window.
        assert_eq!(renderer.pending_start_times(), vec![0.0]);
    }

    #[test]
    fn start_resumes_the_clock() {
        let (mut metronome, _renderer, click) = metronome();
        assert_eq!(
            metronome.engine.context().state(),
            crate::ContextState::Suspended
        );

        metronome.start(&click).unwrap();

        assert_eq!(metronome.engine.context().state(), crate::ContextState::Running);
        assert!(metronome.state().unwrap().is_running);
    }

    #[test]
    fn start_fails_on_a_closed_clock() {
        let (mut metronome, _renderer, click) = metronome();
        metronome.engine.context().close();

        let err = metronome.start(&click).unwrap_err();

        assert!(matches!(err, MetronomeError::ClockResume(_)));
        assert!(!metronome.is_running());
    }

    #[test]
    fn failed_tick_thread_reports_stopped() {
        let (mut metronome, _renderer, click) = metronome();
        metronome.start(&click).unwrap();
        assert!(metronome.is_running());

        let scheduler = metronome.scheduler.clone();
        std::thread::spawn(move || {
            let _guard = scheduler.lock().unwrap();
            panic!("poison the scheduler");
        })
        .join()
        .unwrap_err();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while metronome.is_running() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }

        assert!(!metronome.is_running());
        assert!(metronome.start(&click).is_err());
        assert!(!metronome.is_running());
    }

    #[test]
    fn manual_tick_follows_the_rendered_clock() {
        let (mut metronome, mut renderer, click) = metronome();
        metronome.engine.context().resume().unwrap();
        metronome.lock().unwrap().start(0.0);

        let mut block = vec![0.0; 450];
        assert_eq!(metronome.tick(&click).unwrap(), 1);
        renderer.render(&mut block, 1);
        assert_eq!(metronome.tick(&click).unwrap(), 1);

        assert_eq!(renderer.pending_start_times(), vec![0.5]);
        metronome.stop();
    }
}
