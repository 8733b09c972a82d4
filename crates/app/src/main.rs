use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use metronome_core::{
    load_all, AppConfig, ClickTrackRenderer, DirectorySource, FrequencyTable, Recorder,
    RecordingSettings, Session, TuningSet,
};
use tracing_subscriber::EnvFilter;

mod console;
mod output;

use output::AudioOutput;

fn main() -> metronome_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_path(path)?,
        None => AppConfig::default(),
    };
    if let Some(assets) = cli.assets {
        config.assets.root = assets.to_string_lossy().into_owned();
    }

    match cli.command {
        Commands::Run => run_console(config),
        Commands::Tune { note } => run_tune(config, &note),
        Commands::Notes => list_notes(&config),
        Commands::Render {
            output,
            tempo,
            seconds,
            volume,
        } => run_render(config, output, tempo, seconds, volume),
    }
}

fn open_session(config: AppConfig) -> metronome_core::Result<(AudioOutput, Session)> {
    let output = AudioOutput::open(config.audio.block_size)?;
    let source = DirectorySource::new(&config.assets.root);
    let mut session = Session::new(config, output.context())?;
    if let Err(err) = session.load(&source) {
        tracing::error!(%err, root = ?source.root(), "playback features disabled");
    }
    Ok((output, session))
}

fn run_console(config: AppConfig) -> metronome_core::Result<()> {
    tracing::info!(assets = %config.assets.root, "starting interactive metronome");
    let (_output, mut session) = open_session(config)?;
    console::run(&mut session)
}

fn run_tune(config: AppConfig, note: &str) -> metronome_core::Result<()> {
    let hold = Duration::from_secs_f64(config.tuner.stop_after_secs.max(0.0));
    let (_output, session) = open_session(config)?;

    let rate = session.play_note(note)?;
    println!("{note}: playback rate {rate:.5}");
    std::thread::sleep(hold + Duration::from_millis(200));
    Ok(())
}

fn list_notes(config: &AppConfig) -> metronome_core::Result<()> {
    let table = FrequencyTable::standard();
    let reference = table.frequency(&config.tuner.reference_note)?;

    for set in TuningSet::all() {
        println!("{}", set.name);
        for note in set.notes {
            let hz = table.frequency(note)?;
            println!("  {note:<4} {hz:>8.3} Hz  rate {:.5}", hz / reference);
        }
    }
    Ok(())
}

fn run_render(
    mut config: AppConfig,
    output: PathBuf,
    tempo: Option<u32>,
    seconds: f64,
    volume: Option<u32>,
) -> metronome_core::Result<()> {
    let tempo = tempo.unwrap_or(config.tempo.default_bpm);
    if !config.tempo.contains(tempo) {
        return Err(metronome_core::MetronomeError::TempoOutOfRange {
            bpm: tempo,
            min: config.tempo.min_bpm,
            max: config.tempo.max_bpm,
        });
    }
    if let Some(volume) = volume {
        config.volume = volume.min(100);
    }

    tracing::info!(?output, tempo, seconds, "rendering click track");
    let bank = load_all(&DirectorySource::new(&config.assets.root), &config.assets)?;
    let track = ClickTrackRenderer::new(&config).render(&bank.hi_hat, tempo, seconds)?;

    Recorder::new(RecordingSettings {
        output_path: output,
        ..RecordingSettings::default()
    })
    .write(&track)?;
    println!("{} beats written", track.beat_times.len());
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Look-ahead metronome and reference-pitch tuner",
    long_about = None
)]
struct Cli {
    /// JSON configuration file; missing fields use defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding hihat.wav and guitar.wav.
    #[arg(short, long, global = true)]
    assets: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive metronome and tuner on the default output device.
    Run,
    /// Play one reference note and wait for it to stop.
    Tune {
        /// Note name such as A2 or Eb4.
        note: String,
    },
    /// Print the tuning sets with frequencies and playback rates.
    Notes,
    /// Render a click track to a WAV file without an audio device.
    Render {
        /// Path of the WAV file to write.
        output: PathBuf,
        #[arg(short, long)]
        tempo: Option<u32>,
        #[arg(short, long, default_value_t = 10.0)]
        seconds: f64,
        #[arg(short, long)]
        volume: Option<u32>,
    },
}
