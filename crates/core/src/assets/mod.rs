use std::{
    fmt,
    io::Cursor,
    path::{Path, PathBuf},
};

use crate::{config::AssetConfig, SampleBuffer};

/// The two fixed samples the application plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// Closed hi-hat, used for every metronome beat.
    HiHat,
    /// Guitar tone recorded at the tuner's reference pitch.
    Guitar,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HiHat => f.write_str("hi-hat"),
            Self::Guitar => f.write_str("guitar"),
        }
    }
}

/// Why a single asset could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadCause {
    #[error("fetch failed: {0}")]
    Fetch(#[from] std::io::Error),
    #[error("decode failed: {0}")]
    Decode(#[from] hound::Error),
}

#[derive(Debug, thiserror::Error)]
#[error("could not load {asset} sample `{path}`: {cause}")]
pub struct LoadError {
    pub asset: AssetKind,
    pub path: String,
    #[source]
    pub cause: LoadCause,
}

/// Aggregate failure of [`load_all`]; lists every asset that failed.
#[derive(Debug)]
pub struct LoadFailure {
    pub errors: Vec<LoadError>,
}

impl LoadFailure {
    pub fn failed_assets(&self) -> Vec<AssetKind> {
        self.errors.iter().map(|error| error.asset).collect()
    }
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to load sounds")?;
        for (index, error) in self.errors.iter().enumerate() {
            let sep = if index == 0 { ": " } else { "; " };
            write!(f, "{sep}{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for LoadFailure {}

/// Where raw asset bytes come from.
pub trait AssetSource: Sync {
    fn fetch(&self, path: &str) -> std::io::Result<Vec<u8>>;
}

/// Reads assets from files below a root directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirectorySource {
    fn fetch(&self, path: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.root.join(path))
    }
}

/// Both decoded samples. Only exists when every asset loaded.
#[derive(Debug, Clone)]
pub struct SampleBank {
    pub hi_hat: SampleBuffer,
    pub guitar: SampleBuffer,
}

/// Fetches and decodes both assets concurrently. Succeeds only if both
/// decode; a partial load is reported as a failure.
pub fn load_all(
    source: &dyn AssetSource,
    assets: &AssetConfig,
) -> Result<SampleBank, LoadFailure> {
    let (hi_hat, guitar) = std::thread::scope(|scope| {
        let hi_hat = scope.spawn(|| load_one(source, AssetKind::HiHat, &assets.hi_hat));
        let guitar = load_one(source, AssetKind::Guitar, &assets.guitar);
        let hi_hat = hi_hat.join().unwrap_or_else(|_| {
            Err(LoadError {
                asset: AssetKind::HiHat,
                path: assets.hi_hat.clone(),
                cause: LoadCause::Fetch(std::io::Error::other("loader thread panicked")),
            })
        });
        (hi_hat, guitar)
    });

    match (hi_hat, guitar) {
        (Ok(hi_hat), Ok(guitar)) => Ok(SampleBank { hi_hat, guitar }),
        (hi_hat, guitar) => Err(LoadFailure {
            errors: [hi_hat.err(), guitar.err()].into_iter().flatten().collect(),
        }),
    }
}

fn load_one(
    source: &dyn AssetSource,
    asset: AssetKind,
    path: &str,
) -> Result<SampleBuffer, LoadError> {
    let result = source
        .fetch(path)
        .map_err(LoadCause::from)
        .and_then(|bytes| decode_wav(&bytes).map_err(LoadCause::from));

    match result {
        Ok(buffer) => {
            tracing::info!(
                %asset,
                path,
                frames = buffer.len(),
                sample_rate = buffer.sample_rate(),
                "sample decoded"
            );
            Ok(buffer)
        }
        Err(cause) => {
            tracing::error!(%asset, path, %cause, "sample failed to load");
            Err(LoadError {
                asset,
                path: path.to_string(),
                cause,
            })
        }
    }
}

/// Decodes WAV bytes into a mono buffer, averaging all channels.
pub fn decode_wav(bytes: &[u8]) -> Result<SampleBuffer, hound::Error> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let mono = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok(SampleBuffer::new(mono, spec.sample_rate))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::AssetSource;

    /// In-memory asset source for tests.
    #[derive(Default)]
    pub struct MemorySource {
        files: HashMap<String, Vec<u8>>,
    }

    impl MemorySource {
        pub fn with(mut self, path: &str, bytes: Vec<u8>) -> Self {
            self.files.insert(path.to_string(), bytes);
            self
        }
    }

    impl AssetSource for MemorySource {
        fn fetch(&self, path: &str) -> std::io::Result<Vec<u8>> {
            self.files.get(path).cloned().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, format!("{path} not found"))
            })
        }
    }

    /// 16-bit PCM WAV with the given samples.
    pub fn wav_bytes(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for sample in samples {
                writer
                    .write_sample((sample * i16::MAX as f32) as i16)
                    .unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    /// Source holding a valid hi-hat and guitar under the default names.
    pub fn complete_source(sample_rate: u32) -> MemorySource {
        MemorySource::default()
            .with("hihat.wav", wav_bytes(&[0.5; 64], sample_rate, 1))
            .with("guitar.wav", wav_bytes(&[0.25; 256], sample_rate, 1))
    }
}
