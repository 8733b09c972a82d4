use cpal::{traits::*, Sample};
use metronome_core::{AudioContext, MetronomeError, Renderer, Result};

/// Default output device driving an [`AudioContext`]. The context's clock
/// advances as the device consumes audio; dropping the output closes it.
pub struct AudioOutput {
    _stream: cpal::Stream,
    context: AudioContext,
}

impl AudioOutput {
    /// Opens the default device, asking for `block_size` frames per callback
    /// when the device reports a supported range.
    pub fn open(block_size: usize) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| MetronomeError::msg("no output device available"))?;

        let supported = device
            .default_output_config()
            .map_err(|err| MetronomeError::msg(format!("output config: {err}")))?;
        let sample_rate = supported.sample_rate().0;
        let format = supported.sample_format();
        let buffer_size = buffer_size(block_size, supported.buffer_size());
        let mut config: cpal::StreamConfig = supported.into();
        config.buffer_size = buffer_size.clone();

        let (context, renderer) = AudioContext::new(sample_rate);
        let stream = match format {
            cpal::SampleFormat::F32 => Self::run::<f32>(&device, &config, renderer),
            cpal::SampleFormat::I16 => Self::run::<i16>(&device, &config, renderer),
            cpal::SampleFormat::U16 => Self::run::<u16>(&device, &config, renderer),
            other => {
                return Err(MetronomeError::msg(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        }
        .map_err(|err| MetronomeError::msg(format!("build output stream: {err}")))?;

        stream
            .play()
            .map_err(|err| MetronomeError::msg(format!("start output stream: {err}")))?;

        tracing::info!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels = config.channels,
            ?buffer_size,
            "audio output opened"
        );

        Ok(Self {
            _stream: stream,
            context,
        })
    }

    pub fn context(&self) -> AudioContext {
        self.context.clone()
    }

    fn run<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mut renderer: Renderer,
    ) -> std::result::Result<cpal::Stream, cpal::BuildStreamError>
    where
        T: Sample + cpal::SizedSample + cpal::FromSample<f32>,
    {
        let channels = config.channels as usize;
        let mut mix: Vec<f32> = Vec::new();

        device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                mix.resize(data.len(), 0.0);
                renderer.render(&mut mix, channels);

                for (out, sample) in data.iter_mut().zip(&mix) {
                    let sample = if sample.is_finite() {
                        sample.clamp(-1.0, 1.0)
                    } else {
                        0.0
                    };
                    *out = T::from_sample(sample);
                }
            },
            |err| tracing::error!(%err, "audio stream error"),
            None,
        )
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.context.close();
    }
}

/// Clamps the configured block size into the range the device supports.
fn buffer_size(block_size: usize, supported: &cpal::SupportedBufferSize) -> cpal::BufferSize {
    match *supported {
        cpal::SupportedBufferSize::Range { min, max } => {
            let requested = u32::try_from(block_size).unwrap_or(u32::MAX);
            cpal::BufferSize::Fixed(requested.clamp(min, max.max(min)))
        }
        cpal::SupportedBufferSize::Unknown => cpal::BufferSize::Default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_size_is_clamped_to_the_device_range() {
        let range = cpal::SupportedBufferSize::Range { min: 64, max: 4_096 };

        assert_eq!(buffer_size(512, &range), cpal::BufferSize::Fixed(512));
        assert_eq!(buffer_size(16, &range), cpal::BufferSize::Fixed(64));
        assert_eq!(buffer_size(1 << 20, &range), cpal::BufferSize::Fixed(4_096));
    }

    #[test]
    fn unknown_range_keeps_the_device_default() {
        assert_eq!(
            buffer_size(512, &cpal::SupportedBufferSize::Unknown),
            cpal::BufferSize::Default
        );
    }
}
