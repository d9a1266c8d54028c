//! Audio capture from microphone

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use tokio::sync::mpsc;

use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Samples per live capture frame (~256ms at 16kHz)
pub const FRAME_SIZE: usize = 4096;

/// Captures mono audio from the default input device.
///
/// Two delivery modes: [`start`](Self::start) accumulates into an internal
/// buffer for bounded single-shot recording, and
/// [`start_streaming`](Self::start_streaming) emits fixed-size frames on a
/// channel for the live path.
pub struct AudioCapture {
    #[allow(dead_code)]
    device: Device,
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Create a new audio capture instance
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(CAPTURE_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(CAPTURE_SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable capture config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(CAPTURE_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = CAPTURE_SAMPLE_RATE,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            device,
            config,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Start capturing into the internal buffer
    ///
    /// # Errors
    ///
    /// Returns error if capture fails
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);
        let stream = self.build_stream(move |data| {
            if let Ok(mut buf) = buffer.lock() {
                buf.extend_from_slice(data);
            }
        })?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Start capturing and emit [`FRAME_SIZE`]-sample frames on `frames`.
    ///
    /// Frames are sent fire-and-forget in capture order. When the channel is
    /// full a frame is dropped with a warning rather than blocking the device
    /// callback; the channel capacity is the only backpressure tunable.
    ///
    /// # Errors
    ///
    /// Returns error if capture fails
    pub fn start_streaming(&mut self, frames: mpsc::Sender<Vec<f32>>) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let mut pending: Vec<f32> = Vec::with_capacity(FRAME_SIZE * 2);
        let stream = self.build_stream(move |data| {
            pending.extend_from_slice(data);
            while pending.len() >= FRAME_SIZE {
                let frame: Vec<f32> = pending.drain(..FRAME_SIZE).collect();
                if frames.try_send(frame).is_err() {
                    tracing::warn!("capture frame dropped: channel full or closed");
                }
            }
        })?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!(frame_size = FRAME_SIZE, "streaming capture started");
        Ok(())
    }

    fn build_stream(&self, mut on_data: impl FnMut(&[f32]) + Send + 'static) -> Result<Stream> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device".to_string()))?;

        device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| on_data(data),
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Get captured audio buffer and clear it
    ///
    /// Returns the audio samples captured since last call
    #[must_use]
    pub fn take_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    /// Check if currently capturing
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    /// Get the sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        CAPTURE_SAMPLE_RATE
    }
}

/// Convert f32 samples to WAV bytes for the batch transcription API
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
