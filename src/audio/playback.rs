//! Audio playback to speakers (long-form chunk path)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::audio::pcm::SampleBuffer;
use crate::{Error, Result};

/// Sample rate of synthesized service audio
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Sink that plays one decoded buffer at a time.
///
/// The long-form scheduler awaits [`play`](Self::play) before starting the
/// next chunk, so chunks never overlap. [`stop`](Self::stop) halts the
/// buffer currently playing and is safe to call at any time, including when
/// nothing is playing or the buffer already finished.
#[async_trait]
pub trait AudioOut: Send + Sync {
    /// Play a buffer to completion (or until halted by `stop`).
    async fn play(&self, buffer: &SampleBuffer) -> Result<()>;

    /// Halt the currently playing buffer. Idempotent.
    fn stop(&self);
}

/// Plays audio to the default output device.
///
/// Only the stream configuration is held here; the device is re-acquired
/// per buffer on the blocking thread that owns the stream, which keeps the
/// player `Send + Sync` and shareable behind an `Arc`.
pub struct CpalPlayer {
    config: StreamConfig,
    current: Mutex<Arc<AtomicBool>>,
}

impl CpalPlayer {
    /// Create a new audio playback instance
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(OUTPUT_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(OUTPUT_SAMPLE_RATE)
            })
            .or_else(|| {
                // Fallback: try stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(OUTPUT_SAMPLE_RATE)
                        && c.max_sample_rate() >= SampleRate(OUTPUT_SAMPLE_RATE)
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(OUTPUT_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = OUTPUT_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self {
            config,
            current: Mutex::new(Arc::new(AtomicBool::new(false))),
        })
    }

    /// Install a fresh halt flag for the next buffer
    fn arm(&self) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        if let Ok(mut current) = self.current.lock() {
            *current = Arc::clone(&flag);
        }
        flag
    }
}

#[async_trait]
impl AudioOut for CpalPlayer {
    async fn play(&self, buffer: &SampleBuffer) -> Result<()> {
        if buffer.frames() == 0 {
            return Ok(());
        }

        let halt = self.arm();
        let samples = buffer.plane(0).to_vec();
        let config = self.config.clone();

        // The cpal stream is not Send; build and drive it on a blocking thread
        tokio::task::spawn_blocking(move || play_samples_blocking(samples, &config, &halt))
            .await
            .map_err(|e| Error::Audio(e.to_string()))?
    }

    fn stop(&self) {
        if let Ok(current) = self.current.lock() {
            current.store(true, Ordering::SeqCst);
        }
    }
}

/// Play samples on the default output device until done or halted
fn play_samples_blocking(
    samples: Vec<f32>,
    config: &StreamConfig,
    halt: &Arc<AtomicBool>,
) -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device".to_string()))?;

    let channels = config.channels as usize;

    let samples = Arc::new(samples);
    let position = Arc::new(Mutex::new(0usize));
    let finished = Arc::new(AtomicBool::new(false));

    let samples_cb = Arc::clone(&samples);
    let position_cb = Arc::clone(&position);
    let finished_cb = Arc::clone(&finished);
    let halt_cb = Arc::clone(halt);

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut pos = match position_cb.lock() {
                    Ok(pos) => pos,
                    Err(_) => return,
                };

                for frame in data.chunks_mut(channels) {
                    let sample = if *pos < samples_cb.len() && !halt_cb.load(Ordering::SeqCst) {
                        samples_cb[*pos]
                    } else {
                        finished_cb.store(true, Ordering::SeqCst);
                        0.0
                    };

                    for out in frame.iter_mut() {
                        *out = sample;
                    }

                    if *pos < samples_cb.len() {
                        *pos += 1;
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    // Wait for playback to finish or be halted
    let duration_ms = (samples.len() as u64 * 1000) / u64::from(OUTPUT_SAMPLE_RATE);
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(duration_ms + 500);

    while !finished.load(Ordering::SeqCst) && !halt.load(Ordering::SeqCst) {
        if start.elapsed() > timeout {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }

    // Small delay so the tail of the buffer drains from the device
    if !halt.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    drop(stream);
    tracing::debug!(samples = samples.len(), halted = halt.load(Ordering::SeqCst), "playback done");

    Ok(())
}
