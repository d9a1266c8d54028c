//! Continuous output timeline for live response audio
//!
//! Live response frames must play back-to-back with no gap and no overlap
//! even when decode latency varies, so they are scheduled against a sample
//! clock rather than played as they arrive. The clock advances in the output
//! device callback; scheduled sources start when the clock reaches their
//! start frame and are mixed into the device buffer until they run out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::audio::pcm::SampleBuffer;
use crate::audio::playback::OUTPUT_SAMPLE_RATE;
use crate::{Error, Result};

/// Handle to one scheduled output source
#[derive(Debug, Clone, Default)]
pub struct SourceHandle {
    stopped: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl SourceHandle {
    /// Create a handle for a newly scheduled source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Halt this source. Idempotent; safe after the source finished.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// True once the source was halted
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// True once the source played out (or was removed after a halt)
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Mark completion. Called by timeline implementations only.
    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }
}

/// Output clock plus scheduler.
///
/// The clock is monotonic and owned by the timeline; callers sequence
/// sources by scheduling each at `max(cursor, now())` and advancing their
/// own cursor by the buffer duration.
pub trait OutputTimeline: Send + Sync {
    /// Current output clock position in seconds
    fn now(&self) -> f64;

    /// Schedule a buffer to start at `at` seconds on the output clock
    ///
    /// # Errors
    ///
    /// Returns error if the source cannot be scheduled.
    fn schedule(&self, buffer: SampleBuffer, at: f64) -> Result<SourceHandle>;
}

/// One source queued on the mixer
struct ActiveSource {
    start_frame: u64,
    samples: Vec<f32>,
    pos: usize,
    handle: SourceHandle,
}

#[derive(Default)]
struct MixerState {
    clock: u64,
    sources: Vec<ActiveSource>,
}

/// cpal-backed output timeline.
///
/// The output stream lives on a dedicated thread (cpal streams are not
/// `Send`); the mixer state is shared with the device callback.
pub struct CpalTimeline {
    state: Arc<Mutex<MixerState>>,
    _shutdown: mpsc::Sender<()>,
}

impl CpalTimeline {
    /// Open the default output device and start the mixer
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let state = Arc::new(Mutex::new(MixerState::default()));
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel();

        let thread_state = Arc::clone(&state);
        std::thread::spawn(move || run_mixer(&thread_state, &ready_tx, &shutdown_rx));

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                state,
                _shutdown: shutdown_tx,
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::Audio("mixer thread exited during startup".to_string())),
        }
    }
}

impl OutputTimeline for CpalTimeline {
    #[allow(clippy::cast_precision_loss)]
    fn now(&self) -> f64 {
        self.state
            .lock()
            .map(|state| state.clock as f64 / f64::from(OUTPUT_SAMPLE_RATE))
            .unwrap_or_default()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn schedule(&self, buffer: SampleBuffer, at: f64) -> Result<SourceHandle> {
        let start_frame = (at.max(0.0) * f64::from(OUTPUT_SAMPLE_RATE)).round() as u64;
        let handle = SourceHandle::new();

        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::Audio("mixer state poisoned".to_string()))?;
        state.sources.push(ActiveSource {
            start_frame,
            samples: buffer.plane(0).to_vec(),
            pos: 0,
            handle: handle.clone(),
        });

        tracing::trace!(
            at,
            frames = buffer.frames(),
            queued = state.sources.len(),
            "source scheduled"
        );
        Ok(handle)
    }
}

/// Own the output stream for the lifetime of the timeline
fn run_mixer(
    state: &Arc<Mutex<MixerState>>,
    ready: &mpsc::Sender<std::result::Result<(), Error>>,
    shutdown: &mpsc::Receiver<()>,
) {
    let stream = match build_mixer_stream(state) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready.send(Err(Error::Audio(e.to_string())));
        return;
    }

    let _ = ready.send(Ok(()));

    // Park until the timeline is dropped
    let _ = shutdown.recv();
    drop(stream);
    tracing::debug!("mixer stopped");
}

fn build_mixer_stream(state: &Arc<Mutex<MixerState>>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

    let supported_config = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| {
            (c.channels() == 1 || c.channels() == 2)
                && c.min_sample_rate() <= SampleRate(OUTPUT_SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(OUTPUT_SAMPLE_RATE)
        })
        .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

    let config: StreamConfig = supported_config
        .with_sample_rate(SampleRate(OUTPUT_SAMPLE_RATE))
        .config();
    let channels = config.channels as usize;

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate = OUTPUT_SAMPLE_RATE,
        channels,
        "mixer initialized"
    );

    let state_cb = Arc::clone(state);
    device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let Ok(mut state) = state_cb.lock() else { return };

                for frame in data.chunks_mut(channels) {
                    let t = state.clock;
                    let mut mix = 0.0f32;

                    for source in &mut state.sources {
                        if source.handle.is_stopped()
                            || t < source.start_frame
                            || source.pos >= source.samples.len()
                        {
                            continue;
                        }
                        mix += source.samples[source.pos];
                        source.pos += 1;
                        if source.pos == source.samples.len() {
                            source.handle.mark_finished();
                        }
                    }

                    let sample = mix.clamp(-1.0, 1.0);
                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                    state.clock += 1;
                }

                state.sources.retain(|source| {
                    let done = source.handle.is_stopped() || source.pos >= source.samples.len();
                    if done {
                        source.handle.mark_finished();
                    }
                    !done
                });
            },
            |err| {
                tracing::error!(error = %err, "mixer output error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))
}
