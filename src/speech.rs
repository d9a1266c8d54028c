//! Long-form text-to-speech playback scheduling
//!
//! Long text is split into bounded chunks, each synthesized remotely and
//! played to completion before the next begins. Chunks are strictly
//! sequential, never overlapped, which preserves narration order and
//! bounds memory to one decoded buffer at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::audio::pcm;
use crate::audio::playback::{AudioOut, OUTPUT_SAMPLE_RATE};
use crate::chunk::split_text;
use crate::config::Voice;
use crate::Result;

/// Phase of a synthesis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    /// No run in progress
    #[default]
    Idle,
    /// Waiting on synthesis or decode
    Processing,
    /// A chunk is playing
    Playing,
    /// The run failed; scheduler remains usable
    Error,
}

/// Observable state of the long-form scheduler
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackState {
    /// A run is active
    pub is_playing: bool,
    /// Percentage of chunks started, 0–100
    pub progress: f32,
    /// 1-indexed chunk currently in flight (0 before the first)
    pub current_chunk: usize,
    /// Chunks in this run
    pub total_chunks: usize,
    /// Current phase
    pub status: PlaybackStatus,
}

/// One-shot remote speech synthesis.
///
/// `rate` is approximate: the service offers no guaranteed rate parameter,
/// so implementations fold it into the request as instruction text.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` and return the raw audio payload bytes.
    ///
    /// # Errors
    ///
    /// Returns a distinguishable error when the call fails or the service
    /// returns no audio.
    async fn synthesize(&self, text: &str, voice: Voice, rate: f32) -> Result<Vec<u8>>;
}

/// Sequential chunk scheduler for long-form synthesis.
///
/// Clones share the same run state and stop flag, so a clone handed to a
/// UI or signal handler can stop the run.
#[derive(Clone)]
pub struct SpeechPlayer {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioOut>,
    state: Arc<Mutex<PlaybackState>>,
    stopping: Arc<AtomicBool>,
    chunk_budget: usize,
}

impl SpeechPlayer {
    /// Create a scheduler over a synthesizer and an output sink
    #[must_use]
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sink: Arc<dyn AudioOut>,
        chunk_budget: usize,
    ) -> Self {
        Self {
            synthesizer,
            sink,
            state: Arc::new(Mutex::new(PlaybackState::default())),
            stopping: Arc::new(AtomicBool::new(false)),
            chunk_budget,
        }
    }

    /// Snapshot of the current run state
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state.lock().map(|state| state.clone()).unwrap_or_default()
    }

    /// Stop the active run.
    ///
    /// Sets the stop flag (checked before each chunk boundary), halts the
    /// chunk currently playing, and resets the state to idle. Idempotent;
    /// safe when no run is active.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.sink.stop();
        self.update(|state| {
            state.is_playing = false;
            state.status = PlaybackStatus::Idle;
            state.progress = 0.0;
        });
        tracing::debug!("playback stopped");
    }

    /// Synthesize `text` chunk by chunk and play it back in order.
    ///
    /// No-op for text that is empty after trimming. Resolves once every
    /// chunk has played, the run was stopped, or a chunk failed.
    ///
    /// # Errors
    ///
    /// Returns error if synthesis, decode, or playback of any chunk fails;
    /// remaining chunks are abandoned.
    #[allow(clippy::cast_precision_loss)]
    pub async fn synthesize_and_play(&self, text: &str, voice: Voice, rate: f32) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        self.stopping.store(false, Ordering::SeqCst);
        let chunks = split_text(text, self.chunk_budget);
        let total = chunks.len();

        tracing::info!(chunks = total, voice = %voice, rate, "synthesis run started");
        self.update(|state| {
            *state = PlaybackState {
                is_playing: true,
                progress: 0.0,
                current_chunk: 0,
                total_chunks: total,
                status: PlaybackStatus::Processing,
            };
        });

        for (index, chunk) in chunks.iter().enumerate() {
            if self.stopping.load(Ordering::SeqCst) {
                break;
            }

            // Progress is reported before the chunk starts
            self.update(|state| {
                state.status = PlaybackStatus::Processing;
                state.current_chunk = index + 1;
                state.progress = (index as f32 / total as f32) * 100.0;
            });

            let bytes = match self.synthesizer.synthesize(chunk, voice, rate).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    self.fail();
                    return Err(e);
                }
            };

            if self.stopping.load(Ordering::SeqCst) {
                break;
            }

            let buffer = match pcm::decode_audio(&bytes, OUTPUT_SAMPLE_RATE, 1) {
                Ok(buffer) => buffer,
                Err(e) => {
                    self.fail();
                    return Err(e);
                }
            };

            self.update(|state| {
                state.status = PlaybackStatus::Playing;
                state.is_playing = true;
            });

            tracing::debug!(chunk = index + 1, total, frames = buffer.frames(), "chunk playing");
            if let Err(e) = self.sink.play(&buffer).await {
                self.fail();
                return Err(e);
            }
        }

        if !self.stopping.load(Ordering::SeqCst) {
            self.update(|state| {
                state.is_playing = false;
                state.status = PlaybackStatus::Idle;
                state.progress = 100.0;
            });
            tracing::info!(chunks = total, "synthesis run complete");
        }

        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut PlaybackState)) {
        if let Ok(mut state) = self.state.lock() {
            apply(&mut state);
        }
    }

    fn fail(&self) {
        self.update(|state| {
            state.status = PlaybackStatus::Error;
            state.is_playing = false;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle() {
        let state = PlaybackState::default();
        assert!(!state.is_playing);
        assert_eq!(state.status, PlaybackStatus::Idle);
        assert_eq!(state.progress, 0.0);
        assert_eq!(state.total_chunks, 0);
    }
}
