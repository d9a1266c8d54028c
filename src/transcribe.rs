//! Fixed-duration microphone transcription
//!
//! Unlike the live path this is bounded, buffered, and single-shot: record
//! for a fixed wall-clock window, package the whole take as WAV, and submit
//! it as one request.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::audio::capture::{AudioCapture, CAPTURE_SAMPLE_RATE, samples_to_wav};
use crate::Result;

/// Recording window in seconds
pub const CAPTURE_SECS: u64 = 5;

/// Fallback when the service returns an empty transcript
const EMPTY_RESULT: &str = "No transcription available.";

/// One-shot remote batch transcription
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a complete audio container and return the text.
    ///
    /// # Errors
    ///
    /// Returns error if the call fails.
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String>;
}

/// Records a bounded microphone sample and submits it for transcription
pub struct TranscriptionCapturer {
    transcriber: Arc<dyn Transcriber>,
    capturing: Arc<AtomicBool>,
}

impl TranscriptionCapturer {
    /// Create a capturer over a transcription backend
    #[must_use]
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            transcriber,
            capturing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True while a capture is in flight
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    /// Record for [`CAPTURE_SECS`] and transcribe the take.
    ///
    /// Returns `None` when a capture is already in flight (toggling does not
    /// stack recordings), otherwise the transcript text.
    ///
    /// # Errors
    ///
    /// Returns error if the microphone cannot be opened or the remote call
    /// fails.
    #[allow(clippy::future_not_send)]
    pub async fn capture_and_transcribe(&self) -> Result<Option<String>> {
        if self.capturing.swap(true, Ordering::SeqCst) {
            tracing::debug!("capture already in flight");
            return Ok(None);
        }

        let result = self.record_and_submit().await;
        self.capturing.store(false, Ordering::SeqCst);
        result.map(Some)
    }

    #[allow(clippy::future_not_send)]
    async fn record_and_submit(&self) -> Result<String> {
        let mut capture = AudioCapture::new()?;
        capture.start()?;
        tracing::info!(seconds = CAPTURE_SECS, "recording");

        tokio::time::sleep(Duration::from_secs(CAPTURE_SECS)).await;

        capture.stop();
        let samples = capture.take_buffer();
        tracing::debug!(samples = samples.len(), "recording complete");

        let wav = samples_to_wav(&samples, CAPTURE_SAMPLE_RATE)?;
        let text = self.transcriber.transcribe(&wav, "audio/wav").await?;

        if text.trim().is_empty() {
            Ok(EMPTY_RESULT.to_string())
        } else {
            Ok(text)
        }
    }
}
