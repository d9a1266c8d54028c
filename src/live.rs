//! Real-time bidirectional voice session
//!
//! The controller owns one streaming session: capture frames flow out
//! continuously while decoded response frames are scheduled onto the output
//! timeline so they play gapless and in arrival order. A server interruption
//! (the user spoke over the response) discards everything queued but not yet
//! played, so the next turn starts cleanly.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::audio::capture::CAPTURE_SAMPLE_RATE;
use crate::audio::pcm::{self, EncodedFrame};
use crate::audio::playback::OUTPUT_SAMPLE_RATE;
use crate::audio::timeline::{OutputTimeline, SourceHandle};
use crate::config::Voice;
use crate::{Error, Result};

/// Capacity of the inbound server event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Decoded event received from the streaming session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A response audio frame (raw 16-bit PCM bytes at the output rate)
    Audio(Vec<u8>),
    /// The user spoke over the response; queued audio must be discarded
    Interrupted,
    /// The model finished a response turn
    TurnComplete,
    /// The session closed
    Closed,
    /// Transport or service error
    Error(String),
}

/// Lifecycle state of the live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session
    #[default]
    Closed,
    /// Connection handshake in progress
    Opening,
    /// Session established, no response audio yet
    Open,
    /// Response audio flowing
    Streaming,
    /// Server signaled an interruption; resumes on the next audio frame
    Interrupted,
}

/// Settings for opening a live session
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Streaming model identifier
    pub model: String,
    /// Response voice
    pub voice: Voice,
    /// System instruction for the conversation
    pub system_instruction: String,
    /// Request transcription of the user's speech
    pub input_transcription: bool,
    /// Request transcription of the model's speech
    pub output_transcription: bool,
}

impl From<&crate::Config> for LiveConfig {
    fn from(config: &crate::Config) -> Self {
        Self {
            model: config.live_model.clone(),
            voice: config.voice,
            system_instruction: config.system_instruction.clone(),
            input_transcription: true,
            output_transcription: true,
        }
    }
}

/// An open bidirectional session handle
pub trait LiveSession: Send {
    /// Transmit one encoded capture frame, fire-and-forget.
    ///
    /// # Errors
    ///
    /// Returns error if the session is no longer writable.
    fn send_frame(&mut self, frame: EncodedFrame) -> Result<()>;

    /// Signal the remote session to close. Idempotent.
    fn close(&mut self);
}

/// Opens live sessions against the remote service
#[async_trait]
pub trait LiveBackend: Send + Sync {
    /// Open a session; decoded server events arrive on `events`.
    ///
    /// # Errors
    ///
    /// Returns error if the connection handshake fails.
    async fn open(
        &self,
        config: &LiveConfig,
        events: mpsc::Sender<ServerEvent>,
    ) -> Result<Box<dyn LiveSession>>;
}

/// Owns the live session state machine.
///
/// The output clock and `next_start_time` cursor belong exclusively to this
/// controller; playback completion only ever removes a finished source from
/// the pending set.
pub struct LiveController {
    timeline: Arc<dyn OutputTimeline>,
    state: SessionState,
    next_start_time: f64,
    pending: Vec<SourceHandle>,
    session: Option<Box<dyn LiveSession>>,
}

impl LiveController {
    /// Create a controller scheduling onto `timeline`
    #[must_use]
    pub fn new(timeline: Arc<dyn OutputTimeline>) -> Self {
        Self {
            timeline,
            state: SessionState::Closed,
            next_start_time: 0.0,
            pending: Vec::new(),
            session: None,
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Scheduled start time for the next response frame, seconds
    #[must_use]
    pub const fn next_start_time(&self) -> f64 {
        self.next_start_time
    }

    /// Number of scheduled, not-yet-finished response sources
    #[must_use]
    pub fn pending_sources(&self) -> usize {
        self.pending.len()
    }

    /// Open a session through `backend`.
    ///
    /// Returns the receiver of decoded server events, to be passed to
    /// [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// Returns error if a session is already open or the handshake fails.
    pub async fn open(
        &mut self,
        backend: &dyn LiveBackend,
        config: &LiveConfig,
    ) -> Result<mpsc::Receiver<ServerEvent>> {
        if self.session.is_some() {
            return Err(Error::Session("session already open".to_string()));
        }

        self.state = SessionState::Opening;
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        match backend.open(config, events_tx).await {
            Ok(session) => {
                self.session = Some(session);
                self.state = SessionState::Open;
                self.next_start_time = 0.0;
                tracing::info!(model = %config.model, voice = %config.voice, "live session open");
                Ok(events_rx)
            }
            Err(e) => {
                self.state = SessionState::Closed;
                Err(e)
            }
        }
    }

    /// Drive the session until it closes.
    ///
    /// Consumes capture frames (encoding and sending each in capture order)
    /// and server events (scheduling response audio in arrival order) on a
    /// single dispatch loop.
    pub async fn run(
        &mut self,
        frames: &mut mpsc::Receiver<Vec<f32>>,
        events: &mut mpsc::Receiver<ServerEvent>,
    ) {
        loop {
            tokio::select! {
                maybe_frame = frames.recv() => match maybe_frame {
                    Some(frame) => self.send_capture_frame(&frame),
                    None => {
                        tracing::debug!("capture channel closed");
                        self.close();
                        break;
                    }
                },
                maybe_event = events.recv() => match maybe_event {
                    Some(event) => {
                        if !self.handle_server_event(event) {
                            break;
                        }
                    }
                    None => {
                        tracing::debug!("event channel closed");
                        self.close();
                        break;
                    }
                },
            }

            if self.state == SessionState::Closed {
                break;
            }
        }
    }

    /// Encode and transmit one capture frame.
    ///
    /// Send order is capture order; no backpressure is applied here. A send
    /// failure closes the session.
    pub fn send_capture_frame(&mut self, samples: &[f32]) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let frame = pcm::encode_frame(samples, CAPTURE_SAMPLE_RATE);
        if let Err(e) = session.send_frame(frame) {
            tracing::error!(error = %e, "capture frame send failed");
            self.close();
        }
    }

    /// Apply one server event. Returns `false` once the session is over.
    pub fn handle_server_event(&mut self, event: ServerEvent) -> bool {
        self.prune_finished();

        match event {
            ServerEvent::Audio(bytes) => {
                self.schedule_response_audio(&bytes);
                true
            }
            ServerEvent::Interrupted => {
                tracing::debug!(flushed = self.pending.len(), "server interruption");
                for handle in self.pending.drain(..) {
                    handle.stop();
                }
                self.next_start_time = 0.0;
                self.state = SessionState::Interrupted;
                true
            }
            ServerEvent::TurnComplete => {
                tracing::trace!("turn complete");
                true
            }
            ServerEvent::Error(message) => {
                tracing::error!(error = %message, "live session error");
                self.close();
                false
            }
            ServerEvent::Closed => {
                tracing::debug!("server closed session");
                self.close();
                false
            }
        }
    }

    /// Decode a response frame and place it on the output timeline.
    ///
    /// Frames start at `max(next_start_time, now)`: back-to-back with no gap
    /// or overlap regardless of decode latency, and never in the past. A
    /// frame that fails to decode or schedule is skipped; the session
    /// continues.
    fn schedule_response_audio(&mut self, bytes: &[u8]) {
        let buffer = match pcm::decode_audio(bytes, OUTPUT_SAMPLE_RATE, 1) {
            Ok(buffer) => buffer,
            Err(e) => {
                tracing::warn!(error = %e, "skipping undecodable response frame");
                return;
            }
        };

        let duration = buffer.duration_secs();
        let start = self.next_start_time.max(self.timeline.now());

        match self.timeline.schedule(buffer, start) {
            Ok(handle) => {
                self.pending.push(handle);
                self.next_start_time = start + duration;
                self.state = SessionState::Streaming;
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping unschedulable response frame");
            }
        }
    }

    /// Close the session. Idempotent; safe when no session is open.
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
            tracing::info!("live session closed");
        }
        self.state = SessionState::Closed;
    }

    /// Drop pending handles whose sources played out naturally
    fn prune_finished(&mut self) {
        self.pending.retain(|handle| !handle.is_finished());
    }
}
