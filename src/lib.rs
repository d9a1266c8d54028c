//! voice-studio - Voice client for generative AI audio services
//!
//! This library provides the core functionality for voice-studio:
//! - Long-form text-to-speech with chunked, cancellable playback
//! - Bounded single-shot speech transcription
//! - Real-time bidirectional voice conversation with interruption handling
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Operator CLI                      │
//! │      speak       │   transcribe   │      live       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  voice-studio core                   │
//! │  Chunker │ PCM Codec │ Scheduler │ Live Controller  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              Remote audio service                    │
//! │   synthesize  │  transcribe  │  live session (WS)   │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod chunk;
pub mod config;
pub mod error;
pub mod gemini;
pub mod live;
pub mod speech;
pub mod transcribe;

pub use config::{Config, Voice};
pub use error::{Error, Result};
pub use live::{LiveBackend, LiveConfig, LiveController, LiveSession, ServerEvent, SessionState};
pub use speech::{PlaybackState, PlaybackStatus, SpeechPlayer, SpeechSynthesizer};
pub use transcribe::{Transcriber, TranscriptionCapturer};
