//! Configuration for voice-studio

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Environment variable holding the service API credential
const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Character budget per synthesis request (kept bounded for stability)
pub const MAX_CHUNK_SIZE: usize = 800;

/// Prebuilt voice for synthesis and live conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Voice {
    /// Deep and resonant masculine voice
    Kore,
    /// Energetic and youthful voice
    Puck,
    /// Calm and steady narrator voice
    Charon,
    /// Powerful and authoritative voice
    Fenrir,
    /// Light and airy professional voice
    #[default]
    Zephyr,
}

impl Voice {
    /// All selectable voices
    pub const ALL: [Self; 5] = [Self::Kore, Self::Puck, Self::Charon, Self::Fenrir, Self::Zephyr];

    /// Service-side voice identifier
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Kore => "Kore",
            Self::Puck => "Puck",
            Self::Charon => "Charon",
            Self::Fenrir => "Fenrir",
            Self::Zephyr => "Zephyr",
        }
    }

    /// One-line description for selection UIs
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Kore => "Deep and resonant masculine voice",
            Self::Puck => "Energetic and youthful voice",
            Self::Charon => "Calm and steady narrator voice",
            Self::Fenrir => "Powerful and authoritative voice",
            Self::Zephyr => "Light and airy professional voice",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Voice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Config(format!("unknown voice: {s}")))
    }
}

/// voice-studio configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Voice used for synthesis and live conversation
    pub voice: Voice,

    /// Speech rate multiplier (0.5 to 2.0). Approximate: the service has no
    /// guaranteed rate parameter, so the rate is folded into the request as
    /// instruction text.
    pub speech_rate: f32,

    /// Character budget per synthesis request
    pub chunk_budget: usize,

    /// Model for one-shot speech synthesis
    pub tts_model: String,

    /// Model for batch transcription
    pub transcribe_model: String,

    /// Model for the live bidirectional session
    pub live_model: String,

    /// System instruction for the live conversation
    pub system_instruction: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            voice: Voice::default(),
            speech_rate: 1.0,
            chunk_budget: MAX_CHUNK_SIZE,
            tts_model: "gemini-2.5-flash-preview-tts".to_string(),
            transcribe_model: "gemini-3-flash-preview".to_string(),
            live_model: "gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
            system_instruction: "You are a helpful and charismatic AI assistant \
                                 with a professional tone."
                .to_string(),
        }
    }
}

/// Read the service API credential from the environment.
///
/// The credential is opaque to this crate: read at call time, never parsed
/// or validated locally.
///
/// # Errors
///
/// Returns error if the variable is unset or empty.
pub fn api_key() -> Result<String> {
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(Error::Config(format!("{API_KEY_ENV} is not set"))),
    }
}
