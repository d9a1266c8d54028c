//! Gemini API client
//!
//! Default implementation of the remote collaborators: one-shot speech
//! synthesis and batch transcription over REST, and the live bidirectional
//! session over WebSocket (see [`live`]).

mod live;

pub use live::GeminiLive;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::json;

use crate::config::{self, Config, Voice};
use crate::speech::SpeechSynthesizer;
use crate::transcribe::Transcriber;
use crate::{Error, Result};

/// REST API base
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for the one-shot REST surface
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    tts_model: String,
    transcribe_model: String,
}

impl GeminiClient {
    /// Create a client, reading the API credential from the environment
    ///
    /// # Errors
    ///
    /// Returns error if the credential is not set
    pub fn from_env(config: &Config) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: config::api_key()?,
            tts_model: config.tts_model.clone(),
            transcribe_model: config.transcribe_model.clone(),
        })
    }

    /// POST a `generateContent` request and parse the response
    async fn generate(
        &self,
        model: &str,
        body: serde_json::Value,
        api_error: fn(String) -> Error,
    ) -> Result<GenerateResponse> {
        let url = format!("{API_BASE}/models/{model}:generateContent");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(status = %status, model, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(format!("API error {status}: {body}")));
        }

        let parsed = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            e
        })?;
        Ok(parsed)
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiClient {
    async fn synthesize(&self, text: &str, voice: Voice, rate: f32) -> Result<Vec<u8>> {
        // Prompt-based speed control: the prebuilt voice config carries no
        // rate parameter, so the requested rate is approximate
        let prompt = format!("Speak at {rate}x speed: {text}");

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice.name() } }
                }
            }
        });

        tracing::debug!(chars = text.chars().count(), voice = %voice, rate, "starting synthesis");

        let response = self.generate(&self.tts_model, body, Error::Synthesis).await?;
        let encoded = response
            .first_inline_data()
            .ok_or_else(|| Error::Synthesis("no audio data received".to_string()))?;
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| Error::Synthesis(format!("audio payload not base64: {e}")))?;

        tracing::debug!(bytes = bytes.len(), "synthesis complete");
        Ok(bytes)
    }
}

#[async_trait]
impl Transcriber for GeminiClient {
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String> {
        let body = json!({
            "contents": [{ "parts": [
                { "inlineData": { "mimeType": mime_type, "data": BASE64.encode(audio) } },
                { "text": "Transcribe this audio accurately. \
                           If it's silent, say 'No speech detected'." }
            ] }]
        });

        tracing::debug!(audio_bytes = audio.len(), "starting transcription");

        let response = self
            .generate(&self.transcribe_model, body, Error::Transcription)
            .await?;
        let text = response.text();

        tracing::info!(transcript = %text, "transcription complete");
        Ok(text)
    }
}

/// Response from the `generateContent` endpoint
#[derive(serde::Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(serde::Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(serde::Deserialize)]
struct Content {
    parts: Option<Vec<Part>>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(serde::Deserialize)]
struct InlineData {
    data: String,
}

impl GenerateResponse {
    /// First inline media payload in the first candidate
    fn first_inline_data(&self) -> Option<&str> {
        self.parts()?
            .iter()
            .find_map(|part| part.inline_data.as_ref().map(|data| data.data.as_str()))
    }

    /// All text parts of the first candidate, concatenated
    fn text(&self) -> String {
        self.parts()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }

    fn parts(&self) -> Option<&[Part]> {
        self.candidates
            .as_ref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_extracts_inline_audio() {
        let raw = r#"{
            "candidates": [{
                "content": { "parts": [
                    { "inlineData": { "mimeType": "audio/pcm", "data": "AAEC" } }
                ] }
            }]
        }"#;
        let response: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.first_inline_data(), Some("AAEC"));
        assert!(response.text().is_empty());
    }

    #[test]
    fn response_concatenates_text_parts() {
        let raw = r#"{
            "candidates": [{
                "content": { "parts": [
                    { "text": "Hello " },
                    { "text": "world" }
                ] }
            }]
        }"#;
        let response: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.text(), "Hello world");
        assert!(response.first_inline_data().is_none());
    }

    #[test]
    fn empty_response_has_no_audio_or_text() {
        let response: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(response.first_inline_data().is_none());
        assert!(response.text().is_empty());
    }
}
