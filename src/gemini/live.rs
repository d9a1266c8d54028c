//! Gemini Live WebSocket backend
//!
//! Opens the bidirectional streaming endpoint, performs the setup handshake,
//! and then bridges the socket to the session abstraction: capture frames go
//! out through an outbound channel and writer task, server payloads are
//! decoded into [`ServerEvent`]s by a reader task.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::audio::pcm::EncodedFrame;
use crate::config;
use crate::live::{LiveBackend, LiveConfig, LiveSession, ServerEvent};
use crate::{Error, Result};

/// Bidirectional streaming endpoint
const LIVE_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/\
                             google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Outbound capture-frame queue depth (the only backpressure tunable; frames
/// beyond it are dropped rather than delaying capture)
const OUTBOUND_CHANNEL_CAPACITY: usize = 32;

/// Live session backend for the Gemini streaming API
pub struct GeminiLive {
    api_key: String,
}

impl GeminiLive {
    /// Create a backend, reading the API credential from the environment
    ///
    /// # Errors
    ///
    /// Returns error if the credential is not set
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_key: config::api_key()?,
        })
    }
}

#[async_trait]
impl LiveBackend for GeminiLive {
    async fn open(
        &self,
        config: &LiveConfig,
        events: mpsc::Sender<ServerEvent>,
    ) -> Result<Box<dyn LiveSession>> {
        let url = format!("{LIVE_ENDPOINT}?key={}", self.api_key);
        let (socket, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| Error::Session(format!("connect failed: {e}")))?;
        let (mut sink, mut stream) = socket.split();

        sink.send(Message::Text(setup_message(config).to_string()))
            .await
            .map_err(|e| Error::Session(format!("setup send failed: {e}")))?;

        // The service acknowledges setup before it accepts audio
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    if is_setup_complete(text.as_bytes()) {
                        break;
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    if is_setup_complete(&data) {
                        break;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(Error::Session(format!("handshake failed: {e}"))),
                None => {
                    return Err(Error::Session("connection closed during handshake".to_string()));
                }
            }
        }
        tracing::debug!(model = %config.model, "live setup complete");

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<EncodedFrame>(OUTBOUND_CHANNEL_CAPACITY);

        // Writer: stream capture frames until the session handle is dropped
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let payload = json!({
                    "realtimeInput": {
                        "mediaChunks": [{
                            "mimeType": frame.mime_type,
                            "data": BASE64.encode(&frame.bytes)
                        }]
                    }
                });
                if let Err(e) = sink.send(Message::Text(payload.to_string())).await {
                    tracing::error!(error = %e, "outbound send failed");
                    break;
                }
            }
            let _ = sink.send(Message::Close(None)).await;
            tracing::debug!("writer task finished");
        });

        // Reader: decode server payloads into events
        tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if !forward_server_payload(text.as_bytes(), &events).await {
                            return;
                        }
                    }
                    Ok(Message::Binary(data)) => {
                        if !forward_server_payload(&data, &events).await {
                            return;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        let _ = events.send(ServerEvent::Closed).await;
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = events.send(ServerEvent::Error(e.to_string())).await;
                        return;
                    }
                }
            }
            let _ = events.send(ServerEvent::Closed).await;
        });

        Ok(Box::new(GeminiLiveSession {
            outbound: Some(outbound_tx),
        }))
    }
}

/// Session handle backed by the outbound channel
struct GeminiLiveSession {
    outbound: Option<mpsc::Sender<EncodedFrame>>,
}

impl LiveSession for GeminiLiveSession {
    fn send_frame(&mut self, frame: EncodedFrame) -> Result<()> {
        let Some(outbound) = self.outbound.as_ref() else {
            return Err(Error::Session("session closed".to_string()));
        };

        match outbound.try_send(frame) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("outbound frame dropped: channel full");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(Error::Session("session transport gone".to_string()))
            }
        }
    }

    fn close(&mut self) {
        // Dropping the sender drains the writer, which closes the socket
        self.outbound.take();
    }
}

/// Build the session setup payload
fn setup_message(config: &LiveConfig) -> Value {
    let mut setup = json!({
        "model": format!("models/{}", config.model),
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": config.voice.name() } }
            }
        },
        "systemInstruction": { "parts": [{ "text": config.system_instruction }] }
    });
    if config.input_transcription {
        setup["inputAudioTranscription"] = json!({});
    }
    if config.output_transcription {
        setup["outputAudioTranscription"] = json!({});
    }
    json!({ "setup": setup })
}

fn is_setup_complete(raw: &[u8]) -> bool {
    serde_json::from_slice::<Value>(raw)
        .is_ok_and(|value| value.get("setupComplete").is_some())
}

/// Decode one server payload into events. Returns `false` once the event
/// receiver is gone and reading should stop.
async fn forward_server_payload(raw: &[u8], events: &mpsc::Sender<ServerEvent>) -> bool {
    let value: Value = match serde_json::from_slice(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable server payload");
            return true;
        }
    };

    for event in parse_server_content(&value) {
        if events.send(event).await.is_err() {
            return false;
        }
    }
    true
}

/// Extract events from a `serverContent` payload
fn parse_server_content(value: &Value) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    let Some(content) = value.get("serverContent") else {
        return events;
    };

    if let Some(parts) = content.pointer("/modelTurn/parts").and_then(Value::as_array) {
        for part in parts {
            let Some(data) = part.pointer("/inlineData/data").and_then(Value::as_str) else {
                continue;
            };
            match BASE64.decode(data) {
                Ok(bytes) => events.push(ServerEvent::Audio(bytes)),
                Err(e) => tracing::warn!(error = %e, "audio frame not base64"),
            }
        }
    }

    if content.get("interrupted").and_then(Value::as_bool) == Some(true) {
        events.push(ServerEvent::Interrupted);
    }
    if content.get("turnComplete").and_then(Value::as_bool) == Some(true) {
        events.push(ServerEvent::TurnComplete);
    }

    events
}
