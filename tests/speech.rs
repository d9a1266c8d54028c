//! Long-form playback scheduler integration tests
//!
//! Exercises the scheduler against mock synthesis and output sinks, without
//! audio hardware or network access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use voice_studio::audio::AudioOut;
use voice_studio::audio::pcm::SampleBuffer;
use voice_studio::{Error, PlaybackStatus, Result, SpeechPlayer, SpeechSynthesizer, Voice};

mod common;

/// Three sentences that chunk to exactly three segments at a budget of 20
const THREE_SENTENCES: &str = "Alpha alpha alpha. Beta beta beta. Gamma gamma gamma.";
const BUDGET: usize = 20;

/// Synthesizer returning silent PCM, recording every request and the
/// scheduler state observed at request time
struct MockSynthesizer {
    chunks: Mutex<Vec<String>>,
    progress_seen: Mutex<Vec<f32>>,
    player: Mutex<Option<SpeechPlayer>>,
    fail_on_call: Option<usize>,
    calls: AtomicUsize,
}

impl MockSynthesizer {
    fn new(fail_on_call: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            chunks: Mutex::new(Vec::new()),
            progress_seen: Mutex::new(Vec::new()),
            player: Mutex::new(None),
            fail_on_call,
            calls: AtomicUsize::new(0),
        })
    }

    fn observe(&self, player: &SpeechPlayer) {
        *self.player.lock().unwrap() = Some(player.clone());
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, _voice: Voice, _rate: f32) -> Result<Vec<u8>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(Error::Synthesis("no audio data received".to_string()));
        }

        self.chunks.lock().unwrap().push(text.to_string());
        if let Some(player) = self.player.lock().unwrap().as_ref() {
            self.progress_seen.lock().unwrap().push(player.state().progress);
        }

        // 10ms of silence at the service output rate
        Ok(common::silent_pcm_bytes(240))
    }
}

/// Sink that counts buffers and can stop the run during the first play
#[derive(Default)]
struct MockSink {
    played: AtomicUsize,
    stop_during_play: Mutex<Option<SpeechPlayer>>,
}

#[async_trait]
impl AudioOut for MockSink {
    async fn play(&self, _buffer: &SampleBuffer) -> Result<()> {
        self.played.fetch_add(1, Ordering::SeqCst);
        if let Some(player) = self.stop_during_play.lock().unwrap().take() {
            player.stop();
        }
        Ok(())
    }

    fn stop(&self) {}
}

fn player_with(
    synthesizer: &Arc<MockSynthesizer>,
    sink: &Arc<MockSink>,
) -> SpeechPlayer {
    let player = SpeechPlayer::new(
        Arc::clone(synthesizer) as Arc<dyn SpeechSynthesizer>,
        Arc::clone(sink) as Arc<dyn AudioOut>,
        BUDGET,
    );
    synthesizer.observe(&player);
    player
}

#[tokio::test]
async fn empty_text_is_a_no_op() {
    let synthesizer = MockSynthesizer::new(None);
    let sink = Arc::new(MockSink::default());
    let player = player_with(&synthesizer, &sink);

    player.synthesize_and_play("   ", Voice::Zephyr, 1.0).await.unwrap();

    assert_eq!(synthesizer.call_count(), 0);
    let state = player.state();
    assert!(!state.is_playing);
    assert_eq!(state.status, PlaybackStatus::Idle);
    assert_eq!(state.total_chunks, 0);
}

#[tokio::test]
async fn chunks_play_in_order_with_stepped_progress() {
    let synthesizer = MockSynthesizer::new(None);
    let sink = Arc::new(MockSink::default());
    let player = player_with(&synthesizer, &sink);

    player
        .synthesize_and_play(THREE_SENTENCES, Voice::Kore, 1.5)
        .await
        .unwrap();

    let chunks = synthesizer.chunks.lock().unwrap().clone();
    assert_eq!(
        chunks,
        vec!["Alpha alpha alpha.", "Beta beta beta.", "Gamma gamma gamma."]
    );
    assert_eq!(sink.played.load(Ordering::SeqCst), 3);

    // Progress is reported before each chunk starts
    let progress = synthesizer.progress_seen.lock().unwrap().clone();
    assert_eq!(progress.len(), 3);
    assert!(progress[0].abs() < 0.1);
    assert!((progress[1] - 33.3).abs() < 0.5);
    assert!((progress[2] - 66.7).abs() < 0.5);

    let state = player.state();
    assert!(!state.is_playing);
    assert_eq!(state.status, PlaybackStatus::Idle);
    assert!((state.progress - 100.0).abs() < f32::EPSILON);
    assert_eq!(state.current_chunk, 3);
    assert_eq!(state.total_chunks, 3);
}

#[tokio::test]
async fn stop_during_first_chunk_abandons_the_rest() {
    let synthesizer = MockSynthesizer::new(None);
    let sink = Arc::new(MockSink::default());
    let player = player_with(&synthesizer, &sink);
    *sink.stop_during_play.lock().unwrap() = Some(player.clone());

    player
        .synthesize_and_play(THREE_SENTENCES, Voice::Zephyr, 1.0)
        .await
        .unwrap();

    // The stop flag was set while chunk one played; no further synthesis
    assert_eq!(synthesizer.call_count(), 1);
    assert_eq!(sink.played.load(Ordering::SeqCst), 1);

    let state = player.state();
    assert!(!state.is_playing);
    assert_eq!(state.status, PlaybackStatus::Idle);
    assert_eq!(state.progress, 0.0);
}

#[tokio::test]
async fn stop_is_idempotent_when_nothing_plays() {
    let synthesizer = MockSynthesizer::new(None);
    let sink = Arc::new(MockSink::default());
    let player = player_with(&synthesizer, &sink);

    player.stop();
    player.stop();

    let state = player.state();
    assert!(!state.is_playing);
    assert_eq!(state.status, PlaybackStatus::Idle);
    assert_eq!(state.progress, 0.0);
}

#[tokio::test]
async fn synthesis_failure_is_terminal_for_the_run() {
    let synthesizer = MockSynthesizer::new(Some(2));
    let sink = Arc::new(MockSink::default());
    let player = player_with(&synthesizer, &sink);

    let result = player
        .synthesize_and_play(THREE_SENTENCES, Voice::Zephyr, 1.0)
        .await;

    assert!(matches!(result, Err(Error::Synthesis(_))));
    // Chunk three was never attempted
    assert_eq!(synthesizer.call_count(), 2);

    let state = player.state();
    assert_eq!(state.status, PlaybackStatus::Error);
    assert!(!state.is_playing);
}

#[tokio::test]
async fn scheduler_is_reusable_after_an_error() {
    let synthesizer = MockSynthesizer::new(Some(1));
    let sink = Arc::new(MockSink::default());
    let player = player_with(&synthesizer, &sink);

    assert!(
        player
            .synthesize_and_play("Hello there.", Voice::Zephyr, 1.0)
            .await
            .is_err()
    );
    assert_eq!(player.state().status, PlaybackStatus::Error);

    // The failing call is behind us; the next run succeeds
    player
        .synthesize_and_play("Hello again.", Voice::Zephyr, 1.0)
        .await
        .unwrap();
    assert_eq!(player.state().status, PlaybackStatus::Idle);
    assert!((player.state().progress - 100.0).abs() < f32::EPSILON);
}

/// Undecodable audio aborts the run with a decode error
#[tokio::test]
async fn decode_failure_is_terminal_for_the_run() {
    struct OddBytes;

    #[async_trait]
    impl SpeechSynthesizer for OddBytes {
        async fn synthesize(&self, _text: &str, _voice: Voice, _rate: f32) -> Result<Vec<u8>> {
            Ok(vec![0, 1, 2])
        }
    }

    let sink = Arc::new(MockSink::default());
    let player = SpeechPlayer::new(Arc::new(OddBytes), sink, BUDGET);

    let result = player.synthesize_and_play("Hello.", Voice::Zephyr, 1.0).await;
    assert!(matches!(result, Err(Error::Decode(_))));
    assert_eq!(player.state().status, PlaybackStatus::Error);
}
