//! End-to-end pipeline properties: chunking and the PCM wire codec
//!
//! These cover the contracts the remote service depends on, without audio
//! hardware or network access.

use voice_studio::audio::capture::{CAPTURE_SAMPLE_RATE, samples_to_wav};
use voice_studio::audio::pcm;
use voice_studio::audio::playback::OUTPUT_SAMPLE_RATE;
use voice_studio::chunk::split_text;
use voice_studio::config::MAX_CHUNK_SIZE;

mod common;

// ---- chunking ----

#[test]
fn two_thousand_chars_with_periodic_sentences_yield_three_chunks() {
    // Periods roughly every 100 characters, nothing else to break on
    let sentence = format!("{}. ", "word ".repeat(19).trim());
    assert_eq!(sentence.len(), 96);
    let text = sentence.repeat(21);
    let text = text.trim();

    let chunks = split_text(text, MAX_CHUNK_SIZE);

    assert_eq!(chunks.len(), 3);
    for chunk in &chunks {
        assert!(chunk.ends_with('.'), "chunk does not end on a period");
        assert!(chunk.chars().count() <= MAX_CHUNK_SIZE);
    }

    // Total characters: the input minus the separator consumed at each cut
    let total: usize = chunks.iter().map(|c| c.chars().count()).sum();
    assert_eq!(total, text.chars().count() - (chunks.len() - 1));
}

#[test]
fn chunks_reconstruct_the_source_text() {
    let text = "It was a bright cold day in April. The clocks were striking thirteen! \
                Winston Smith slipped quickly through the glass doors? Though not \
                quickly enough to prevent a swirl of gritty dust from entering along with him.";
    let chunks = split_text(text, 60);

    let rejoined = chunks.join(" ");
    let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
    assert_eq!(normalize(&rejoined), normalize(text));
}

// ---- wire codec ----

#[test]
fn capture_frame_survives_the_wire() {
    let samples = common::generate_sine_samples(440.0, 0.25, CAPTURE_SAMPLE_RATE, 0.8);

    // Encode as a capture frame, decode as the service would
    let frame = pcm::encode_frame(&samples, CAPTURE_SAMPLE_RATE);
    assert_eq!(frame.mime_type, "audio/pcm;rate=16000");
    assert_eq!(frame.bytes.len(), samples.len() * 2);

    let decoded = pcm::decode_audio(&frame.bytes, CAPTURE_SAMPLE_RATE, 1).unwrap();
    assert_eq!(decoded.frames(), samples.len());
    for (&original, &roundtrip) in samples.iter().zip(decoded.plane(0)) {
        assert!((original - roundtrip).abs() <= 1.0 / 32768.0);
    }
}

#[test]
fn transport_text_round_trip_matches_bytes() {
    let samples = common::generate_sine_samples(220.0, 0.1, OUTPUT_SAMPLE_RATE, 0.5);
    let frame = pcm::encode_frame(&samples, OUTPUT_SAMPLE_RATE);

    let text = pcm::bytes_to_text(&frame.bytes);
    assert_eq!(pcm::text_to_bytes(&text), frame.bytes);
}

#[test]
fn silence_encodes_to_zero_bytes_and_back() {
    let samples = common::generate_silence(0.1, OUTPUT_SAMPLE_RATE);
    let frame = pcm::encode_frame(&samples, OUTPUT_SAMPLE_RATE);

    assert!(frame.bytes.iter().all(|&b| b == 0));
    let decoded = pcm::decode_audio(&frame.bytes, OUTPUT_SAMPLE_RATE, 1).unwrap();
    assert!(decoded.plane(0).iter().all(|&s| s == 0.0));
}

// ---- transcription container ----

#[test]
fn transcription_take_encodes_as_wav() {
    let samples = common::generate_sine_samples(300.0, 0.5, CAPTURE_SAMPLE_RATE, 0.4);
    let wav = samples_to_wav(&samples, CAPTURE_SAMPLE_RATE).unwrap();

    assert_eq!(&wav[..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");
    // 16-bit mono payload: two bytes per sample plus the 44-byte header
    assert_eq!(wav.len(), samples.len() * 2 + 44);
}
