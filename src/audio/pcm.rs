//! PCM codec for the service wire format
//!
//! The remote service exchanges raw little-endian 16-bit PCM. This module
//! converts between transport bytes, normalized f32 sample planes, and a
//! transport-safe text form (one character per byte, code points 0–255).
//!
//! The numeric mapping is the wire contract: `i16 = round(f32 * 32768)` on
//! encode and `f32 = i16 / 32768` on decode, with no dithering and no
//! clamping. A float round-trip is therefore lossy at the LSB while a
//! byte round-trip is exact.

use crate::{Error, Result};

/// Decoded audio: per-channel sample planes at a known rate
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    planes: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Build a buffer from existing planes.
    ///
    /// # Errors
    ///
    /// Returns error if there are no planes or the planes differ in length.
    pub fn from_planes(planes: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        let first = planes
            .first()
            .ok_or_else(|| Error::Decode("sample buffer needs at least one channel".to_string()))?
            .len();
        if planes.iter().any(|p| p.len() != first) {
            return Err(Error::Decode("channel planes differ in length".to_string()));
        }
        Ok(Self { planes, sample_rate })
    }

    /// Number of channels
    #[must_use]
    pub fn channels(&self) -> usize {
        self.planes.len()
    }

    /// Frames per channel
    #[must_use]
    pub fn frames(&self) -> usize {
        self.planes.first().map_or(0, Vec::len)
    }

    /// Sample rate in Hz
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Samples for one channel
    #[must_use]
    pub fn plane(&self, channel: usize) -> &[f32] {
        &self.planes[channel]
    }
}

/// An encoded capture frame ready for transmission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Little-endian 16-bit PCM payload
    pub bytes: Vec<u8>,
    /// PCM mime descriptor carrying the sample rate
    pub mime_type: String,
}

/// Map each byte to the character of the same code point.
///
/// The inverse of [`text_to_bytes`]; round-trips exactly for any byte input.
#[must_use]
pub fn bytes_to_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Map each character back to its byte.
///
/// Only text produced by [`bytes_to_text`] is valid input; characters above
/// code point 255 never occur internally, so this is an invariant rather
/// than a public error path.
#[must_use]
pub fn text_to_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let code = u32::from(c);
            debug_assert!(code <= 0xFF, "transport text outside byte range: {code:#x}");
            #[allow(clippy::cast_possible_truncation)]
            {
                code as u8
            }
        })
        .collect()
}

/// Decode little-endian 16-bit PCM bytes into normalized sample planes.
///
/// Samples are deinterleaved into `channels` planes of `len / channels`
/// frames each and normalized by dividing by 32768.
///
/// # Errors
///
/// Returns error if `channels` is zero or the payload is not 16-bit aligned.
pub fn decode_audio(bytes: &[u8], sample_rate: u32, channels: usize) -> Result<SampleBuffer> {
    if channels == 0 {
        return Err(Error::Decode("channel count must be non-zero".to_string()));
    }
    if bytes.len() % 2 != 0 {
        return Err(Error::Decode(format!(
            "PCM payload of {} bytes is not 16-bit aligned",
            bytes.len()
        )));
    }

    let samples: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    let frames = samples.len() / channels;
    let mut planes: Vec<Vec<f32>> = (0..channels).map(|_| Vec::with_capacity(frames)).collect();
    for frame in 0..frames {
        for (channel, plane) in planes.iter_mut().enumerate() {
            plane.push(f32::from(samples[frame * channels + channel]) / 32768.0);
        }
    }

    Ok(SampleBuffer { planes, sample_rate })
}

/// Quantize a float frame to little-endian 16-bit PCM for transmission.
///
/// Each sample is rounded to `s * 32768` with fixed-width wrapping: values
/// outside [-1, 1] overflow rather than clamp, matching the service's
/// expectation on the capture path.
#[must_use]
pub fn encode_frame(samples: &[f32], sample_rate: u32) -> EncodedFrame {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        #[allow(clippy::cast_possible_truncation)]
        let quantized = (f64::from(sample) * 32768.0).round() as i64 as i16;
        bytes.extend_from_slice(&quantized.to_le_bytes());
    }

    EncodedFrame {
        bytes,
        mime_type: format!("audio/pcm;rate={sample_rate}"),
    }
}
