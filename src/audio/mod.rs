//! Audio processing module
//!
//! Handles the PCM wire codec, microphone capture, long-form chunk playback,
//! and the scheduled output timeline for live response audio.

pub mod capture;
pub mod pcm;
pub mod playback;
pub mod timeline;

pub use capture::{AudioCapture, CAPTURE_SAMPLE_RATE, FRAME_SIZE, samples_to_wav};
pub use pcm::{EncodedFrame, SampleBuffer};
pub use playback::{AudioOut, CpalPlayer, OUTPUT_SAMPLE_RATE};
pub use timeline::{CpalTimeline, OutputTimeline, SourceHandle};
