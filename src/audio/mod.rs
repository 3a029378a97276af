//! Audio playback: synthesized speech payload → output device.
//!
//! # Layers
//!
//! ```text
//! AudioPlayer::play(&AudioPayload)      one session at a time, awaitable
//!        │
//!        ▼
//! AudioOutput::open(&AudioPayload)      platform device (RodioOutput)
//!        │
//!        ▼
//! OutputSession::wait_until_end / stop  decoded sink, released on every exit
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bilingual_reader::audio::{AudioPayload, AudioPlayer, RodioOutput};
//!
//! # async fn example(mp3: Vec<u8>) {
//! let output = RodioOutput::new().expect("no audio device");
//! let player = AudioPlayer::new(Arc::new(output));
//! let outcome = player.play(&AudioPayload::new(mp3)).await;
//! println!("{outcome:?}");
//! # }
//! ```

pub mod output;
pub mod payload;
pub mod player;

pub use output::{AudioOutput, OutputSession};
#[cfg(feature = "rodio-output")]
pub use output::RodioOutput;
pub use payload::AudioPayload;
pub use player::{ActivePlayback, AudioPlayer, PlaybackOutcome};

// test-only re-export so the pipeline tests can script playback without a
// real output device.
#[cfg(test)]
pub use output::{MockBehaviour, MockOutput};

use thiserror::Error;

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

/// Errors raised while starting or running a playback session.
///
/// These never reach the pipeline's error state; the sequencer logs them and
/// moves on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    /// No usable output device, or the device rejected the stream.
    #[error("audio output unavailable: {0}")]
    Device(String),

    /// The payload could not be decoded (unsupported or corrupt format).
    #[error("cannot decode audio payload: {0}")]
    Decode(String),

    /// The device failed while the payload was playing.
    #[error("audio playback failed: {0}")]
    Playback(String),
}
