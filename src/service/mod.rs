//! External service capabilities used by the pipeline.
//!
//! This module provides:
//! * [`Translator`]: async trait: source sentence → translated sentence.
//! * [`SpeechSynthesizer`]: async trait: text + voice + speed → audio payload.
//! * [`KeyValidator`]: setup-time API key check.
//! * [`OpenAiClient`]: OpenAI-compatible REST backend implementing all three.
//! * [`ServiceError`]: failure taxonomy shared by every capability.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use bilingual_reader::config::{AppConfig, Voice};
//! use bilingual_reader::service::{OpenAiClient, SpeechSynthesizer, Translator};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = OpenAiClient::from_config(&AppConfig::default());
//!
//!     let french = client.translate("Good morning.").await.unwrap();
//!     let audio = client.synthesize(&french, Voice::Nova, 1.0).await.unwrap();
//!     println!("{french} ({} bytes of audio)", audio.len());
//! }
//! ```

pub mod client;
pub mod error;
pub mod prompt;
pub mod speech;
pub mod translator;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{KeyValidator, OpenAiClient};
pub use error::{ServiceError, ServiceErrorKind};
pub use prompt::translation_instruction;
pub use speech::SpeechSynthesizer;
pub use translator::Translator;
