//! Bilingual reader: sentence-by-sentence translation with interleaved
//! speech playback.
//!
//! A block of source-language text is split into sentences
//! ([`text::Segmenter`]), each sentence is translated and synthesized in
//! both languages ([`pipeline::PipelineOrchestrator`]), and the results are
//! played back as source, translation, source, translation…
//! ([`pipeline::PlaybackSequencer`]).
//!
//! Modules:
//! * [`text`]: abbreviation-aware sentence segmentation.
//! * [`service`]: translation / speech / key-validation traits and the
//!   OpenAI-compatible client.
//! * [`audio`]: single-session audio player over a pluggable output device.
//! * [`pipeline`]: session state, orchestrator and playback sequencer.
//! * [`controller`]: command parsing and dispatch for front ends.
//! * [`config`]: `settings.toml` loading and saving.
//! * `hotkey`: optional global advance key (feature `global-hotkey`).

pub mod audio;
pub mod config;
pub mod controller;
#[cfg(feature = "global-hotkey")]
pub mod hotkey;
pub mod pipeline;
pub mod service;
pub mod text;
