//! Sentence-pair pipeline and interleaved playback.
//!
//! This module wires segmentation, translation and speech synthesis into a
//! collection of [`SentencePair`]s, and plays them back pair by pair.
//!
//! # Architecture
//!
//! ```text
//! ControlEvent (mpsc)
//!        │
//!        ▼
//! PipelineOrchestrator::process(text)          ← async tokio task
//!        │  Segmenter → Translator → SpeechSynthesizer, one pair at a time
//!        ▼
//! SharedSession (Arc<Session>)  ── StateEvent broadcast ──▶ front end
//!        ▲
//!        │  reads pairs, owns cursor + PlaybackState
//! PlaybackSequencer::advance / play_sentence / stop
//!        │
//!        ▼
//! AudioPlayer (one session at a time)
//! ```
//!
//! The sequencer never waits for the orchestrator; entries whose audio is
//! not ready yet are simply skipped.

pub mod runner;
pub mod sequencer;
pub mod state;

pub use runner::{PipelineOrchestrator, RunOutcome, SpeechSettings, StageOutcome};
pub use sequencer::{AdvanceOutcome, PlaybackSequencer};
pub use state::{
    playback_sequence, Language, PairStatus, Phase, PlaybackState, Progress, SentencePair,
    SequenceEntry, Session, SessionState, SharedSession, StateEvent,
};
