//! Sentence-pair model and the shared session state.
//!
//! [`SessionState`] is the single source of truth for the pair collection,
//! pipeline progress, last error and playback state.  It lives inside a
//! [`Session`], which pairs the `RwLock` with a `broadcast` channel of
//! [`StateEvent`]s so front ends can react to changes instead of polling.
//!
//! [`SharedSession`] is a type alias for `Arc<Session>`, cheap to clone and
//! safe to share across threads.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::broadcast;

use crate::audio::AudioPayload;

/// Capacity of the state-event channel.  Slow subscribers lag, they never
/// block the pipeline.
const EVENT_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Which half of a sentence pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    /// The original sentence.
    #[default]
    Source,
    /// Its translation.
    Target,
}

impl Language {
    /// Short label used by the terminal front end.
    pub fn label(&self) -> &'static str {
        match self {
            Language::Source => "src",
            Language::Target => "tgt",
        }
    }

    /// Parse `src`/`source`/`s` or `tgt`/`target`/`t`, case-insensitively.
    ///
    /// ```
    /// use bilingual_reader::pipeline::Language;
    ///
    /// assert_eq!(Language::parse("SRC"), Some(Language::Source));
    /// assert_eq!(Language::parse("target"), Some(Language::Target));
    /// assert_eq!(Language::parse("fr"), None);
    /// ```
    pub fn parse(value: &str) -> Option<Language> {
        match value.trim().to_ascii_lowercase().as_str() {
            "src" | "source" | "s" => Some(Language::Source),
            "tgt" | "target" | "t" => Some(Language::Target),
            _ => None,
        }
    }

    fn offset(self) -> usize {
        match self {
            Language::Source => 0,
            Language::Target => 1,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// SentencePair
// ---------------------------------------------------------------------------

/// Per-sentence stage of the pipeline.
///
/// ```text
/// Pending ──▶ Translating ──▶ GeneratingAudio ──▶ Complete
///                  │                 │
///                  └──────┬──────────┘
///                         ▼
///                       Error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairStatus {
    #[default]
    Pending,
    Translating,
    GeneratingAudio,
    Complete,
    Error,
}

impl PairStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PairStatus::Pending => "pending",
            PairStatus::Translating => "translating",
            PairStatus::GeneratingAudio => "generating audio",
            PairStatus::Complete => "complete",
            PairStatus::Error => "error",
        }
    }
}

/// One source sentence with its translation and both synthesized payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct SentencePair {
    /// Stable identifier, `sentence-<index>`.
    pub id: String,
    pub source: String,
    /// `None` until translation succeeds.
    pub translation: Option<String>,
    pub source_audio: Option<AudioPayload>,
    pub target_audio: Option<AudioPayload>,
    pub status: PairStatus,
    /// Message of the stage that failed, when `status == Error`.
    pub error: Option<String>,
}

impl SentencePair {
    pub fn new(index: usize, source: impl Into<String>) -> Self {
        Self {
            id: format!("sentence-{index}"),
            source: source.into(),
            translation: None,
            source_audio: None,
            target_audio: None,
            status: PairStatus::Pending,
            error: None,
        }
    }

    /// Audio slot for `language`.
    pub fn audio(&self, language: Language) -> Option<&AudioPayload> {
        match language {
            Language::Source => self.source_audio.as_ref(),
            Language::Target => self.target_audio.as_ref(),
        }
    }

    pub(crate) fn audio_mut(&mut self, language: Language) -> &mut Option<AudioPayload> {
        match language {
            Language::Source => &mut self.source_audio,
            Language::Target => &mut self.target_audio,
        }
    }

    /// Audio the sequencer may pick: the slot is filled and the pair has not
    /// failed.
    pub fn playable_audio(&self, language: Language) -> Option<&AudioPayload> {
        if self.status == PairStatus::Error {
            return None;
        }
        self.audio(language)
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Overall phase of a `process` or `regenerate_audio` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Translating,
    GeneratingAudio,
    Complete,
}

/// Progress of the running batch, for display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Progress {
    pub phase: Phase,
    /// 1-based index of the sentence being worked on.
    pub current: usize,
    pub total: usize,
    pub message: String,
}

impl Progress {
    pub fn idle() -> Self {
        Self::default()
    }

    /// `true` while a batch is running (phase neither idle nor complete).
    ///
    /// ```
    /// use bilingual_reader::pipeline::{Phase, Progress};
    ///
    /// assert!(!Progress::idle().is_processing());
    /// let running = Progress { phase: Phase::Translating, ..Progress::idle() };
    /// assert!(running.is_processing());
    /// ```
    pub fn is_processing(&self) -> bool {
        !matches!(self.phase, Phase::Idle | Phase::Complete)
    }
}

// ---------------------------------------------------------------------------
// Playback sequence
// ---------------------------------------------------------------------------

/// What the sequencer is (or was last) playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackState {
    pub index: usize,
    pub language: Language,
    pub is_playing: bool,
}

/// One `(sentence, language)` step of the interleaved playback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceEntry {
    pub index: usize,
    pub language: Language,
}

impl SequenceEntry {
    pub fn new(index: usize, language: Language) -> Self {
        Self { index, language }
    }

    /// Entry at `position` of the interleaved sequence.
    pub(crate) fn at(position: usize) -> Self {
        let language = if position % 2 == 0 {
            Language::Source
        } else {
            Language::Target
        };
        Self::new(position / 2, language)
    }

    /// Position of this entry in the interleaved sequence.
    pub(crate) fn position(&self) -> usize {
        self.index * 2 + self.language.offset()
    }
}

impl fmt::Display for SequenceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.index, self.language)
    }
}

/// Interleaved play order: `(i, source)` then `(i, target)` for every pair.
/// Always exactly twice as long as `pairs`.
pub fn playback_sequence(pairs: &[SentencePair]) -> Vec<SequenceEntry> {
    (0..pairs.len() * 2).map(SequenceEntry::at).collect()
}

// ---------------------------------------------------------------------------
// StateEvent
// ---------------------------------------------------------------------------

/// Change notifications published by [`Session`].
#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    /// The pair collection was replaced wholesale.
    PairsReplaced { count: usize },
    /// One pair changed stage or content.
    PairChanged { index: usize, status: PairStatus },
    Progress(Progress),
    /// The last error was set or dismissed.
    LastError(Option<String>),
    Playback(PlaybackState),
    /// `advance` found no entry with playable audio.
    NothingToPlay,
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Everything the front end shows about the current text.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub pairs: Vec<SentencePair>,
    pub progress: Progress,
    /// Most recent per-sentence error, until dismissed.
    pub last_error: Option<String>,
    pub playback: PlaybackState,
    /// Bumped by every new run and by reset; a run that sees a different
    /// value has been superseded and must not write.
    pub(crate) epoch: u64,
}

impl SessionState {
    pub fn playback_sequence(&self) -> Vec<SequenceEntry> {
        playback_sequence(&self.pairs)
    }

    pub fn is_processing(&self) -> bool {
        self.progress.is_processing()
    }
}

// ---------------------------------------------------------------------------
// Session / SharedSession
// ---------------------------------------------------------------------------

/// [`SessionState`] behind a read-write lock plus its change channel.
///
/// Do **not** hold a guard across `.await` points.
pub struct Session {
    state: RwLock<SessionState>,
    events: broadcast::Sender<StateEvent>,
}

/// Thread-safe handle to a [`Session`].
pub type SharedSession = Arc<Session>;

impl Session {
    pub fn new() -> SharedSession {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            state: RwLock::new(SessionState::default()),
            events,
        })
    }

    pub fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.events.subscribe()
    }

    /// Publish `event`.  Having no subscribers is not an error.
    pub(crate) fn notify(&self, event: StateEvent) {
        let _ = self.events.send(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
