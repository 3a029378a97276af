//! Pipeline orchestrator: text → sentences → translation → speech.
//!
//! [`PipelineOrchestrator`] owns the batch loop.  Sentences are processed
//! strictly one after another, and a failing stage marks only its own pair:
//!
//! ```text
//! process(text)
//!   └─▶ segment → one Pending pair per sentence
//!         for each pair, in order:
//!           Translating      translator.translate(source)
//!           GeneratingAudio  speech.synthesize(source)
//!                            speech.synthesize(translation)   (if any)
//!           Complete
//!         any stage Err ──▶ pair Error + last_error, next pair
//!   └─▶ Phase::Complete "Complete!"
//! ```
//!
//! Every write re-checks the session epoch.  `reset()` and a newer
//! `process()` bump it, so a superseded loop stops at its next suspension
//! point without touching the new state.  Requests already in flight are
//! not aborted; their results are dropped.

use std::sync::{Arc, PoisonError, RwLock};

use crate::audio::AudioPayload;
use crate::config::{SpeechConfig, Voice};
use crate::service::{ServiceError, SpeechSynthesizer, Translator};
use crate::text::Segmenter;

use super::sequencer::PlaybackSequencer;
use super::state::{
    Language, PairStatus, Phase, Progress, SentencePair, SessionState, SharedSession, StateEvent,
};

const TRANSLATION_FAILED: &str = "Translation failed";
const SOURCE_AUDIO_FAILED: &str = "Source audio generation failed";
const TARGET_AUDIO_FAILED: &str = "Target audio generation failed";

// ---------------------------------------------------------------------------
// StageOutcome
// ---------------------------------------------------------------------------

/// Result of one pipeline stage, as the loop branches on it.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Done(T),
    /// The stage failed with this message; the pair is marked and the loop
    /// moves on.
    Failed(String),
}

impl<T> StageOutcome<T> {
    /// Fold a service result, using `fallback` when the error has no text.
    fn from_result(result: Result<T, ServiceError>, fallback: &str) -> Self {
        match result {
            Ok(value) => StageOutcome::Done(value),
            Err(e) => {
                let message = e.message().trim();
                if message.is_empty() {
                    StageOutcome::Failed(fallback.to_string())
                } else {
                    StageOutcome::Failed(message.to_string())
                }
            }
        }
    }
}

/// How a `process` or `regenerate_audio` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every pair was visited.  Individual pairs may still have failed.
    Completed,
    /// Nothing to do (no sentences, or no eligible pairs).
    Skipped,
    /// A reset or newer run superseded this one.
    Abandoned,
}

/// The run's epoch moved on.
#[derive(Debug)]
struct Abandoned;

// ---------------------------------------------------------------------------
// SpeechSettings
// ---------------------------------------------------------------------------

/// Voice and speed used for every synthesis call of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechSettings {
    pub voice: Voice,
    pub speed: f32,
}

impl SpeechSettings {
    pub fn from_config(config: &SpeechConfig) -> Self {
        Self {
            voice: config.voice,
            speed: SpeechConfig::clamp_speed(config.speed),
        }
    }
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self::from_config(&SpeechConfig::default())
    }
}

// ---------------------------------------------------------------------------
// PipelineOrchestrator
// ---------------------------------------------------------------------------

/// Drives translation and speech synthesis for a block of text.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use bilingual_reader::audio::{AudioPlayer, RodioOutput};
/// use bilingual_reader::config::AppConfig;
/// use bilingual_reader::pipeline::{PipelineOrchestrator, PlaybackSequencer, Session};
/// use bilingual_reader::service::OpenAiClient;
/// use bilingual_reader::text::Segmenter;
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let session = Session::new();
/// let client = Arc::new(OpenAiClient::from_config(&config));
/// let player = AudioPlayer::new(Arc::new(RodioOutput::new().unwrap()));
/// let playback = Arc::new(PlaybackSequencer::new(session.clone(), player));
///
/// let orchestrator = PipelineOrchestrator::new(
///     session,
///     Segmenter::default(),
///     client.clone(),
///     client,
///     playback.clone(),
/// );
/// orchestrator.process("Hello world. This is Mr. Lee speaking.").await;
/// playback.advance().await;
/// # }
/// ```
pub struct PipelineOrchestrator {
    session: SharedSession,
    segmenter: Segmenter,
    translator: Arc<dyn Translator>,
    speech: Arc<dyn SpeechSynthesizer>,
    playback: Arc<PlaybackSequencer>,
    settings: RwLock<SpeechSettings>,
}

impl PipelineOrchestrator {
    /// Create an orchestrator with default speech settings.
    ///
    /// # Arguments
    ///
    /// * `session`: shared state, also read by the front end.
    /// * `segmenter`: sentence splitter.
    /// * `translator`: translation backend (e.g. `OpenAiClient`).
    /// * `speech`: speech backend (e.g. `OpenAiClient`).
    /// * `playback`: sequencer to stop and rewind on new runs.
    pub fn new(
        session: SharedSession,
        segmenter: Segmenter,
        translator: Arc<dyn Translator>,
        speech: Arc<dyn SpeechSynthesizer>,
        playback: Arc<PlaybackSequencer>,
    ) -> Self {
        Self {
            session,
            segmenter,
            translator,
            speech,
            playback,
            settings: RwLock::new(SpeechSettings::default()),
        }
    }

    /// Replace the initial speech settings.
    pub fn with_speech_settings(mut self, settings: SpeechSettings) -> Self {
        self.settings = RwLock::new(settings);
        self
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn playback(&self) -> &Arc<PlaybackSequencer> {
        &self.playback
    }

    pub fn is_processing(&self) -> bool {
        self.session.read().is_processing()
    }

    pub fn speech_settings(&self) -> SpeechSettings {
        *self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the speed for the next run, clamped to `[0.25, 4.0]`.  Returns the
    /// value actually stored.
    pub fn set_speech_speed(&self, speed: f32) -> f32 {
        let speed = SpeechConfig::clamp_speed(speed);
        self.settings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .speed = speed;
        speed
    }

    pub fn set_voice(&self, voice: Voice) {
        self.settings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .voice = voice;
    }

    // -----------------------------------------------------------------------
    // process
    // -----------------------------------------------------------------------

    /// Segment `text` and run every sentence through the pipeline.
    ///
    /// Replaces the current pairs, clears the last error and rewinds
    /// playback.  Text with no sentences leaves everything untouched.
    pub async fn process(&self, text: &str) -> RunOutcome {
        let sentences = self.segmenter.segment(text);
        if sentences.is_empty() {
            log::debug!("pipeline: no sentences in input, nothing to do");
            return RunOutcome::Skipped;
        }
        let total = sentences.len();

        self.playback.stop();
        let epoch = {
            let mut state = self.session.write();
            state.epoch += 1;
            state.pairs = sentences
                .iter()
                .enumerate()
                .map(|(i, sentence)| SentencePair::new(i, sentence.as_str()))
                .collect();
            state.last_error = None;
            state.progress = Progress {
                phase: Phase::Translating,
                current: 0,
                total,
                message: "Starting translation...".into(),
            };
            self.publish_reset(&state);
            state.epoch
        };
        self.playback.reset_cursor();

        log::info!("pipeline: processing {total} sentence(s)");
        let settings = self.speech_settings();

        for (index, source) in sentences.iter().enumerate() {
            if self.process_pair(epoch, index, total, source, settings).await.is_err() {
                log::info!("pipeline: run superseded, abandoning");
                return RunOutcome::Abandoned;
            }
        }

        let finished = self.update_progress(epoch, |progress| {
            *progress = Progress {
                phase: Phase::Complete,
                current: total,
                total,
                message: "Complete!".into(),
            };
        });
        if finished.is_err() {
            return RunOutcome::Abandoned;
        }

        log::info!("pipeline: finished {total} sentence(s)");
        RunOutcome::Completed
    }

    async fn process_pair(
        &self,
        epoch: u64,
        index: usize,
        total: usize,
        source: &str,
        settings: SpeechSettings,
    ) -> Result<(), Abandoned> {
        let number = index + 1;

        self.update_progress(epoch, |progress| {
            progress.current = number;
            progress.message = format!("Translating sentence {number} of {total}...");
        })?;
        self.update_pair(epoch, index, |pair| pair.status = PairStatus::Translating)?;
        log::debug!("pipeline: translating sentence {number}");

        let outcome = StageOutcome::from_result(
            self.translator.translate(source).await,
            TRANSLATION_FAILED,
        );
        let translation = match outcome {
            StageOutcome::Done(text) => Some(text).filter(|t| !t.trim().is_empty()),
            StageOutcome::Failed(message) => return self.fail_pair(epoch, index, message),
        };

        self.update_pair(epoch, index, |pair| {
            pair.translation = translation.clone();
            pair.status = PairStatus::GeneratingAudio;
        })?;
        self.update_progress(epoch, |progress| {
            progress.message = format!("Generating audio for sentence {number}...");
        })?;

        self.synthesize_pair(epoch, index, source, translation.as_deref(), settings)
            .await
    }

    /// Source audio, then target audio when a translation exists, then
    /// `Complete`.
    async fn synthesize_pair(
        &self,
        epoch: u64,
        index: usize,
        source: &str,
        translation: Option<&str>,
        settings: SpeechSettings,
    ) -> Result<(), Abandoned> {
        log::debug!("pipeline: generating audio for sentence {}", index + 1);

        let outcome = StageOutcome::from_result(
            self.speech
                .synthesize(source, settings.voice, settings.speed)
                .await,
            SOURCE_AUDIO_FAILED,
        );
        match outcome {
            StageOutcome::Done(audio) => self.store_audio(epoch, index, Language::Source, audio)?,
            StageOutcome::Failed(message) => return self.fail_pair(epoch, index, message),
        }

        if let Some(translation) = translation {
            let outcome = StageOutcome::from_result(
                self.speech
                    .synthesize(translation, settings.voice, settings.speed)
                    .await,
                TARGET_AUDIO_FAILED,
            );
            match outcome {
                StageOutcome::Done(audio) => {
                    self.store_audio(epoch, index, Language::Target, audio)?
                }
                StageOutcome::Failed(message) => return self.fail_pair(epoch, index, message),
            }
        }

        self.update_pair(epoch, index, |pair| {
            pair.status = PairStatus::Complete;
            pair.error = None;
        })
    }

    // -----------------------------------------------------------------------
    // regenerate_audio
    // -----------------------------------------------------------------------

    /// Re-synthesize both payloads of every translated pair with the current
    /// speech settings.  Translation is not repeated.
    pub async fn regenerate_audio(&self) -> RunOutcome {
        if self.session.read().pairs.is_empty() {
            return RunOutcome::Skipped;
        }

        self.playback.stop();

        let (epoch, eligible) = {
            let mut state = self.session.write();
            state.epoch += 1;
            state.last_error = None;
            self.session.notify(StateEvent::LastError(None));

            let eligible: Vec<(usize, String, String)> = state
                .pairs
                .iter()
                .enumerate()
                .filter_map(|(i, pair)| {
                    let translation = pair.translation.as_deref()?;
                    (!pair.source.is_empty() && !translation.is_empty())
                        .then(|| (i, pair.source.clone(), translation.to_string()))
                })
                .collect();

            if !eligible.is_empty() {
                state.progress = Progress {
                    phase: Phase::GeneratingAudio,
                    current: 0,
                    total: eligible.len(),
                    message: "Regenerating audio...".into(),
                };
                self.session
                    .notify(StateEvent::Progress(state.progress.clone()));
            }
            (state.epoch, eligible)
        };

        if eligible.is_empty() {
            log::info!("pipeline: no translated sentences to regenerate");
            return RunOutcome::Skipped;
        }

        let total = eligible.len();
        let settings = self.speech_settings();
        log::info!(
            "pipeline: regenerating audio for {total} sentence(s) (voice {}, speed {})",
            settings.voice.as_str(),
            settings.speed
        );

        for (n, (index, source, translation)) in eligible.iter().enumerate() {
            let number = n + 1;
            let step = self
                .update_progress(epoch, |progress| {
                    progress.current = number;
                    progress.message = format!("Regenerating audio for sentence {number}...");
                })
                .and_then(|()| {
                    self.update_pair(epoch, *index, |pair| {
                        pair.status = PairStatus::GeneratingAudio
                    })
                });
            if step.is_err() {
                return RunOutcome::Abandoned;
            }

            let regenerated = self
                .synthesize_pair(epoch, *index, source, Some(translation), settings)
                .await;
            if regenerated.is_err() {
                log::info!("pipeline: regeneration superseded, abandoning");
                return RunOutcome::Abandoned;
            }
        }

        let finished = self.update_progress(epoch, |progress| {
            *progress = Progress {
                phase: Phase::Complete,
                current: total,
                total,
                message: "Audio regenerated!".into(),
            };
        });
        if finished.is_err() {
            return RunOutcome::Abandoned;
        }

        self.playback.reset_cursor();
        RunOutcome::Completed
    }

    // -----------------------------------------------------------------------
    // dismiss / reset
    // -----------------------------------------------------------------------

    /// Clear the last error.  Pair errors are kept.
    pub fn dismiss_error(&self) {
        let mut state = self.session.write();
        if state.last_error.take().is_some() {
            self.session.notify(StateEvent::LastError(None));
        }
    }

    /// Stop playback, drop every pair and return to idle.
    pub fn reset(&self) {
        self.playback.stop();
        {
            let mut state = self.session.write();
            state.epoch += 1;
            state.pairs.clear();
            state.progress = Progress::idle();
            state.last_error = None;
            self.publish_reset(&state);
        }
        self.playback.reset_cursor();
        log::debug!("pipeline: reset");
    }

    // -----------------------------------------------------------------------
    // Epoch-checked state access
    // -----------------------------------------------------------------------

    fn with_state<R>(
        &self,
        epoch: u64,
        f: impl FnOnce(&mut SessionState) -> R,
    ) -> Result<R, Abandoned> {
        let mut state = self.session.write();
        if state.epoch != epoch {
            return Err(Abandoned);
        }
        Ok(f(&mut state))
    }

    fn update_pair(
        &self,
        epoch: u64,
        index: usize,
        f: impl FnOnce(&mut SentencePair),
    ) -> Result<(), Abandoned> {
        let status = self.with_state(epoch, |state| {
            state.pairs.get_mut(index).map(|pair| {
                f(pair);
                pair.status
            })
        })?;
        if let Some(status) = status {
            self.session.notify(StateEvent::PairChanged { index, status });
        }
        Ok(())
    }

    fn store_audio(
        &self,
        epoch: u64,
        index: usize,
        language: Language,
        audio: AudioPayload,
    ) -> Result<(), Abandoned> {
        self.update_pair(epoch, index, |pair| *pair.audio_mut(language) = Some(audio))
    }

    fn update_progress(&self, epoch: u64, f: impl FnOnce(&mut Progress)) -> Result<(), Abandoned> {
        let progress = self.with_state(epoch, |state| {
            f(&mut state.progress);
            state.progress.clone()
        })?;
        self.session.notify(StateEvent::Progress(progress));
        Ok(())
    }

    /// Mark pair `index` failed and make `message` the last error.  The
    /// caller continues with the next pair.
    fn fail_pair(&self, epoch: u64, index: usize, message: String) -> Result<(), Abandoned> {
        self.with_state(epoch, |state| {
            if let Some(pair) = state.pairs.get_mut(index) {
                pair.status = PairStatus::Error;
                pair.error = Some(message.clone());
            }
            state.last_error = Some(message.clone());
        })?;

        log::warn!("pipeline: sentence {} failed: {message}", index + 1);
        self.session.notify(StateEvent::PairChanged {
            index,
            status: PairStatus::Error,
        });
        self.session.notify(StateEvent::LastError(Some(message)));
        Ok(())
    }

    fn publish_reset(&self, state: &SessionState) {
        self.session.notify(StateEvent::PairsReplaced {
            count: state.pairs.len(),
        });
        self.session.notify(StateEvent::LastError(None));
        self.session
            .notify(StateEvent::Progress(state.progress.clone()));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
