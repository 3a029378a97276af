//! Playback sequencer: walks the interleaved `(sentence, language)` order.
//!
//! The sequencer keeps a cursor into [`playback_sequence`] across calls so
//! repeated [`advance`](PlaybackSequencer::advance) calls resume where the
//! previous one stopped.  Entries whose audio is missing or whose pair failed
//! are skipped; the scan wraps to the start and gives up after one full lap.
//!
//! Lock order is cursor, then session.  The cursor mutex also serialises
//! starting a playback, so a `stop()` can never slip between the scan and
//! the device open.
//!
//! [`playback_sequence`]: crate::pipeline::playback_sequence

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::audio::{AudioPayload, AudioPlayer, PlaybackError, PlaybackOutcome};

use super::state::{Language, PlaybackState, SequenceEntry, SharedSession, StateEvent};

// ---------------------------------------------------------------------------
// AdvanceOutcome
// ---------------------------------------------------------------------------

/// Result of one [`PlaybackSequencer::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The entry played to its end.
    Played(SequenceEntry),
    /// The entry was selected but the audio device failed.  Logged only.
    Failed(SequenceEntry),
    /// A `stop()` or a newer `advance()`/`play_sentence()` took over while
    /// this entry was playing.  Cursor and playback state belong to the
    /// interrupting call.
    Interrupted(SequenceEntry),
    /// No entry in the whole sequence has playable audio.
    NothingToPlay,
}

// ---------------------------------------------------------------------------
// PlaybackSequencer
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct CursorState {
    /// Next position to try.  May equal the sequence length; wraps on scan.
    position: usize,
    /// Bumped by every call that takes over playback.
    generation: u64,
}

/// Drives an [`AudioPlayer`] through the session's playback sequence.
pub struct PlaybackSequencer {
    session: SharedSession,
    player: AudioPlayer,
    cursor: Mutex<CursorState>,
}

impl PlaybackSequencer {
    pub fn new(session: SharedSession, player: AudioPlayer) -> Self {
        Self {
            session,
            player,
            cursor: Mutex::new(CursorState::default()),
        }
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        lock(&self.cursor).position
    }

    pub fn is_playing(&self) -> bool {
        self.session.read().playback.is_playing
    }

    /// Play the next eligible entry and wait for it to end.
    ///
    /// When something is already playing it is stopped first and the cursor
    /// steps forward by one.
    pub async fn advance(&self) -> AdvanceOutcome {
        let (entry, generation, active) = {
            let mut cursor = lock(&self.cursor);
            let mut state = self.session.write();

            let len = state.pairs.len() * 2;
            if len == 0 {
                return AdvanceOutcome::NothingToPlay;
            }

            if state.playback.is_playing {
                self.player.stop();
                state.playback.is_playing = false;
                cursor.generation += 1;
                cursor.position += 1;
                log::debug!("playback: skipping current entry");
            }

            // Bounded scan: at most one full lap.
            let mut found: Option<(SequenceEntry, AudioPayload)> = None;
            let mut attempts = 0;
            while attempts < len {
                if cursor.position >= len {
                    cursor.position = 0;
                }
                let entry = SequenceEntry::at(cursor.position);
                let audio = state
                    .pairs
                    .get(entry.index)
                    .and_then(|pair| pair.playable_audio(entry.language));
                if let Some(audio) = audio {
                    found = Some((entry, audio.clone()));
                    break;
                }
                cursor.position += 1;
                attempts += 1;
            }

            let Some((entry, payload)) = found else {
                drop(state);
                drop(cursor);
                log::warn!("playback: no playable sentences found");
                self.session.notify(StateEvent::NothingToPlay);
                return AdvanceOutcome::NothingToPlay;
            };

            cursor.generation += 1;
            let generation = cursor.generation;

            let started = self.player.start(&payload);
            state.playback = PlaybackState {
                index: entry.index,
                language: entry.language,
                is_playing: started.is_ok(),
            };
            self.session.notify(StateEvent::Playback(state.playback));
            match started {
                Ok(active) => {
                    log::debug!("playback: playing {entry}");
                    (entry, generation, active)
                }
                Err(e) => {
                    log::error!("playback: cannot start {entry}: {e}");
                    cursor.position += 1;
                    return AdvanceOutcome::Failed(entry);
                }
            }
        };

        let result = active.finished().await;
        self.finish_advance(entry, generation, result)
    }

    fn finish_advance(
        &self,
        entry: SequenceEntry,
        generation: u64,
        result: Result<PlaybackOutcome, PlaybackError>,
    ) -> AdvanceOutcome {
        if let Err(e) = &result {
            log::error!("playback: {entry} failed: {e}");
        }

        let mut cursor = lock(&self.cursor);
        if cursor.generation != generation {
            log::debug!("playback: {entry} interrupted");
            return AdvanceOutcome::Interrupted(entry);
        }

        cursor.position += 1;

        let mut state = self.session.write();
        state.playback.is_playing = false;
        self.session.notify(StateEvent::Playback(state.playback));

        match result {
            Ok(_) => AdvanceOutcome::Played(entry),
            Err(_) => AdvanceOutcome::Failed(entry),
        }
    }

    /// Jump straight to `(index, language)` and play it in the background.
    ///
    /// Returns `false` without side effects when that slot has no audio.
    /// Otherwise the cursor moves to the entry after it, so the next
    /// `advance` continues from there.
    pub fn play_sentence(self: &Arc<Self>, index: usize, language: Language) -> bool {
        let (generation, active) = {
            let mut cursor = lock(&self.cursor);
            let mut state = self.session.write();

            let Some(payload) = state
                .pairs
                .get(index)
                .and_then(|pair| pair.audio(language))
                .cloned()
            else {
                log::debug!("playback: sentence {index} has no {language} audio");
                return false;
            };

            cursor.generation += 1;
            let generation = cursor.generation;

            let entry = SequenceEntry::new(index, language);
            cursor.position = entry.position() + 1;

            let started = self.player.start(&payload);
            let active = match started {
                Ok(active) => active,
                Err(e) => {
                    log::error!("playback: cannot start {entry}: {e}");
                    if state.playback.is_playing {
                        state.playback.is_playing = false;
                        self.session.notify(StateEvent::Playback(state.playback));
                    }
                    return true;
                }
            };

            state.playback = PlaybackState {
                index,
                language,
                is_playing: true,
            };
            self.session.notify(StateEvent::Playback(state.playback));
            (generation, active)
        };

        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = active.finished().await {
                log::error!("playback: sentence {index} ({language}) failed: {e}");
            }
            this.clear_playing(generation);
        });
        true
    }

    fn clear_playing(&self, generation: u64) {
        let cursor = lock(&self.cursor);
        if cursor.generation != generation {
            return;
        }
        let mut state = self.session.write();
        state.playback.is_playing = false;
        self.session.notify(StateEvent::Playback(state.playback));
    }

    /// Halt playback and clear the playing flag.  The cursor stays put.
    pub fn stop(&self) {
        let mut cursor = lock(&self.cursor);
        cursor.generation += 1;
        self.player.stop();

        let mut state = self.session.write();
        if state.playback.is_playing {
            state.playback.is_playing = false;
            self.session.notify(StateEvent::Playback(state.playback));
        }
    }

    /// Stop playback and rewind cursor and playback state to the start.
    pub fn reset_cursor(&self) {
        let mut cursor = lock(&self.cursor);
        cursor.generation += 1;
        cursor.position = 0;
        self.player.stop();

        let mut state = self.session.write();
        state.playback = PlaybackState::default();
        self.session.notify(StateEvent::Playback(state.playback));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{MockBehaviour, MockOutput};
    use crate::pipeline::state::{PairStatus, SentencePair, Session};
    use std::time::Duration;

    fn audio(index: usize, language: Language) -> AudioPayload {
        let tag = (index * 2 + usize::from(language == Language::Target)) as u8;
        AudioPayload::new(vec![tag; 4])
    }

    fn complete_pair(index: usize) -> SentencePair {
        let mut pair = SentencePair::new(index, format!("Sentence {index}."));
        pair.translation = Some(format!("Phrase {index}."));
        pair.source_audio = Some(audio(index, Language::Source));
        pair.target_audio = Some(audio(index, Language::Target));
        pair.status = PairStatus::Complete;
        pair
    }

    fn setup(
        pairs: Vec<SentencePair>,
        output: MockOutput,
    ) -> (Arc<PlaybackSequencer>, SharedSession, Arc<MockOutput>) {
        let session = Session::new();
        session.write().pairs = pairs;
        let output = Arc::new(output);
        let sequencer = Arc::new(PlaybackSequencer::new(
            Arc::clone(&session),
            AudioPlayer::new(output.clone()),
        ));
        (sequencer, session, output)
    }

    async fn wait_until_playing(session: &SharedSession) {
        for _ in 0..200 {
            if session.read().playback.is_playing {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("playback never started");
    }

    async fn wait_until_idle(session: &SharedSession) {
        for _ in 0..200 {
            if !session.read().playback.is_playing {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("playback never ended");
    }

    #[tokio::test]
    async fn empty_sequence_has_nothing_to_play() {
        let (sequencer, _, output) = setup(vec![], MockOutput::new(MockBehaviour::Finish));
        assert_eq!(sequencer.advance().await, AdvanceOutcome::NothingToPlay);
        assert!(output.opened().is_empty());
    }

    #[tokio::test]
    async fn three_advances_walk_the_interleaved_order() {
        let (sequencer, session, output) = setup(
            vec![complete_pair(0), complete_pair(1)],
            MockOutput::new(MockBehaviour::Finish),
        );

        let visited = [
            sequencer.advance().await,
            sequencer.advance().await,
            sequencer.advance().await,
        ];

        assert_eq!(
            visited,
            [
                AdvanceOutcome::Played(SequenceEntry::new(0, Language::Source)),
                AdvanceOutcome::Played(SequenceEntry::new(0, Language::Target)),
                AdvanceOutcome::Played(SequenceEntry::new(1, Language::Source)),
            ]
        );
        assert_eq!(
            output.opened(),
            vec![
                audio(0, Language::Source),
                audio(0, Language::Target),
                audio(1, Language::Source),
            ]
        );
        assert_eq!(sequencer.position(), 3);
        let playback = session.read().playback;
        assert_eq!((playback.index, playback.language), (1, Language::Source));
        assert!(!playback.is_playing);
    }

    #[tokio::test]
    async fn scan_wraps_around_to_the_start() {
        let (sequencer, _, _) = setup(
            vec![complete_pair(0), complete_pair(1)],
            MockOutput::new(MockBehaviour::Finish),
        );
        for _ in 0..4 {
            sequencer.advance().await;
        }
        assert_eq!(
            sequencer.advance().await,
            AdvanceOutcome::Played(SequenceEntry::new(0, Language::Source))
        );
    }

    #[tokio::test]
    async fn no_audio_anywhere_terminates() {
        let pairs = (0..5).map(|i| SentencePair::new(i, "Pending.")).collect();
        let (sequencer, session, output) = setup(pairs, MockOutput::new(MockBehaviour::Finish));
        let mut events = session.subscribe();

        assert_eq!(sequencer.advance().await, AdvanceOutcome::NothingToPlay);
        assert!(output.opened().is_empty());
        assert_eq!(events.recv().await.unwrap(), StateEvent::NothingToPlay);
        // One full lap brings the cursor back to where it started.
        assert_eq!(sequencer.position(), 10);
    }

    #[tokio::test]
    async fn skips_failed_pairs_and_missing_slots() {
        let mut failed = complete_pair(0);
        failed.status = PairStatus::Error;
        failed.error = Some("Target audio generation failed".into());
        let mut half = complete_pair(1);
        half.source_audio = None;

        let (sequencer, _, _) = setup(
            vec![failed, half, complete_pair(2)],
            MockOutput::new(MockBehaviour::Finish),
        );

        assert_eq!(
            sequencer.advance().await,
            AdvanceOutcome::Played(SequenceEntry::new(1, Language::Target))
        );
        assert_eq!(
            sequencer.advance().await,
            AdvanceOutcome::Played(SequenceEntry::new(2, Language::Source))
        );
    }

    #[tokio::test]
    async fn device_failure_is_contained_and_cursor_moves_on() {
        let (sequencer, session, _) = setup(
            vec![complete_pair(0)],
            MockOutput::new(MockBehaviour::Finish).then(MockBehaviour::FailWhilePlaying),
        );

        assert_eq!(
            sequencer.advance().await,
            AdvanceOutcome::Failed(SequenceEntry::new(0, Language::Source))
        );
        assert!(!session.read().playback.is_playing);
        assert!(session.read().last_error.is_none());
        assert_eq!(
            sequencer.advance().await,
            AdvanceOutcome::Played(SequenceEntry::new(0, Language::Target))
        );
    }

    #[tokio::test]
    async fn advance_while_playing_skips_to_next() {
        let (sequencer, session, output) = setup(
            vec![complete_pair(0), complete_pair(1)],
            MockOutput::new(MockBehaviour::Finish).then(MockBehaviour::Hold),
        );

        let first = {
            let sequencer = Arc::clone(&sequencer);
            tokio::spawn(async move { sequencer.advance().await })
        };
        wait_until_playing(&session).await;

        let second = sequencer.advance().await;

        assert_eq!(
            first.await.unwrap(),
            AdvanceOutcome::Interrupted(SequenceEntry::new(0, Language::Source))
        );
        assert_eq!(
            second,
            AdvanceOutcome::Played(SequenceEntry::new(0, Language::Target))
        );
        assert_eq!(output.live_sessions(), 0);
        assert_eq!(sequencer.position(), 2);
    }

    #[tokio::test]
    async fn stop_interrupts_without_moving_the_cursor() {
        let (sequencer, session, _) = setup(
            vec![complete_pair(0)],
            MockOutput::new(MockBehaviour::Hold),
        );

        let pending = {
            let sequencer = Arc::clone(&sequencer);
            tokio::spawn(async move { sequencer.advance().await })
        };
        wait_until_playing(&session).await;

        sequencer.stop();

        assert_eq!(
            pending.await.unwrap(),
            AdvanceOutcome::Interrupted(SequenceEntry::new(0, Language::Source))
        );
        assert!(!session.read().playback.is_playing);
        assert_eq!(sequencer.position(), 0);
    }

    #[tokio::test]
    async fn play_sentence_repositions_the_cursor() {
        let (sequencer, session, output) = setup(
            vec![complete_pair(0), complete_pair(1), complete_pair(2)],
            MockOutput::new(MockBehaviour::Finish),
        );

        assert!(sequencer.play_sentence(1, Language::Target));
        wait_until_idle(&session).await;

        assert_eq!(sequencer.position(), 4);
        assert_eq!(output.opened(), vec![audio(1, Language::Target)]);
        assert_eq!(
            sequencer.advance().await,
            AdvanceOutcome::Played(SequenceEntry::new(2, Language::Source))
        );
    }

    #[tokio::test]
    async fn play_sentence_without_audio_is_ignored() {
        let mut pair = complete_pair(0);
        pair.target_audio = None;
        let (sequencer, session, output) =
            setup(vec![pair], MockOutput::new(MockBehaviour::Finish));

        assert!(!sequencer.play_sentence(0, Language::Target));
        assert!(!sequencer.play_sentence(9, Language::Source));

        assert!(output.opened().is_empty());
        assert_eq!(sequencer.position(), 0);
        assert!(!session.read().playback.is_playing);
    }

    #[tokio::test]
    async fn advance_during_jumped_playback_steps_one_further() {
        let (sequencer, session, output) = setup(
            vec![complete_pair(0), complete_pair(1), complete_pair(2)],
            MockOutput::new(MockBehaviour::Finish).then(MockBehaviour::Hold),
        );

        assert!(sequencer.play_sentence(1, Language::Target));
        wait_until_playing(&session).await;
        assert_eq!(sequencer.position(), 4);

        // Skipping always moves the cursor by one, even after a jump.
        assert_eq!(
            sequencer.advance().await,
            AdvanceOutcome::Played(SequenceEntry::new(2, Language::Target))
        );
        assert_eq!(
            output.opened(),
            vec![audio(1, Language::Target), audio(2, Language::Target)]
        );
        assert_eq!(sequencer.position(), 6);
    }

    #[tokio::test]
    async fn reset_cursor_restores_initial_state() {
        let (sequencer, session, output) = setup(
            vec![complete_pair(0), complete_pair(1)],
            MockOutput::new(MockBehaviour::Finish)
                .then(MockBehaviour::Finish)
                .then(MockBehaviour::Finish)
                .then(MockBehaviour::Hold),
        );
        sequencer.advance().await;
        sequencer.advance().await;
        assert!(sequencer.play_sentence(1, Language::Target));
        wait_until_playing(&session).await;

        sequencer.reset_cursor();

        assert_eq!(sequencer.position(), 0);
        assert_eq!(session.read().playback, PlaybackState::default());
        for _ in 0..200 {
            if output.live_sessions() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("held session was never released");
    }
}
