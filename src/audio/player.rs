//! Single-session audio player.
//!
//! [`AudioPlayer`] owns at most one [`OutputSession`] at a time.  Starting a
//! new playback stops the previous one first, and the session is released on
//! every exit path: natural end, device error, or an explicit [`stop`].
//!
//! [`stop`]: AudioPlayer::stop

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::output::{AudioOutput, OutputSession};
use super::{AudioPayload, PlaybackError};

/// How an awaited [`AudioPlayer::play`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The payload played to its end.
    Finished,
    /// [`AudioPlayer::stop`] (or a newer `play`) cut the payload short.
    Stopped,
}

struct ActiveSession {
    id: u64,
    session: Arc<dyn OutputSession>,
    stopped: Arc<AtomicBool>,
}

type Slot = Arc<Mutex<Option<ActiveSession>>>;

/// Plays one payload at a time on an [`AudioOutput`].
pub struct AudioPlayer {
    output: Arc<dyn AudioOutput>,
    current: Slot,
    next_id: AtomicU64,
}

impl AudioPlayer {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self {
            output,
            current: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
        }
    }

    /// Play `payload` and wait until it ends.
    ///
    /// Any session already playing is stopped first.
    ///
    /// # Errors
    ///
    /// [`PlaybackError`] when the payload cannot be opened or the device
    /// fails mid-playback.  A session that was stopped on purpose resolves
    /// with [`PlaybackOutcome::Stopped`] instead of an error.
    pub async fn play(&self, payload: &AudioPayload) -> Result<PlaybackOutcome, PlaybackError> {
        self.start(payload)?.finished().await
    }

    /// Open `payload` and start playing it without waiting.
    ///
    /// The returned [`ActivePlayback`] resolves when the payload ends.
    /// Dropping it early stops the payload.
    pub fn start(&self, payload: &AudioPayload) -> Result<ActivePlayback, PlaybackError> {
        self.stop();

        let session = self.output.open(payload)?;
        let stopped = Arc::new(AtomicBool::new(false));
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;

        *lock(&self.current) = Some(ActiveSession {
            id,
            session: Arc::clone(&session),
            stopped: Arc::clone(&stopped),
        });

        Ok(ActivePlayback {
            id,
            session,
            stopped,
            slot: Arc::clone(&self.current),
        })
    }

    /// Halt the active session, if any, and release it.
    pub fn stop(&self) {
        let active = lock(&self.current).take();
        if let Some(active) = active {
            active.stopped.store(true, Ordering::SeqCst);
            active.session.stop();
            log::debug!("playback: session {} stopped", active.id);
        }
    }

    /// `true` while a session is open.
    pub fn is_playing(&self) -> bool {
        lock(&self.current).is_some()
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// ActivePlayback
// ---------------------------------------------------------------------------

/// A payload started by [`AudioPlayer::start`].
pub struct ActivePlayback {
    id: u64,
    session: Arc<dyn OutputSession>,
    stopped: Arc<AtomicBool>,
    slot: Slot,
}

impl ActivePlayback {
    /// Wait on the blocking pool until the payload drains or is stopped.
    pub async fn finished(self) -> Result<PlaybackOutcome, PlaybackError> {
        let waiter = Arc::clone(&self.session);
        let waited = tokio::task::spawn_blocking(move || waiter.wait_until_end()).await;

        release(&self.slot, self.id);
        let was_stopped = self.stopped.load(Ordering::SeqCst);

        match waited {
            Ok(Ok(())) if was_stopped => Ok(PlaybackOutcome::Stopped),
            Ok(Ok(())) => Ok(PlaybackOutcome::Finished),
            // A device error racing with an explicit stop is not a failure.
            Ok(Err(_)) if was_stopped => Ok(PlaybackOutcome::Stopped),
            Ok(Err(e)) => Err(e),
            Err(join_err) => {
                self.session.stop();
                Err(PlaybackError::Playback(format!(
                    "playback wait task failed: {join_err}"
                )))
            }
        }
    }
}

impl Drop for ActivePlayback {
    fn drop(&mut self) {
        // Only still registered when dropped before `finished` completed.
        if release(&self.slot, self.id) {
            self.session.stop();
        }
    }
}

/// Clear the slot if it still belongs to `id`.  Returns whether it did.
fn release(slot: &Mutex<Option<ActiveSession>>, id: u64) -> bool {
    let mut current = lock(slot);
    if current.as_ref().is_some_and(|active| active.id == id) {
        *current = None;
        true
    } else {
        false
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
