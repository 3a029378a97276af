//! Audio output device abstraction and the `rodio` implementation.
//!
//! [`AudioOutput`] turns a payload into an [`OutputSession`].  A session is
//! already playing when `open` returns; [`OutputSession::wait_until_end`]
//! blocks until it drains or [`OutputSession::stop`] is called from another
//! thread.  The blocking wait is always driven from
//! `tokio::task::spawn_blocking` by [`crate::audio::AudioPlayer`].

use std::sync::Arc;

use super::{AudioPayload, PlaybackError};

/// A single decoded payload queued on the output device.
pub trait OutputSession: Send + Sync {
    /// Block until playback drains naturally or the session is stopped.
    fn wait_until_end(&self) -> Result<(), PlaybackError>;

    /// Halt playback and discard the remaining audio.  Idempotent.
    fn stop(&self);
}

/// Platform audio device capable of playing encoded payloads.
pub trait AudioOutput: Send + Sync {
    /// Decode `payload` and start playing it.
    fn open(&self, payload: &AudioPayload) -> Result<Arc<dyn OutputSession>, PlaybackError>;
}

// Compile-time assertion: both traits must stay object-safe.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AudioOutput>, _: Box<dyn OutputSession>) {}
};

#[cfg(feature = "rodio-output")]
pub use self::rodio_backend::RodioOutput;

#[cfg(feature = "rodio-output")]
mod rodio_backend {
    use std::io::Cursor;
    use std::sync::{mpsc, Arc};

    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

    use super::{AudioOutput, OutputSession};
    use crate::audio::{AudioPayload, PlaybackError};

    /// Default-device output built on `rodio`.
    ///
    /// `rodio::OutputStream` is not `Send`, so it lives on a dedicated
    /// `audio-output` thread for as long as this value exists.  Only the
    /// (thread-safe) stream handle is kept here.  Dropping `RodioOutput`
    /// closes the shutdown channel, which ends the thread and releases the
    /// device.
    pub struct RodioOutput {
        handle: OutputStreamHandle,
        _shutdown: mpsc::Sender<()>,
    }

    impl RodioOutput {
        /// Open the system default output device.
        ///
        /// # Errors
        ///
        /// Returns [`PlaybackError::Device`] when no output device is
        /// available or the helper thread cannot be spawned.
        pub fn new() -> Result<Self, PlaybackError> {
            let (handle_tx, handle_rx) = mpsc::channel::<Result<OutputStreamHandle, String>>();
            let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

            std::thread::Builder::new()
                .name("audio-output".into())
                .spawn(move || match OutputStream::try_default() {
                    Ok((stream, handle)) => {
                        if handle_tx.send(Ok(handle)).is_err() {
                            return;
                        }
                        // Returns once the sender is dropped with RodioOutput.
                        let _ = shutdown_rx.recv();
                        drop(stream);
                        log::debug!("audio-output: stream closed");
                    }
                    Err(e) => {
                        let _ = handle_tx.send(Err(e.to_string()));
                    }
                })
                .map_err(|e| PlaybackError::Device(e.to_string()))?;

            let handle = handle_rx
                .recv()
                .map_err(|_| PlaybackError::Device("audio-output thread exited".into()))?
                .map_err(PlaybackError::Device)?;

            log::info!("audio output initialised on default device");

            Ok(Self {
                handle,
                _shutdown: shutdown_tx,
            })
        }
    }

    impl AudioOutput for RodioOutput {
        fn open(&self, payload: &AudioPayload) -> Result<Arc<dyn OutputSession>, PlaybackError> {
            let source = Decoder::new(Cursor::new(payload.clone()))
                .map_err(|e| PlaybackError::Decode(e.to_string()))?;

            let sink =
                Sink::try_new(&self.handle).map_err(|e| PlaybackError::Device(e.to_string()))?;
            sink.append(source);

            log::debug!("audio-output: playing {} bytes", payload.len());
            Ok(Arc::new(RodioSession { sink }))
        }
    }

    /// One `rodio::Sink` holding the decoded payload.
    struct RodioSession {
        sink: Sink,
    }

    impl OutputSession for RodioSession {
        fn wait_until_end(&self) -> Result<(), PlaybackError> {
            // `stop()` empties the sink, which wakes this call immediately.
            self.sink.sleep_until_end();
            Ok(())
        }

        fn stop(&self) {
            self.sink.stop();
        }
    }

    impl Drop for RodioSession {
        fn drop(&mut self) {
            self.sink.stop();
        }
    }
}

// ---------------------------------------------------------------------------
// MockOutput (tests only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use self::mock::{MockBehaviour, MockOutput};
