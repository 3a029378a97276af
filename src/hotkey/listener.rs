//! Dedicated OS-thread listener using `rdev::listen`.
//!
//! `rdev::listen` has no shutdown API.  Dropping [`HotkeyListener`] sets a
//! stop flag so the callback ignores further events; the thread itself stays
//! parked in the OS event loop until the process exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::controller::ControlEvent;

/// Handle to the running listener thread.  Drop it to stop forwarding.
pub struct HotkeyListener {
    stop: Arc<AtomicBool>,
    _thread: std::thread::JoinHandle<()>,
}

impl HotkeyListener {
    /// Spawn the listener thread and forward every press of `key` as
    /// [`ControlEvent::Advance`] on `tx`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error when the OS refuses to create the thread.
    pub fn start(key: rdev::Key, tx: mpsc::Sender<ControlEvent>) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stopped = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                // rdev reports auto-repeat as further presses.
                let mut held = false;
                let result = rdev::listen(move |event| {
                    if stopped.load(Ordering::Relaxed) {
                        return;
                    }
                    match event.event_type {
                        rdev::EventType::KeyPress(k) if k == key && !held => {
                            held = true;
                            // Not an async context: blocking_send is fine here.
                            if tx.blocking_send(ControlEvent::Advance).is_err() {
                                log::debug!("hotkey-listener: controller gone");
                            }
                        }
                        rdev::EventType::KeyRelease(k) if k == key => held = false,
                        _ => {}
                    }
                });

                if let Err(e) = result {
                    log::error!("hotkey-listener: rdev::listen exited with error: {e:?}");
                }
            })?;

        log::info!("hotkey: {key:?} advances playback");
        Ok(Self {
            stop,
            _thread: thread,
        })
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
