//! Dedicated OS-thread key listener using `rdev::listen`.
//!
//! `rdev::listen` is a blocking call that must live on its own OS thread.
//! [`KeyListener`] owns that thread and a stop flag; dropping it sets the
//! flag so the callback silently ignores further events.
//!
//! The callback never blocks: events are queued with `try_send`, and an
//! event that does not fit in the channel is dropped with a warning rather
//! than stalling the system-wide input hook.
//!
//! # Shutdown caveat
//!
//! `rdev::listen` has **no graceful shutdown API**.  Setting the stop flag
//! prevents events from being forwarded, but the OS thread itself will remain
//! blocked in the rdev event loop until the process exits.

use std::cell::Cell;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;

use super::{Hotkey, InputEvent, KeyEvent, KeyKind, ModifierState};

// ---------------------------------------------------------------------------
// KeyListener
// ---------------------------------------------------------------------------

/// Handle to a running key listener thread.
///
/// Construct one with [`KeyListener::start`].  Drop it (or call
/// [`stop`](Self::stop)) to stop forwarding events.
pub struct KeyListener {
    stop: Arc<AtomicBool>,
    /// Never joined: `rdev::listen` does not return.
    _thread: std::thread::JoinHandle<()>,
}

impl KeyListener {
    /// Spawn a dedicated OS thread that forwards every global key transition
    /// on `tx` as [`InputEvent::Key`].
    ///
    /// When `toggle` is set, pressing that chord sends
    /// [`InputEvent::ToggleAutoCorrect`] instead of a key event.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the thread.
    pub fn start(tx: mpsc::Sender<InputEvent>, toggle: Option<Hotkey>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("key-listener".into())
            .spawn(move || {
                let modifiers = Cell::new(ModifierState::default());

                let result = rdev::listen(move |event| {
                    if stop_clone.load(Ordering::Relaxed) {
                        return;
                    }

                    let (key, is_press) = match event.event_type {
                        rdev::EventType::KeyPress(k) => (k, true),
                        rdev::EventType::KeyRelease(k) => (k, false),
                        _ => return,
                    };

                    let mut held = modifiers.get();
                    held.update(key, is_press);
                    modifiers.set(held);

                    if is_press {
                        if let Some(hotkey) = &toggle {
                            if held.matches(hotkey, key) {
                                forward(&tx, InputEvent::ToggleAutoCorrect);
                                return;
                            }
                        }
                    }

                    let key_event = KeyEvent {
                        raw_name: format!("{key:?}"),
                        kind: KeyKind::from_rdev(key, event.name.as_deref()),
                        pressed_at: Instant::now(),
                        is_press,
                    };
                    forward(&tx, InputEvent::Key(key_event));
                });

                if let Err(e) = result {
                    log::error!("key-listener: rdev::listen exited with error: {:?}", e);
                }
            })
            .expect("failed to spawn key-listener thread");

        log::info!("key-listener: global key hook started");

        Self {
            stop,
            _thread: thread,
        }
    }

    /// Stop forwarding events.  Equivalent to dropping the handle.
    pub fn stop(&self) {
        if !self.stop.swap(true, Ordering::Relaxed) {
            log::info!("key-listener: global key hook released");
        }
    }
}

impl Drop for KeyListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn forward(tx: &mpsc::Sender<InputEvent>, event: InputEvent) {
    match tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            log::warn!("key-listener: input queue full, dropping key event");
        }
        // Receiver gone: the orchestrator has shut down.
        Err(TrySendError::Closed(_)) => {}
    }
}
