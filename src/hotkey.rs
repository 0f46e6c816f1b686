// src/hotkey.rs
//
// Global hotkey -> control flag.
//
// The listener thread turns raw key events into transitions carrying the
// current modifier state, and the handler maps each transition onto the
// control flag: holding Right Control keeps the tone on, releasing any key
// turns it off.

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use log::{error, info, warn};
use rdev::{EventType, Key};

use crate::control_flag::ControlFlag;
use crate::error::SetupError;
use crate::lifecycle::Shutdown;

/// Modifier keys held at the time of a transition.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub left_control: bool,
    pub right_control: bool,
    pub left_shift: bool,
    pub right_shift: bool,
    pub alt: bool,
}

/// One key going down or up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KeyTransition {
    pub pressed: bool,
    pub modifiers: Modifiers,
}

/// Applies key transitions to the control flag.
///
/// Listener-side. Each call is a single atomic store at most.
#[derive(Debug, Clone)]
pub struct HotkeyHandler {
    flag: Arc<ControlFlag>,
}

impl HotkeyHandler {
    pub fn new(flag: Arc<ControlFlag>) -> Self {
        Self { flag }
    }

    #[inline]
    pub fn on_key(&self, transition: KeyTransition) {
        if !transition.pressed {
            self.flag.set(false);
            return;
        }
        if transition.modifiers.right_control {
            self.flag.set(true);
        }
    }
}

/// Tracks modifier state across raw listener events.
#[derive(Debug, Default)]
pub struct ModifierTracker {
    modifiers: Modifiers,
}

impl ModifierTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Fold one raw event into the modifier state.
    ///
    /// Returns the transition for key events, `None` for pointer events.
    /// A modifier press already counts as held in its own transition; a
    /// modifier release is reported with the modifier cleared.
    pub fn observe(&mut self, event: &EventType) -> Option<KeyTransition> {
        let (key, pressed) = match *event {
            EventType::KeyPress(key) => (key, true),
            EventType::KeyRelease(key) => (key, false),
            _ => return None,
        };

        match key {
            Key::ControlLeft => self.modifiers.left_control = pressed,
            Key::ControlRight => self.modifiers.right_control = pressed,
            Key::ShiftLeft => self.modifiers.left_shift = pressed,
            Key::ShiftRight => self.modifiers.right_shift = pressed,
            Key::Alt | Key::AltGr => self.modifiers.alt = pressed,
            _ => {}
        }

        Some(KeyTransition {
            pressed,
            modifiers: self.modifiers,
        })
    }
}

/// Start the global key listener on its own thread.
///
/// `rdev::listen` blocks for the life of the process, so the thread is
/// never joined; listener failures are reported through `shutdown`.
pub fn spawn_listener(
    handler: HotkeyHandler,
    shutdown: Sender<Shutdown>,
) -> Result<JoinHandle<()>, SetupError> {
    thread::Builder::new()
        .name("key-listener".into())
        .spawn(move || {
            info!("Key listener started (hold Right Control for tone)");

            let mut tracker = ModifierTracker::new();
            let result = rdev::listen(move |event| {
                if let Some(transition) = tracker.observe(&event.event_type) {
                    handler.on_key(transition);
                }
            });

            report_listener_exit(result, &shutdown);
        })
        .map_err(|source| SetupError::SpawnThread {
            name: "key-listener",
            source,
        })
}

/// Tell the control thread the listener is gone.
///
/// Either way key control is dead, so a clean return is reported the same
/// as an error.
fn report_listener_exit<E: std::fmt::Debug>(result: Result<(), E>, shutdown: &Sender<Shutdown>) {
    let reason = match result {
        Ok(()) => {
            warn!("Key listener returned unexpectedly");
            "listener stopped unexpectedly".to_string()
        }
        Err(e) => {
            error!("Key listener failed: {:?}", e);
            format!("{:?}", e)
        }
    };
    let _ = shutdown.send(Shutdown::ListenerFailed(SetupError::Listener(reason)));
}
