//! Routes OS interrupt/terminate notifications into a [`StopSignal`].
//!
//! Each signal also carries one process-wide action that performs the
//! default disposition whenever no session guard is active. Once the last
//! guard is gone, an interrupt or terminate kills the process again.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use signal_hook::SigId;

use super::stop::StopSignal;

#[cfg(unix)]
const SIGNALS: &[i32] = &[
    signal_hook::consts::SIGINT,
    signal_hook::consts::SIGTERM,
    signal_hook::consts::SIGHUP,
];

#[cfg(not(unix))]
const SIGNALS: &[i32] = &[signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM];

/// Active guard count and the shared "run the default action" flag.
struct Restore {
    active: usize,
    armed: Option<Arc<AtomicBool>>,
}

static RESTORE: Mutex<Restore> = Mutex::new(Restore {
    active: 0,
    armed: None,
});

fn restore_state() -> MutexGuard<'static, Restore> {
    RESTORE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registered signal actions for one session.
///
/// The action only raises the session's interrupt flag. All cleanup happens
/// in the session's own teardown. Dropping the guard unregisters the actions,
/// so a later notification no longer reaches this session.
pub struct SignalGuard {
    ids: Vec<SigId>,
    counted: bool,
}

impl SignalGuard {
    /// Register interrupt/terminate (and hangup on Unix) for `stop`.
    pub fn install(stop: &StopSignal) -> io::Result<Self> {
        let mut restore = restore_state();
        if restore.armed.is_none() {
            let armed = Arc::new(AtomicBool::new(false));
            for &signal in SIGNALS {
                signal_hook::flag::register_conditional_default(signal, armed.clone())?;
            }
            restore.armed = Some(armed);
        }

        let flag = stop.interrupt_flag();
        let mut guard = Self {
            ids: Vec::new(),
            counted: false,
        };
        for &signal in SIGNALS {
            // On failure, `guard` drops and unregisters what was registered.
            let id = signal_hook::flag::register(signal, flag.clone())?;
            guard.ids.push(id);
        }

        restore.active += 1;
        if let Some(armed) = &restore.armed {
            armed.store(false, Ordering::SeqCst);
        }
        guard.counted = true;
        log::debug!("Registered {} signal handlers", guard.ids.len());
        Ok(guard)
    }

    /// Unregister all actions. Safe to call more than once.
    ///
    /// When the last guard goes, the default actions take effect again.
    pub fn uninstall(&mut self) {
        for id in self.ids.drain(..) {
            signal_hook::low_level::unregister(id);
        }
        if std::mem::take(&mut self.counted) {
            let mut restore = restore_state();
            restore.active = restore.active.saturating_sub(1);
            if restore.active == 0 {
                if let Some(armed) = &restore.armed {
                    armed.store(true, Ordering::SeqCst);
                }
            }
        }
    }

    pub fn is_installed(&self) -> bool {
        !self.ids.is_empty()
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.uninstall();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::playback::StopReason;

    // Tests that raise signals share process-wide handlers; keep them in one
    // test so they cannot interleave. Restoring the default action is
    // covered in a child process by tests/signals_e2e.rs.
    #[test]
    fn test_signal_routes_to_stop_then_unregisters() {
        let stop = StopSignal::new();
        let mut guard = SignalGuard::install(&stop).unwrap();
        assert!(guard.is_installed());

        signal_hook::low_level::raise(signal_hook::consts::SIGTERM).unwrap();
        assert!(stop.is_stopping());
        assert_eq!(stop.reason(), Some(StopReason::Signal));

        // A fresh session is not affected by handlers of the old one.
        let next = StopSignal::new();
        let _next_guard = SignalGuard::install(&next).unwrap();
        guard.uninstall();
        assert!(!guard.is_installed());
        guard.uninstall();

        assert!(!next.is_stopping());
        signal_hook::low_level::raise(signal_hook::consts::SIGINT).unwrap();
        assert!(next.is_stopping());
    }
}
