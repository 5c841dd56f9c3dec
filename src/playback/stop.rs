//! Shared cooperative stop signal.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

const RUNNING: u8 = 0;
const STOPPING: u8 = 1;
const STOPPED: u8 = 2;

/// Lifecycle of a [`StopSignal`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopState {
    Running,
    Stopping,
    Stopped,
}

/// Why a session left `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Cancel key pressed.
    UserCancel,
    /// Interrupt/terminate notification from the OS.
    Signal,
    /// The decoder stream closed.
    EndOfStream,
    /// The decoder failed.
    DecodeError,
}

impl StopReason {
    fn to_u8(self) -> u8 {
        match self {
            StopReason::UserCancel => 1,
            StopReason::Signal => 2,
            StopReason::EndOfStream => 3,
            StopReason::DecodeError => 4,
        }
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(StopReason::UserCancel),
            2 => Some(StopReason::Signal),
            3 => Some(StopReason::EndOfStream),
            4 => Some(StopReason::DecodeError),
            _ => None,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::UserCancel => "cancelled by user",
            StopReason::Signal => "interrupted",
            StopReason::EndOfStream => "end of stream",
            StopReason::DecodeError => "decode error",
        };
        f.write_str(text)
    }
}

#[derive(Debug)]
struct Inner {
    state: AtomicU8,
    reason: AtomicU8,
    /// Raised from signal context; folded into `state` on the next read.
    interrupted: Arc<AtomicBool>,
    teardown_claimed: AtomicBool,
}

/// Tri-state stop flag shared by the session, the audio task and the signal
/// handler.
///
/// `running -> stopping` may be requested by anyone, any number of times;
/// only the first request wins and records its reason. `stopping -> stopped`
/// happens exactly once, through [`StopSignal::finish`].
#[derive(Debug, Clone)]
pub struct StopSignal {
    inner: Arc<Inner>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: AtomicU8::new(RUNNING),
                reason: AtomicU8::new(0),
                interrupted: Arc::new(AtomicBool::new(false)),
                teardown_claimed: AtomicBool::new(false),
            }),
        }
    }

    /// Move to `Stopping`. Returns true only for the request that did it.
    pub fn request_stop(&self, reason: StopReason) -> bool {
        let won = self
            .inner
            .state
            .compare_exchange(RUNNING, STOPPING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if won {
            self.inner.reason.store(reason.to_u8(), Ordering::SeqCst);
        }
        won
    }

    /// Claim the right to run teardown. Returns true exactly once per signal.
    ///
    /// A still-running signal is moved to `Stopping` (without a reason) so
    /// every loop observing it winds down. The state stays `Stopping` until
    /// the claimant calls [`StopSignal::finish`].
    pub fn begin_teardown(&self) -> bool {
        self.sync_interrupt();
        let _ = self
            .inner
            .state
            .compare_exchange(RUNNING, STOPPING, Ordering::SeqCst, Ordering::SeqCst);
        !self.inner.teardown_claimed.swap(true, Ordering::SeqCst)
    }

    /// Move `Stopping -> Stopped` once teardown is complete. Returns true
    /// exactly once per signal.
    ///
    /// A still-running signal is moved through `Stopping` first.
    pub fn finish(&self) -> bool {
        self.sync_interrupt();
        let _ = self
            .inner
            .state
            .compare_exchange(RUNNING, STOPPING, Ordering::SeqCst, Ordering::SeqCst);
        self.inner
            .state
            .compare_exchange(STOPPING, STOPPED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn state(&self) -> StopState {
        self.sync_interrupt();
        match self.inner.state.load(Ordering::SeqCst) {
            RUNNING => StopState::Running,
            STOPPING => StopState::Stopping,
            _ => StopState::Stopped,
        }
    }

    /// True once a stop has been requested.
    pub fn is_stopping(&self) -> bool {
        self.state() != StopState::Running
    }

    /// Reason recorded by the winning stop request, if any.
    pub fn reason(&self) -> Option<StopReason> {
        self.sync_interrupt();
        StopReason::from_u8(self.inner.reason.load(Ordering::SeqCst))
    }

    /// Flag a signal handler may set without touching anything else.
    pub(crate) fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.inner.interrupted)
    }

    fn sync_interrupt(&self) {
        if self.inner.interrupted.load(Ordering::SeqCst) {
            self.request_stop(StopReason::Signal);
        }
    }
}
