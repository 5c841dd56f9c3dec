//! Playback session: cooperative stop, OS signal routing, frame pacing,
//! user controls and the orchestrator that ties them together.

mod controls;
mod pacer;
mod session;
mod signals;
mod stop;

pub use controls::{is_cancel_key, Controls, TerminalControls};
pub use pacer::{FpsSample, FramePacer, PACING_DEAD_BAND};
pub use session::{
    format_status, play_frames, PlaybackRequest, PlaybackSummary, Session, SessionState,
    AUDIO_JOIN_TIMEOUT, DECODER_STOP_GRACE,
};
pub use signals::SignalGuard;
pub use stop::{StopReason, StopSignal, StopState};
