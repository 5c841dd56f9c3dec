//! Wall-clock frame pacing.

use std::thread;
use std::time::{Duration, Instant};

/// Sleeps shorter than this are skipped.
pub const PACING_DEAD_BAND: Duration = Duration::from_millis(1);

/// Measured throughput, sampled at most once per refresh interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpsSample {
    pub frames: u64,
    pub fps: f64,
}

/// Keeps frame `n` on screen no earlier than `playback_start + n / frame_rate`.
///
/// Pacing is self-correcting: a late frame shrinks the next sleep instead of
/// shifting all later frames. Frames are never skipped, so under sustained
/// overload playback falls behind rather than breaking stream alignment.
#[derive(Debug, Clone)]
pub struct FramePacer {
    frame_rate: f64,
    session_start: Instant,
    playback_start: Instant,
    frames_emitted: u64,
    status_interval: Duration,
    last_status: Instant,
}

impl FramePacer {
    /// `playback_start` is `session_start + audio_offset`.
    pub fn new(
        session_start: Instant,
        audio_offset: Duration,
        frame_rate: f64,
        status_interval: Duration,
    ) -> Self {
        Self {
            frame_rate,
            session_start,
            playback_start: session_start + audio_offset,
            frames_emitted: 0,
            status_interval,
            last_status: session_start,
        }
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub fn session_start(&self) -> Instant {
        self.session_start
    }

    pub fn playback_start(&self) -> Instant {
        self.playback_start
    }

    /// Count one more emitted frame and return its 1-based index.
    pub fn record_frame(&mut self) -> u64 {
        self.frames_emitted += 1;
        self.frames_emitted
    }

    /// Wall-clock deadline for frame `n`.
    pub fn deadline(&self, n: u64) -> Instant {
        self.playback_start + Duration::from_secs_f64(n as f64 / self.frame_rate)
    }

    /// How long to sleep after the current frame, if at all.
    pub fn sleep_needed(&self, now: Instant) -> Option<Duration> {
        let remaining = self
            .deadline(self.frames_emitted)
            .saturating_duration_since(now);
        (remaining > PACING_DEAD_BAND).then_some(remaining)
    }

    /// Sleep until the current frame's deadline. Returns the time slept.
    pub fn pace(&self) -> Duration {
        match self.sleep_needed(Instant::now()) {
            Some(remaining) => {
                thread::sleep(remaining);
                remaining
            }
            None => Duration::ZERO,
        }
    }

    /// Time since playback start, zero while still inside the offset.
    pub fn playback_elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.playback_start)
    }

    /// Instantaneous FPS, if the refresh interval has passed since the last
    /// sample.
    pub fn status_sample(&mut self, now: Instant) -> Option<FpsSample> {
        if now.saturating_duration_since(self.last_status) < self.status_interval {
            return None;
        }
        self.last_status = now;

        let elapsed = self.playback_elapsed(now).as_secs_f64();
        let fps = if elapsed > 0.0 {
            self.frames_emitted as f64 / elapsed
        } else {
            0.0
        };
        Some(FpsSample {
            frames: self.frames_emitted,
            fps,
        })
    }
}
