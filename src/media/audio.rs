//! Background audio playback task.

use std::io;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::playback::StopSignal;

use super::process;

/// Interval between liveness/stop checks while audio plays.
pub const AUDIO_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Grace period for the player to exit after a stop request.
pub const AUDIO_STOP_GRACE: Duration = Duration::from_millis(500);

/// How the audio task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioOutcome {
    /// The player exited by itself.
    Finished,
    /// The player was stopped because the session stopped.
    Stopped,
    /// The session stopped during the offset delay; no player was started.
    Skipped,
    /// The player could not be started.
    Failed(String),
}

/// Handle to the background audio task.
///
/// The task owns the player process while it runs. The session only reaches
/// into the shared slot if the task fails to finish within its join bound.
pub struct AudioChannel {
    thread: Option<JoinHandle<AudioOutcome>>,
    player: Arc<Mutex<Option<Child>>>,
}

impl AudioChannel {
    /// Start the task: sleep `offset`, launch `cmd`, then poll it until it
    /// exits or `stop` is raised.
    ///
    /// The offset sleep is not interrupted by `stop`.
    pub fn start(cmd: Command, offset: Duration, stop: StopSignal) -> io::Result<Self> {
        let player = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&player);

        let thread = thread::Builder::new()
            .name("audio".to_string())
            .spawn(move || run_audio(cmd, offset, stop, slot))?;

        Ok(Self {
            thread: Some(thread),
            player,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Check if a player process is currently alive.
    pub fn player_running(&self) -> bool {
        match self.player.lock() {
            Ok(mut slot) => slot.as_mut().is_some_and(process::is_running),
            Err(_) => false,
        }
    }

    /// Join the task, waiting at most `timeout`.
    ///
    /// If the task is still running after the timeout, its player (if any) is
    /// terminated directly and `None` is returned.
    pub fn shutdown(&mut self, timeout: Duration) -> Option<AudioOutcome> {
        let handle = self.thread.take()?;

        let start = Instant::now();
        while !handle.is_finished() && start.elapsed() < timeout {
            thread::sleep(Duration::from_millis(10));
        }

        if handle.is_finished() {
            return match handle.join() {
                Ok(outcome) => Some(outcome),
                Err(_) => {
                    log::debug!("Audio task panicked");
                    self.kill_player();
                    None
                }
            };
        }

        log::debug!("Audio task did not finish within {:?}, killing player", timeout);
        self.kill_player();
        None
    }

    fn kill_player(&self) {
        let mut slot = match self.player.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(mut child) = slot.take() {
            let _ = process::terminate(&mut child, Duration::ZERO);
        }
    }
}

fn run_audio(
    mut cmd: Command,
    offset: Duration,
    stop: StopSignal,
    slot: Arc<Mutex<Option<Child>>>,
) -> AudioOutcome {
    if !offset.is_zero() {
        thread::sleep(offset);
    }

    if stop.is_stopping() {
        return AudioOutcome::Skipped;
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            let program = cmd.get_program().to_string_lossy().into_owned();
            log::debug!("Audio playback unavailable, could not start '{}': {}", program, e);
            return AudioOutcome::Failed(e.to_string());
        }
    };
    log::debug!("Started audio player (pid {})", child.id());

    match slot.lock() {
        Ok(mut s) => *s = Some(child),
        Err(poisoned) => *poisoned.into_inner() = Some(child),
    }

    let outcome = loop {
        {
            let Ok(mut guard) = slot.lock() else {
                break AudioOutcome::Failed("audio state lock poisoned".to_string());
            };
            let Some(child) = guard.as_mut() else {
                // Taken by the session after a join timeout.
                break AudioOutcome::Stopped;
            };

            match child.try_wait() {
                Ok(Some(status)) => {
                    if !status.success() {
                        log::debug!("Audio player exited with {}", status);
                    }
                    break AudioOutcome::Finished;
                }
                Ok(None) => {
                    if stop.is_stopping() {
                        if let Err(e) = process::terminate(child, AUDIO_STOP_GRACE) {
                            log::debug!("Stopping audio player failed: {}", e);
                        }
                        break AudioOutcome::Stopped;
                    }
                }
                Err(e) => {
                    log::debug!("Lost track of audio player: {}", e);
                    let _ = process::terminate(child, AUDIO_STOP_GRACE);
                    break AudioOutcome::Failed(e.to_string());
                }
            }
        }
        thread::sleep(AUDIO_POLL_INTERVAL);
    };

    if let Ok(mut guard) = slot.lock() {
        guard.take();
    }
    outcome
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::playback::StopReason;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", script]);
        cmd
    }

    #[test]
    fn test_audio_finishes_naturally() {
        let mut audio = AudioChannel::start(sh("exit 0"), Duration::ZERO, StopSignal::new()).unwrap();
        assert_eq!(audio.shutdown(Duration::from_secs(2)), Some(AudioOutcome::Finished));
    }

    #[test]
    fn test_audio_stops_on_signal() {
        let stop = StopSignal::new();
        let mut audio = AudioChannel::start(sh("exec sleep 10"), Duration::ZERO, stop.clone()).unwrap();
        thread::sleep(Duration::from_millis(150));
        assert!(audio.player_running());
        stop.request_stop(StopReason::UserCancel);
        assert_eq!(audio.shutdown(Duration::from_secs(2)), Some(AudioOutcome::Stopped));
        assert!(!audio.player_running());
    }

    #[test]
    fn test_audio_skipped_when_stopped_during_offset() {
        let stop = StopSignal::new();
        let mut audio =
            AudioChannel::start(sh("exec sleep 10"), Duration::from_millis(100), stop.clone()).unwrap();
        stop.request_stop(StopReason::Signal);
        assert_eq!(audio.shutdown(Duration::from_secs(2)), Some(AudioOutcome::Skipped));
    }

    #[test]
    fn test_audio_missing_player_is_not_fatal() {
        let cmd = Command::new("asciiplay-no-such-player");
        let mut audio = AudioChannel::start(cmd, Duration::ZERO, StopSignal::new()).unwrap();
        assert!(matches!(
            audio.shutdown(Duration::from_secs(2)),
            Some(AudioOutcome::Failed(_))
        ));
    }

    #[test]
    fn test_shutdown_twice_is_noop() {
        let mut audio = AudioChannel::start(sh("exit 0"), Duration::ZERO, StopSignal::new()).unwrap();
        assert!(audio.shutdown(Duration::from_secs(2)).is_some());
        assert!(audio.shutdown(Duration::from_secs(2)).is_none());
        assert!(audio.is_finished());
    }
}
