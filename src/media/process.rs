//! Subprocess liveness checks and bounded shutdown.

use std::io;
use std::process::{Child, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

/// Interval between liveness checks while waiting for a child to exit.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Check whether a child has not reported an exit code yet.
pub fn is_running(child: &mut Child) -> bool {
    matches!(child.try_wait(), Ok(None))
}

/// Wait up to `timeout` for a child to exit on its own.
///
/// Returns `Ok(None)` if it is still running when the timeout elapses.
pub fn wait_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            return Ok(None);
        }
        thread::sleep(WAIT_POLL_INTERVAL);
    }
}

/// Request a graceful exit, then force-kill if it takes longer than `grace`.
///
/// On Unix this sends SIGTERM; elsewhere it kills immediately.
/// An already-exited child is reaped and its status returned.
pub fn terminate(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    if let Some(status) = child.try_wait()? {
        return Ok(status);
    }

    #[cfg(unix)]
    {
        unsafe {
            libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
        }
    }

    #[cfg(not(unix))]
    {
        let _ = child.kill();
    }

    match wait_timeout(child, grace)? {
        Some(status) => Ok(status),
        None => {
            log::debug!("pid {} ignored SIGTERM, killing", child.id());
            let _ = child.kill();
            child.wait()
        }
    }
}
