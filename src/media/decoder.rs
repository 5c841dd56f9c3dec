//! Video decode subprocess and raw frame reading.

use std::io::{self, BufReader, Read};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::time::Duration;

use crate::error::{PlayerError, Result};

use super::process;

/// How long to wait for the decoder's exit status once its stream closes.
const EXIT_STATUS_WAIT: Duration = Duration::from_millis(250);

/// Lower bound for the pipe read buffer.
const MIN_PIPE_BUFFER: usize = 64 * 1024;

/// Outcome of a single frame read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRead {
    /// The buffer now holds one complete frame.
    Frame,
    /// The stream closed. `partial` bytes of an incomplete frame were dropped.
    EndOfStream { partial: usize },
}

/// Anything that yields fixed-size raw frames.
pub trait FrameSource {
    /// Byte size of every frame.
    fn frame_len(&self) -> usize;

    /// Fill `buf` (exactly `frame_len()` bytes) with the next frame.
    fn read_frame(&mut self, buf: &mut [u8]) -> Result<FrameRead>;
}

/// Reads whole frames from a byte stream, blocking until each is complete.
pub struct FrameReader<R> {
    reader: R,
    frame_len: usize,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R, frame_len: usize) -> Self {
        Self { reader, frame_len }
    }

    /// Read exactly one frame, or report end of stream on a short read.
    pub fn read_into(&mut self, buf: &mut [u8]) -> io::Result<FrameRead> {
        let buf = &mut buf[..self.frame_len];
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        if filled == buf.len() {
            Ok(FrameRead::Frame)
        } else {
            Ok(FrameRead::EndOfStream { partial: filled })
        }
    }
}

impl<R: Read> FrameSource for FrameReader<R> {
    fn frame_len(&self) -> usize {
        self.frame_len
    }

    fn read_frame(&mut self, buf: &mut [u8]) -> Result<FrameRead> {
        Ok(self.read_into(buf)?)
    }
}

/// A running decoder whose stdout carries raw grayscale frames.
///
/// Owned by the session; only the session terminates it.
pub struct DecoderHandle {
    child: Child,
    frames: FrameReader<BufReader<ChildStdout>>,
    program: String,
}

impl DecoderHandle {
    /// Spawn `cmd` with its stdout piped and everything else silenced.
    ///
    /// # Errors
    /// * `PlayerError::DependencyMissing` - If the program does not exist
    /// * `PlayerError::Spawn` - If the process fails to start otherwise
    pub fn spawn(mut cmd: Command, frame_len: usize) -> Result<Self> {
        let program = cmd.get_program().to_string_lossy().into_owned();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd.spawn().map_err(|e| PlayerError::spawn(&program, e))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = process::terminate(&mut child, Duration::ZERO);
            return Err(PlayerError::Io(io::Error::other("decoder stdout was not captured")));
        };

        let capacity = (frame_len * 4).max(MIN_PIPE_BUFFER);
        log::debug!("Started decoder '{}' (pid {})", program, child.id());

        Ok(Self {
            child,
            frames: FrameReader::new(BufReader::with_capacity(capacity, stdout), frame_len),
            program,
        })
    }

    /// Check if the decoder has not exited yet.
    pub fn is_running(&mut self) -> bool {
        process::is_running(&mut self.child)
    }

    /// Stop the decoder: SIGTERM, bounded wait, then kill.
    pub fn terminate(&mut self, grace: Duration) -> io::Result<ExitStatus> {
        process::terminate(&mut self.child, grace)
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }
}

impl FrameSource for DecoderHandle {
    fn frame_len(&self) -> usize {
        self.frames.frame_len
    }

    fn read_frame(&mut self, buf: &mut [u8]) -> Result<FrameRead> {
        let read = self.frames.read_into(buf).map_err(|e| PlayerError::DecodeStream {
            exit_code: None,
            detail: format!("reading from '{}' failed: {}", self.program, e),
        })?;

        let FrameRead::EndOfStream { partial } = read else {
            return Ok(read);
        };

        if partial > 0 {
            log::debug!(
                "Decoder stream ended mid-frame ({} of {} bytes)",
                partial,
                self.frames.frame_len
            );
        }

        // A closed stream is only a clean end if the decoder also exits cleanly.
        match process::wait_timeout(&mut self.child, EXIT_STATUS_WAIT) {
            Ok(Some(status)) if !status.success() => Err(PlayerError::DecodeStream {
                exit_code: status.code(),
                detail: format!("'{}' exited with {}", self.program, status),
            }),
            Ok(_) => Ok(read),
            Err(e) => {
                log::debug!("Could not read decoder exit status: {}", e);
                Ok(read)
            }
        }
    }
}

impl Drop for DecoderHandle {
    fn drop(&mut self) {
        // Best effort; the session normally terminates explicitly.
        if self.is_running() {
            let _ = self.terminate(Duration::from_millis(500));
        }
    }
}
