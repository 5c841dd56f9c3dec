//! Session orchestration: startup, the per-frame loop and teardown.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::terminal::{Clear, ClearType};

use crate::ascii::{DisplayGeometry, GlyphLut, GlyphRenderer};
use crate::config::PlaybackConfig;
use crate::error::{PlayerError, Result};
use crate::media::{
    probe_or_default, AudioChannel, AudioOutcome, DecoderHandle, FrameRead, FrameSource, MediaTools,
    StreamMetadata,
};

use super::controls::Controls;
use super::pacer::{FpsSample, FramePacer};
use super::signals::SignalGuard;
use super::stop::{StopReason, StopSignal};

/// Grace period for the decoder after SIGTERM during teardown.
pub const DECODER_STOP_GRACE: Duration = Duration::from_secs(1);

/// Base bound for joining the audio task; the audio offset is added on top
/// because the offset sleep cannot be interrupted.
pub const AUDIO_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// What the user asked to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRequest {
    pub path: PathBuf,
    pub width: u16,
    pub height: u16,
}

/// Orchestrator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingUserStart,
    Priming,
    Playing,
    Draining,
    Closed,
}

/// Final report of a session.
#[derive(Debug)]
pub struct PlaybackSummary {
    pub frames_emitted: u64,
    /// Wall time since playback start (after the offset), zero if playback
    /// never started.
    pub elapsed: Duration,
    pub reason: Option<StopReason>,
    /// Set when playback ended because of a fatal error.
    pub error: Option<PlayerError>,
    /// How the audio task ended, if it ran. Audio problems never fail the
    /// session; they are reported here once the terminal is back.
    pub audio: Option<AudioOutcome>,
}

impl PlaybackSummary {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Why audio did not play, if it failed.
    pub fn audio_failure(&self) -> Option<&str> {
        match &self.audio {
            Some(AudioOutcome::Failed(reason)) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for PlaybackSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Playback finished | time: {:.1}s | frames: {}",
            self.elapsed.as_secs_f64(),
            self.frames_emitted
        )?;
        if let Some(reason) = self.reason {
            write!(f, " | {}", reason)?;
        }
        Ok(())
    }
}

/// Every resource a running session holds.
///
/// Only [`SessionContext::teardown`] touches the subprocess handles after
/// start, and it runs exactly once no matter how often it is called.
pub(crate) struct SessionContext {
    stop: StopSignal,
    signals: Option<SignalGuard>,
    decoder: Option<DecoderHandle>,
    audio: Option<AudioChannel>,
    audio_join_timeout: Duration,
    audio_outcome: Option<AudioOutcome>,
}

impl SessionContext {
    pub(crate) fn new(stop: StopSignal, audio_offset: Duration) -> Self {
        Self {
            stop,
            signals: None,
            decoder: None,
            audio: None,
            audio_join_timeout: AUDIO_JOIN_TIMEOUT + audio_offset,
            audio_outcome: None,
        }
    }

    /// Terminate the decoder, stop and join the audio task, and restore
    /// signal handling. Returns false if teardown already ran.
    ///
    /// The stop signal reaches `Stopped` only after everything is released.
    /// Errors are logged and swallowed.
    pub(crate) fn teardown(&mut self) -> bool {
        if !self.stop.begin_teardown() {
            return false;
        }

        if let Some(mut decoder) = self.decoder.take() {
            match decoder.terminate(DECODER_STOP_GRACE) {
                Ok(status) => log::debug!("Decoder stopped: {}", status),
                Err(e) => log::debug!("Failed to stop decoder (pid {}): {}", decoder.pid(), e),
            }
        }

        if let Some(mut audio) = self.audio.take() {
            match audio.shutdown(self.audio_join_timeout) {
                Some(outcome) => {
                    log::debug!("Audio task ended: {:?}", outcome);
                    self.audio_outcome = Some(outcome);
                }
                None => log::debug!("Audio task abandoned"),
            }
        }

        if let Some(mut signals) = self.signals.take() {
            signals.uninstall();
        }

        self.stop.finish();
        true
    }

    /// Record an audio failure that happened before the task could start.
    pub(crate) fn audio_failed(&mut self, reason: String) {
        self.audio_outcome = Some(AudioOutcome::Failed(reason));
    }

    #[cfg(test)]
    pub(crate) fn decoder_running(&mut self) -> bool {
        self.decoder.as_mut().is_some_and(|d| d.is_running())
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// One playback of one media file.
pub struct Session<'a> {
    config: &'a PlaybackConfig,
    tools: &'a dyn MediaTools,
    path: PathBuf,
    metadata: StreamMetadata,
    geometry: DisplayGeometry,
    lut: GlyphLut,
    state: SessionState,
    pacer: Option<FramePacer>,
}

impl<'a> Session<'a> {
    /// Validate inputs and read metadata. Starts no long-lived subprocess.
    ///
    /// # Errors
    /// * `PlayerError::SourceNotFound` - If the media path does not exist
    /// * `PlayerError::DependencyMissing` - If the decoder or player is missing
    /// * `PlayerError::InvalidRamp` - If the configured ramp is unusable
    pub fn prepare(
        config: &'a PlaybackConfig,
        tools: &'a dyn MediaTools,
        request: &PlaybackRequest,
    ) -> Result<Self> {
        if !request.path.exists() {
            return Err(PlayerError::SourceNotFound(request.path.clone()));
        }
        tools.check_available()?;

        let metadata = probe_or_default(tools, &request.path);
        let geometry = DisplayGeometry::clamped(
            request.width,
            request.height,
            config.min_display_width,
            config.min_display_height,
        );
        let lut = config.glyph_lut()?;

        Ok(Self {
            config,
            tools,
            path: request.path.clone(),
            metadata,
            geometry,
            lut,
            state: SessionState::Idle,
            pacer: None,
        })
    }

    pub fn metadata(&self) -> StreamMetadata {
        self.metadata
    }

    pub fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the session to completion. Teardown always happens before this
    /// returns.
    pub fn run<W: Write, C: Controls>(&mut self, out: &mut W, controls: &mut C) -> PlaybackSummary {
        let stop = StopSignal::new();
        let mut ctx = SessionContext::new(stop.clone(), self.config.audio_offset_duration());

        match SignalGuard::install(&stop) {
            Ok(guard) => ctx.signals = Some(guard),
            Err(e) => log::warn!("Could not install signal handlers: {}", e),
        }

        let result = self.drive(&mut ctx, out, controls);
        if let Err(ref e) = result {
            log::debug!("Playback aborted: {}", e);
        }

        self.set_state(SessionState::Draining);
        ctx.teardown();
        self.set_state(SessionState::Closed);

        let (frames_emitted, elapsed) = match &self.pacer {
            Some(pacer) => (pacer.frames_emitted(), pacer.playback_elapsed(Instant::now())),
            None => (0, Duration::ZERO),
        };

        PlaybackSummary {
            frames_emitted,
            elapsed,
            reason: stop.reason(),
            error: result.err(),
            audio: ctx.audio_outcome.take(),
        }
    }

    fn drive<W: Write, C: Controls>(
        &mut self,
        ctx: &mut SessionContext,
        out: &mut W,
        controls: &mut C,
    ) -> Result<()> {
        let stop = ctx.stop.clone();

        self.set_state(SessionState::AwaitingUserStart);
        write!(out, "Press any key to start, Esc/q/Ctrl+C to stop...")
            .and_then(|_| out.flush())
            .map_err(PlayerError::Terminal)?;
        if !controls.wait_for_start(&stop).map_err(PlayerError::Terminal)? {
            stop.request_stop(StopReason::UserCancel);
            return Ok(());
        }

        self.set_state(SessionState::Priming);
        let offset = self.config.audio_offset_duration();
        match AudioChannel::start(self.tools.audio_command(&self.path), offset, stop.clone()) {
            Ok(audio) => ctx.audio = Some(audio),
            Err(e) => ctx.audio_failed(e.to_string()),
        }

        crossterm::queue!(out, Clear(ClearType::All)).map_err(PlayerError::Terminal)?;

        let command =
            self.tools
                .decoder_command(&self.path, self.geometry, self.metadata.frame_rate);
        let decoder = ctx
            .decoder
            .insert(DecoderHandle::spawn(command, self.geometry.frame_len())?);

        thread::sleep(self.config.pipe_warmup_duration());

        let pacer = self.pacer.insert(FramePacer::new(
            Instant::now(),
            offset,
            self.metadata.frame_rate,
            self.config.status_refresh_duration(),
        ));
        let mut renderer = GlyphRenderer::new(self.lut.clone(), self.geometry);

        self.state = SessionState::Playing;
        log::debug!("Session state: {:?}", self.state);
        play_frames(
            decoder,
            &mut renderer,
            pacer,
            out,
            controls,
            &stop,
            self.config.audio_offset,
        )
    }

    fn set_state(&mut self, state: SessionState) {
        log::debug!("Session state: {:?} -> {:?}", self.state, state);
        self.state = state;
    }
}

/// The `Playing` loop: read, render, pace, poll, until the stream ends, the
/// decoder fails or `stop` is raised.
///
/// A partial frame is never rendered. Render always precedes the pacing
/// sleep, and the sleep precedes the next read.
pub fn play_frames<S, W, C>(
    source: &mut S,
    renderer: &mut GlyphRenderer,
    pacer: &mut FramePacer,
    out: &mut W,
    controls: &mut C,
    stop: &StopSignal,
    audio_offset: f64,
) -> Result<()>
where
    S: FrameSource + ?Sized,
    W: Write,
    C: Controls + ?Sized,
{
    let mut frame = vec![0u8; source.frame_len()];

    while !stop.is_stopping() {
        match source.read_frame(&mut frame) {
            Ok(FrameRead::Frame) => {}
            Ok(FrameRead::EndOfStream { .. }) => {
                stop.request_stop(StopReason::EndOfStream);
                break;
            }
            Err(e) => {
                stop.request_stop(StopReason::DecodeError);
                return Err(e);
            }
        }

        let n = pacer.record_frame();
        let status = pacer
            .status_sample(Instant::now())
            .map(|sample| format_status(sample, pacer.frame_rate(), audio_offset));

        let text = renderer.compose(&frame, status.as_deref());
        out.write_all(text.as_bytes())
            .and_then(|_| out.flush())
            .map_err(PlayerError::Terminal)?;
        log::trace!("Rendered frame {}", n);

        pacer.pace();

        if controls.cancel_requested().map_err(PlayerError::Terminal)? {
            stop.request_stop(StopReason::UserCancel);
        }
    }

    Ok(())
}

/// Status line shown under the render region.
pub fn format_status(sample: FpsSample, target_fps: f64, audio_offset: f64) -> String {
    format!(
        "frame: {:5} | fps: {:.1} | target: {:.1} | offset: {:.2}s",
        sample.frames, sample.fps, target_fps, audio_offset
    )
}
