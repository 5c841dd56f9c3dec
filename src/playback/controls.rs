//! Interactive start/cancel input.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::stop::StopSignal;

/// How often the start prompt re-checks the stop signal.
const START_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// User input the session reacts to.
pub trait Controls {
    /// Block until the user confirms start.
    ///
    /// Returns `false` if playback should not start (cancel key, or `stop`
    /// was raised while waiting).
    fn wait_for_start(&mut self, stop: &StopSignal) -> io::Result<bool>;

    /// Non-blocking check for a cancel key.
    fn cancel_requested(&mut self) -> io::Result<bool>;
}

/// Check whether a key cancels playback: Esc, Ctrl+C or `q`.
pub fn is_cancel_key(event: &KeyEvent) -> bool {
    match event.code {
        KeyCode::Esc => true,
        KeyCode::Char('c') | KeyCode::Char('C') => event.modifiers.contains(KeyModifiers::CONTROL),
        KeyCode::Char('q') | KeyCode::Char('Q') => event.modifiers.is_empty(),
        _ => false,
    }
}

/// Reads keys from the terminal via crossterm. Expects raw mode.
#[derive(Debug, Default)]
pub struct TerminalControls;

impl TerminalControls {
    pub fn new() -> Self {
        Self
    }
}

impl Controls for TerminalControls {
    fn wait_for_start(&mut self, stop: &StopSignal) -> io::Result<bool> {
        loop {
            if stop.is_stopping() {
                return Ok(false);
            }
            if !event::poll(START_POLL_INTERVAL)? {
                continue;
            }
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                // Raw mode swallows SIGINT, so Ctrl+C arrives as a key.
                let ctrl_c = matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
                    && key.modifiers.contains(KeyModifiers::CONTROL);
                return Ok(!ctrl_c);
            }
        }
    }

    fn cancel_requested(&mut self) -> io::Result<bool> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && is_cancel_key(&key) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
