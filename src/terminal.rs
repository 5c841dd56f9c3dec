//! Terminal mode management with panic-safe cleanup.

use crossterm::cursor::{Hide, Show};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use std::io::{self, Write};
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};

/// Tracks whether the terminal is in playback mode (for the panic hook).
pub(crate) static TERMINAL_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Puts the terminal into raw mode on the alternate screen with the cursor
/// hidden, and restores it on drop, on panic and on early exit.
pub struct TerminalGuard {
    active: bool,
}

impl TerminalGuard {
    /// # Errors
    /// Returns an error if raw mode or the alternate screen cannot be entered.
    /// Any partial change is undone first.
    pub fn enter() -> io::Result<Self> {
        install_panic_hook();

        enable_raw_mode()?;
        TERMINAL_ACTIVE.store(true, Ordering::SeqCst);
        let guard = Self { active: true };

        crossterm::execute!(io::stdout(), EnterAlternateScreen, Hide)?;
        Ok(guard)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Restore the terminal now. Drop becomes a no-op afterwards.
    pub fn restore(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        TERMINAL_ACTIVE.store(false, Ordering::SeqCst);

        let mut stdout = io::stdout();
        let screen = crossterm::execute!(stdout, Show, LeaveAlternateScreen);
        let raw = disable_raw_mode();
        stdout.flush()?;
        screen.and(raw)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Restore the terminal before the default hook prints a panic message.
pub(crate) fn install_panic_hook() {
    static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

    if HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }

    let original_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        if TERMINAL_ACTIVE.swap(false, Ordering::SeqCst) {
            let _ = crossterm::execute!(io::stdout(), Show, LeaveAlternateScreen);
            let _ = disable_raw_mode();
        }
        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_guard_enter_and_restore() {
        // Raw mode needs a real TTY; CI has none.
        match TerminalGuard::enter() {
            Ok(mut guard) => {
                assert!(guard.is_active());
                assert!(TERMINAL_ACTIVE.load(Ordering::SeqCst));
                guard.restore().unwrap();
                assert!(!guard.is_active());
                assert!(!TERMINAL_ACTIVE.load(Ordering::SeqCst));
                drop(guard);
                assert!(!TERMINAL_ACTIVE.load(Ordering::SeqCst));
            }
            Err(e) => eprintln!("Skipping test (no TTY): {}", e),
        }
    }

    #[test]
    fn test_panic_hook_installs_once() {
        install_panic_hook();
        install_panic_hook();
    }
}
