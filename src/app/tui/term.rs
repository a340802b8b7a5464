use std::io;

use anyhow::{Context, Result};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};

/// Raw-mode alternate screen with mouse capture, restored on drop even when
/// the event loop errors out.
pub(super) struct TermGuard {
    active: bool,
}

impl TermGuard {
    pub(super) fn enter() -> Result<Self> {
        enable_raw_mode().context("failed to enable raw mode")?;
        execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)
            .context("failed to enter alternate screen")?;
        Ok(Self { active: true })
    }

    pub(super) fn leave(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen)
            .context("failed to leave alternate screen")?;
        disable_raw_mode().context("failed to disable raw mode")?;
        self.active = false;
        Ok(())
    }
}

impl Drop for TermGuard {
    fn drop(&mut self) {
        if self.active {
            let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
            let _ = disable_raw_mode();
        }
    }
}
