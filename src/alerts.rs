//! # Alert Collaborators
//!
//! Notifications and the alert sound are best-effort side effects of a status
//! transition. The controller calls them through [`Notifier`] and
//! [`AlertSound`], logs any failure, and carries on.
//!
//! The terminal implementations print a banner line and ring the terminal
//! bell. Permission is only granted when the output is an interactive
//! terminal, since nobody would see a banner in a redirected log.

use std::io::{self, IsTerminal, Stdout, Write};
use thiserror::Error;

/// Title used for every crossing notification.
pub const ALERT_TITLE: &str = "Crossing alert";

/// Answer to a notification permission request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

#[derive(Error, Debug)]
pub enum AlertError {
    /// The platform has no way to show the alert
    #[error("alert channel unavailable: {0}")]
    Unavailable(&'static str),

    #[error("alert IO: {0}")]
    Io(#[from] io::Error),
}

/// User-facing notification channel.
pub trait Notifier {
    fn request_permission(&mut self) -> Permission;
    fn notify(&mut self, title: &str, body: &str) -> Result<(), AlertError>;
}

/// Audible alert.
pub trait AlertSound {
    fn play(&mut self) -> Result<(), AlertError>;
}

/// Banner notifications written to a terminal.
#[derive(Debug)]
pub struct TerminalNotifier<W: Write> {
    out: W,
    interactive: bool,
}

impl TerminalNotifier<Stdout> {
    pub fn stdout() -> Self {
        let out = io::stdout();
        let interactive = out.is_terminal();
        Self { out, interactive }
    }
}

impl<W: Write> TerminalNotifier<W> {
    pub fn new(out: W, interactive: bool) -> Self {
        Self { out, interactive }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Notifier for TerminalNotifier<W> {
    fn request_permission(&mut self) -> Permission {
        if self.interactive {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    fn notify(&mut self, title: &str, body: &str) -> Result<(), AlertError> {
        if !self.interactive {
            return Err(AlertError::Unavailable("output is not a terminal"));
        }
        writeln!(self.out, "🔔 {title}: {body}")?;
        self.out.flush()?;
        Ok(())
    }
}

/// ASCII BEL on a terminal.
#[derive(Debug)]
pub struct TerminalBell<W: Write> {
    out: W,
}

impl TerminalBell<Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> AlertSound for TerminalBell<W> {
    fn play(&mut self) -> Result<(), AlertError> {
        self.out.write_all(b"\x07")?;
        self.out.flush()?;
        Ok(())
    }
}
