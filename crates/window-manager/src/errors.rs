use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::WindowHandle;

/// Failure categories reported by a [`BrowserDriver`](crate::driver::BrowserDriver).
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum DriverErrorKind {
    #[error("no such window")]
    NoSuchWindow,
    #[error("no such session")]
    NoSuchSession,
    #[error("session not created")]
    SessionNotCreated,
    #[error("driver transport failure")]
    Transport,
    #[error("unexpected driver response")]
    Protocol,
    #[error("driver command failed")]
    Command,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub hint: Option<String>,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, ": {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for DriverError {}

impl DriverError {
    pub fn new(kind: DriverErrorKind) -> Self {
        Self { kind, hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn no_such_window(handle: &WindowHandle) -> Self {
        Self::new(DriverErrorKind::NoSuchWindow).with_hint(format!("handle {handle}"))
    }
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Errors surfaced by [`WindowManager`](crate::WindowManager) operations.
///
/// Lookups that need exactly one match distinguish "nothing registered"
/// ([`WindowError::NoSuchWindow`], [`WindowError::UnknownHandle`]) from
/// "more than one candidate" ([`WindowError::AmbiguousNewWindow`]).
#[derive(Debug, Error)]
pub enum WindowError {
    #[error("window manager is not initialized; call init() first")]
    NotInitialized,
    #[error("window manager is already initialized")]
    AlreadyInitialized,
    #[error("no window registered under title '{title}'")]
    NoSuchWindow { title: String },
    #[error("current handle {handle} is not registered under any title")]
    UnknownHandle { handle: WindowHandle },
    #[error("a window titled '{title}' is already registered")]
    DuplicateTitle { title: String },
    #[error("handle {handle} is already registered as '{title}'")]
    DuplicateHandle { handle: WindowHandle, title: String },
    #[error("no new window appeared for '{title}' within {waited_ms}ms")]
    NoNewWindow { title: String, waited_ms: u64 },
    #[error("expected exactly one new window for '{title}', found {count}: {handles:?}")]
    AmbiguousNewWindow {
        title: String,
        count: usize,
        handles: Vec<WindowHandle>,
    },
    #[error("window '{title}' is still open")]
    StillOpen { title: String },
    #[error(transparent)]
    Driver(#[from] DriverError),
}

pub type WindowResult<T> = Result<T, WindowError>;
