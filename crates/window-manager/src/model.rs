use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque window identifier handed out by the automation driver.
///
/// Only meaningful while the window it names is alive.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(pub String);

impl WindowHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WindowHandle {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for WindowHandle {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// A logical title paired with the handle it currently resolves to.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct WindowRecord {
    pub title: String,
    pub handle: WindowHandle,
}

/// Kind of top-level browsing context to open.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Tab,
    Window,
}

impl WindowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowKind::Tab => "tab",
            WindowKind::Window => "window",
        }
    }
}
