use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::trace;

use super::BrowserDriver;
use crate::errors::{DriverError, DriverErrorKind, DriverResult};
use crate::model::{WindowHandle, WindowKind};

#[derive(Clone, Debug)]
struct SimWindow {
    handle: WindowHandle,
    kind: WindowKind,
    title: String,
    url: Option<String>,
}

#[derive(Debug, Default)]
struct SimState {
    windows: Vec<SimWindow>,
    current: Option<WindowHandle>,
    next_id: u64,
    handle_queries: usize,
    titles_by_url: HashMap<String, String>,
}

impl SimState {
    fn allocate(&mut self, kind: WindowKind, title: String) -> WindowHandle {
        self.next_id += 1;
        let handle = WindowHandle::new(format!("SIM-WINDOW-{:04}", self.next_id));
        self.windows.push(SimWindow {
            handle: handle.clone(),
            kind,
            title,
            url: None,
        });
        handle
    }

    fn window_mut(&mut self, handle: &WindowHandle) -> Option<&mut SimWindow> {
        self.windows.iter_mut().find(|window| &window.handle == handle)
    }

    fn focused_mut(&mut self) -> DriverResult<&mut SimWindow> {
        let current = self.current.clone().ok_or_else(|| {
            DriverError::new(DriverErrorKind::NoSuchWindow).with_hint("no window has focus")
        })?;
        self.window_mut(&current)
            .ok_or_else(|| DriverError::no_such_window(&current))
    }
}

/// Scriptable in-process browser.
///
/// Windows opened through [`BrowserDriver`] behave like real ones; the
/// `open_external` / `close_external` helpers simulate the page itself
/// spawning or dismissing a window (e.g. a wallet connector pop-up), which is
/// exactly what the window manager has to discover by polling.
#[derive(Debug)]
pub struct InMemoryDriver {
    state: Mutex<SimState>,
}

impl InMemoryDriver {
    /// Creates a browser with one focused window showing `initial_title`.
    pub fn new(initial_title: impl Into<String>) -> Self {
        let mut state = SimState::default();
        let handle = state.allocate(WindowKind::Window, initial_title.into());
        state.current = Some(handle);
        Self {
            state: Mutex::new(state),
        }
    }

    /// Adds a window the way a page-triggered pop-up would; focus stays put.
    pub fn open_external(&self, title: impl Into<String>) -> WindowHandle {
        self.state.lock().allocate(WindowKind::Window, title.into())
    }

    /// Removes a window without going through the session, as when a pop-up
    /// closes itself. Returns `false` if the handle was not live.
    pub fn close_external(&self, handle: &WindowHandle) -> bool {
        let mut state = self.state.lock();
        let before = state.windows.len();
        state.windows.retain(|window| &window.handle != handle);
        if state.current.as_ref() == Some(handle) {
            state.current = None;
        }
        state.windows.len() != before
    }

    pub fn set_title(&self, handle: &WindowHandle, title: impl Into<String>) -> bool {
        match self.state.lock().window_mut(handle) {
            Some(window) => {
                window.title = title.into();
                true
            }
            None => false,
        }
    }

    /// Title a window takes on after navigating to `url`. Unmapped URLs use
    /// the URL itself as title, as browsers do for untitled documents.
    pub fn map_url_title(&self, url: impl Into<String>, title: impl Into<String>) {
        self.state
            .lock()
            .titles_by_url
            .insert(url.into(), title.into());
    }

    pub fn focused(&self) -> Option<WindowHandle> {
        self.state.lock().current.clone()
    }

    pub fn live_handles(&self) -> Vec<WindowHandle> {
        self.state
            .lock()
            .windows
            .iter()
            .map(|window| window.handle.clone())
            .collect()
    }

    pub fn url_of(&self, handle: &WindowHandle) -> Option<String> {
        self.state
            .lock()
            .windows
            .iter()
            .find(|window| &window.handle == handle)
            .and_then(|window| window.url.clone())
    }

    pub fn kind_of(&self, handle: &WindowHandle) -> Option<WindowKind> {
        self.state
            .lock()
            .windows
            .iter()
            .find(|window| &window.handle == handle)
            .map(|window| window.kind)
    }

    /// Number of times the live handle list has been requested.
    pub fn handle_queries(&self) -> usize {
        self.state.lock().handle_queries
    }
}

#[async_trait]
impl BrowserDriver for InMemoryDriver {
    async fn window_handles(&self) -> DriverResult<Vec<WindowHandle>> {
        let mut state = self.state.lock();
        state.handle_queries += 1;
        Ok(state
            .windows
            .iter()
            .map(|window| window.handle.clone())
            .collect())
    }

    async fn current_window_handle(&self) -> DriverResult<WindowHandle> {
        let mut state = self.state.lock();
        Ok(state.focused_mut()?.handle.clone())
    }

    async fn switch_to_window(&self, handle: &WindowHandle) -> DriverResult<()> {
        let mut state = self.state.lock();
        if state.window_mut(handle).is_none() {
            return Err(DriverError::no_such_window(handle));
        }
        trace!(target: "window-manager", %handle, "sim focus change");
        state.current = Some(handle.clone());
        Ok(())
    }

    async fn new_window(&self, kind: WindowKind) -> DriverResult<WindowHandle> {
        Ok(self.state.lock().allocate(kind, String::new()))
    }

    async fn close_window(&self) -> DriverResult<()> {
        let mut state = self.state.lock();
        let handle = state.focused_mut()?.handle.clone();
        state.windows.retain(|window| window.handle != handle);
        state.current = None;
        Ok(())
    }

    async fn title(&self) -> DriverResult<String> {
        let mut state = self.state.lock();
        Ok(state.focused_mut()?.title.clone())
    }

    async fn navigate(&self, url: &str) -> DriverResult<()> {
        let mut state = self.state.lock();
        let title = state
            .titles_by_url
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());
        let window = state.focused_mut()?;
        window.url = Some(url.to_string());
        window.title = title;
        Ok(())
    }
}
