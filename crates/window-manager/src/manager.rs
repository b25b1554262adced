use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::WindowManagerConfig;
use crate::driver::BrowserDriver;
use crate::errors::{DriverError, DriverResult, WindowError, WindowResult};
use crate::model::{WindowHandle, WindowKind, WindowRecord};
use crate::poll::poll_until;
use crate::registry::WindowRegistry;

/// Tracks browser windows by logical title for one automation session.
///
/// The driver can only list live handles and move focus, so every lifecycle
/// event (a pop-up appearing, a window going away) is discovered by polling
/// the handle list and reconciling it with the registry.
pub struct WindowManager {
    driver: Arc<dyn BrowserDriver>,
    config: WindowManagerConfig,
    registry: WindowRegistry,
}

impl WindowManager {
    pub fn new(driver: Arc<dyn BrowserDriver>, config: WindowManagerConfig) -> Self {
        Self {
            driver,
            config,
            registry: WindowRegistry::new(),
        }
    }

    pub fn driver(&self) -> Arc<dyn BrowserDriver> {
        Arc::clone(&self.driver)
    }

    pub fn config(&self) -> &WindowManagerConfig {
        &self.config
    }

    pub fn records(&self) -> Vec<WindowRecord> {
        self.registry.records()
    }

    pub fn titles(&self) -> Vec<String> {
        self.registry
            .records()
            .into_iter()
            .map(|record| record.title)
            .collect()
    }

    pub fn handle_of(&self, title: &str) -> Option<&WindowHandle> {
        self.registry.handle_of(title)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Registers the focused window as the first tracked window.
    pub async fn init(&mut self) -> WindowResult<WindowRecord> {
        if !self.registry.is_empty() {
            return Err(WindowError::AlreadyInitialized);
        }

        let handle = self.driver.current_window_handle().await?;
        let page_title = match self.wait_window_title().await? {
            Some(title) => title,
            None => {
                warn!(
                    target: "window-manager",
                    %handle,
                    timeout_ms = self.config.wait_timeout_ms,
                    "initial window never reported a title"
                );
                String::new()
            }
        };
        let title = self.config.classify_title(&page_title);
        let record = self.registry.insert(title, handle)?;

        info!(
            target: "window-manager",
            title = %record.title,
            page_title = %page_title,
            handle = %record.handle,
            "tracking initial window"
        );
        Ok(record)
    }

    pub async fn open_new_tab(&mut self, title: &str, url: &str) -> WindowResult<WindowRecord> {
        self.open_new(WindowKind::Tab, title, url).await
    }

    pub async fn open_new_window(&mut self, title: &str, url: &str) -> WindowResult<WindowRecord> {
        self.open_new(WindowKind::Window, title, url).await
    }

    async fn open_new(
        &mut self,
        kind: WindowKind,
        title: &str,
        url: &str,
    ) -> WindowResult<WindowRecord> {
        if self.registry.contains_title(title) {
            return Err(WindowError::DuplicateTitle {
                title: title.to_string(),
            });
        }

        let previous = self.driver.current_window_handle().await.ok();
        let handle = self.driver.new_window(kind).await?;
        if let Err(err) = self.load_in(&handle, url).await {
            self.discard_window(&handle, previous.as_ref()).await;
            return Err(err.into());
        }
        let record = self.registry.insert(title, handle)?;

        info!(
            target: "window-manager",
            title = %record.title,
            handle = %record.handle,
            kind = kind.as_str(),
            url,
            "opened window"
        );
        Ok(record)
    }

    /// Waits for the browser to report handles the registry does not know.
    ///
    /// Returns every untracked handle seen once the live list outgrows the
    /// registry, or an empty list when nothing appears before the timeout.
    pub async fn find_new_windows(&self) -> WindowResult<Vec<WindowHandle>> {
        if self.registry.is_empty() {
            return Err(WindowError::NotInitialized);
        }

        let driver = &self.driver;
        let registry = &self.registry;
        let found = poll_until(self.config.new_window_wait(), move || async move {
            let live = driver.window_handles().await?;
            let fresh = if live.len() > registry.len() {
                registry.untracked(&live)
            } else {
                Vec::new()
            };
            Ok::<_, DriverError>((!fresh.is_empty()).then_some(fresh))
        })
        .await?;

        match found {
            Some(fresh) => {
                debug!(target: "window-manager", count = fresh.len(), "new windows detected");
                Ok(fresh)
            }
            None => {
                debug!(
                    target: "window-manager",
                    timeout_ms = self.config.wait_timeout_ms,
                    "no new windows before timeout"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Registers the single window that appeared since the last check under
    /// `title` and moves focus to it.
    pub async fn find_new_window_and_switch_to(
        &mut self,
        title: &str,
    ) -> WindowResult<WindowRecord> {
        if self.registry.contains_title(title) {
            return Err(WindowError::DuplicateTitle {
                title: title.to_string(),
            });
        }

        let fresh = self.find_new_windows().await?;
        if fresh.len() > 1 {
            return Err(WindowError::AmbiguousNewWindow {
                title: title.to_string(),
                count: fresh.len(),
                handles: fresh,
            });
        }
        let Some(handle) = fresh.into_iter().next() else {
            return Err(WindowError::NoNewWindow {
                title: title.to_string(),
                waited_ms: self.config.wait_timeout_ms,
            });
        };

        self.driver.switch_to_window(&handle).await?;
        let record = self.registry.insert(title, handle)?;
        if self.wait_window_title().await?.is_none() {
            warn!(
                target: "window-manager",
                title = %record.title,
                handle = %record.handle,
                "new window still untitled after timeout"
            );
        }

        info!(
            target: "window-manager",
            title = %record.title,
            handle = %record.handle,
            "switched to new window"
        );
        Ok(record)
    }

    pub async fn switch_to(&self, title: &str) -> WindowResult<()> {
        let handle = self.lookup(title)?;
        self.driver.switch_to_window(&handle).await?;
        debug!(target: "window-manager", title, %handle, "switched window");
        Ok(())
    }

    /// Closes `title_to_close` and leaves focus on `switch_to_title`.
    ///
    /// Both titles are resolved before anything is closed, so an unknown
    /// target never leaves the session without a focused window.
    pub async fn close_tab_window(
        &mut self,
        title_to_close: &str,
        switch_to_title: &str,
    ) -> WindowResult<()> {
        let closing = self.lookup(title_to_close)?;
        let target = self.lookup(switch_to_title)?;

        self.driver.switch_to_window(&closing).await?;
        self.driver.close_window().await?;
        self.registry.remove_title(title_to_close);
        self.driver.switch_to_window(&target).await?;

        info!(
            target: "window-manager",
            closed = title_to_close,
            focused = switch_to_title,
            "closed window"
        );
        Ok(())
    }

    /// Reports whether the window tracked as `title` is gone, dropping its
    /// record once the browser no longer lists the handle.
    ///
    /// An untracked title counts as closed without asking the driver.
    pub async fn is_closed(&mut self, title: &str) -> WindowResult<bool> {
        let Some(handle) = self.registry.handle_of(title).cloned() else {
            debug!(target: "window-manager", title, "window not tracked; treating as closed");
            return Ok(true);
        };

        let driver = &self.driver;
        let tracked = &handle;
        let gone = poll_until(self.config.close_wait(), move || async move {
            let live = driver.window_handles().await?;
            Ok::<_, DriverError>((!live.contains(tracked)).then_some(()))
        })
        .await?;

        if gone.is_none() {
            debug!(target: "window-manager", title, %handle, "window still open");
            return Ok(false);
        }

        self.registry.remove_title(title);
        info!(target: "window-manager", title, %handle, "window closed");
        Ok(true)
    }

    pub async fn wait_for_closing_and_switch_to(
        &mut self,
        title_to_close: &str,
        title_switch_to: &str,
    ) -> WindowResult<()> {
        if !self.is_closed(title_to_close).await? {
            return Err(WindowError::StillOpen {
                title: title_to_close.to_string(),
            });
        }
        self.switch_to(title_switch_to).await
    }

    /// Logical title of the window the driver currently focuses.
    pub async fn current_window_name(&self) -> WindowResult<String> {
        let handle = self.driver.current_window_handle().await?;
        self.registry
            .title_of(&handle)
            .map(str::to_string)
            .ok_or(WindowError::UnknownHandle { handle })
    }

    fn lookup(&self, title: &str) -> WindowResult<WindowHandle> {
        self.registry
            .handle_of(title)
            .cloned()
            .ok_or_else(|| WindowError::NoSuchWindow {
                title: title.to_string(),
            })
    }

    async fn load_in(&self, handle: &WindowHandle, url: &str) -> DriverResult<()> {
        self.driver.switch_to_window(handle).await?;
        self.driver.navigate(url).await
    }

    /// Closes a window that failed to load and restores the prior focus.
    /// Only closes after focus is confirmed on `handle`.
    async fn discard_window(&self, handle: &WindowHandle, previous: Option<&WindowHandle>) {
        let closed = match self.driver.switch_to_window(handle).await {
            Ok(()) => self.driver.close_window().await,
            Err(err) => Err(err),
        };
        if let Err(err) = closed {
            warn!(target: "window-manager", %handle, %err, "failed to close unloaded window");
        }
        if let Some(previous) = previous {
            if let Err(err) = self.driver.switch_to_window(previous).await {
                warn!(target: "window-manager", %previous, %err, "failed to restore focus");
            }
        }
    }

    async fn wait_window_title(&self) -> WindowResult<Option<String>> {
        let driver = &self.driver;
        let title = poll_until(self.config.title_wait(), move || async move {
            let title = driver.title().await?;
            Ok::<_, DriverError>((!title.trim().is_empty()).then_some(title))
        })
        .await?;
        Ok(title)
    }
}
