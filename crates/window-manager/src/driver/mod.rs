//! Browser automation primitives the window manager is built on.

mod memory;
mod webdriver;

use async_trait::async_trait;

use crate::errors::DriverResult;
use crate::model::{WindowHandle, WindowKind};

pub use memory::InMemoryDriver;
pub use webdriver::{WebDriverClient, WebDriverConfig};

/// The subset of a browser automation session needed to track windows.
///
/// Drivers only report the current set of live handles and let callers move
/// focus; everything else (naming, waiting for windows to appear or vanish)
/// lives in [`WindowManager`](crate::WindowManager).
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn window_handles(&self) -> DriverResult<Vec<WindowHandle>>;
    async fn current_window_handle(&self) -> DriverResult<WindowHandle>;
    async fn switch_to_window(&self, handle: &WindowHandle) -> DriverResult<()>;
    /// Opens a new tab or window and returns its handle. Focus is unchanged.
    async fn new_window(&self, kind: WindowKind) -> DriverResult<WindowHandle>;
    /// Closes the focused window. Focus is undefined until the next switch.
    async fn close_window(&self) -> DriverResult<()>;
    async fn title(&self) -> DriverResult<String>;
    async fn navigate(&self, url: &str) -> DriverResult<()>;
}
