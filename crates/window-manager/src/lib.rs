//! Logical window tracking for multi-window browser automation.
//!
//! A wallet end-to-end session juggles several top-level contexts: the
//! extension tab, a mock dApp, and connector pop-ups the extension spawns on
//! its own. [`WindowManager`] names those contexts, discovers new ones by
//! polling the driver's handle list, and keeps its registry in step as they
//! close.

pub mod config;
pub mod driver;
pub mod errors;
pub mod manager;
pub mod model;
pub mod poll;
pub mod registry;

pub use config::{WindowManagerConfig, MAIN_WINDOW_TITLE};
pub use driver::{BrowserDriver, InMemoryDriver, WebDriverClient, WebDriverConfig};
pub use errors::{DriverError, DriverErrorKind, DriverResult, WindowError, WindowResult};
pub use manager::WindowManager;
pub use model::{WindowHandle, WindowKind, WindowRecord};
pub use poll::{poll_until, PollPolicy};
pub use registry::WindowRegistry;
