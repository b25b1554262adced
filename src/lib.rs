//! Wallet end-to-end harness
//!
//! Ties configuration, logging, the browser window manager and the Trezor
//! emulator controller into a single [`HarnessSession`].

pub mod config;
pub mod session;
pub mod telemetry;

pub use config::{load_config, HarnessConfig, LoadedConfig, LoggingConfig};
pub use session::HarnessSession;
pub use telemetry::init_tracing;

pub use trezor_emulator_controller as trezor;
pub use window_manager as windows;
