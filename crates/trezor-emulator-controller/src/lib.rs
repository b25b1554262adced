//! Client for the Trezor emulator control server.
//!
//! The server speaks JSON over a single WebSocket: every request carries a
//! `type` and a correlation id, every reply is matched back by that id.
//! Greetings and background status frames the server pushes on its own are
//! filtered out of the request/response flow.

pub mod config;
pub mod controller;
pub mod errors;
pub mod protocol;

pub use config::{TrezorControllerConfig, DEFAULT_CONTROLLER_URL};
pub use controller::TrezorEmulatorController;
pub use errors::{ControllerError, ControllerResult};
pub use protocol::{
    EmulatorCommand, EmulatorResponse, EmulatorSetup, SwipeDirection, DEFAULT_TEST_MNEMONIC,
};
