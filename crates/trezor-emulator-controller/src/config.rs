use serde::{Deserialize, Serialize};

pub const DEFAULT_CONTROLLER_URL: &str = "ws://localhost:9001/";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrezorControllerConfig {
    pub url: String,
    pub connect_timeout_ms: u64,
    /// Emulator start and setup can take tens of seconds on a cold machine.
    pub response_timeout_ms: u64,
    /// Firmware passed to `emulator-start` when the caller names none.
    pub firmware_version: Option<String>,
    /// Bridge passed to `bridge-start` when the caller names none.
    pub bridge_version: Option<String>,
}

impl Default for TrezorControllerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CONTROLLER_URL.into(),
            connect_timeout_ms: 10_000,
            response_timeout_ms: 60_000,
            firmware_version: None,
            bridge_version: None,
        }
    }
}
