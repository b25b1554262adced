//! Wire types for the emulator control channel.
//!
//! Requests are JSON objects `{ "type": <action>, ...fields, "tempId": <n> }`.
//! Replies are free-form JSON objects; the fields this crate looks at are
//! `success`, `error`, `background_check`, `type` and the echoed id.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::{ControllerError, ControllerResult};

/// Field carrying the correlation id on outgoing requests.
pub const CORRELATION_FIELD: &str = "tempId";

/// Mnemonic the emulator is seeded with unless a test provides its own.
pub const DEFAULT_TEST_MNEMONIC: &str =
    "all all all all all all all all all all all all";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Device state applied by `emulator-setup`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmulatorSetup {
    pub mnemonic: String,
    pub pin: String,
    pub passphrase_protection: bool,
    pub label: String,
    pub needs_backup: bool,
}

impl Default for EmulatorSetup {
    fn default() -> Self {
        Self {
            mnemonic: DEFAULT_TEST_MNEMONIC.into(),
            pin: String::new(),
            passphrase_protection: false,
            label: "Hello!".into(),
            needs_backup: false,
        }
    }
}

impl EmulatorSetup {
    pub fn with_mnemonic(mnemonic: impl Into<String>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EmulatorCommand {
    Ping,
    EmulatorStart {
        #[serde(skip_serializing_if = "Option::is_none")]
        version: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        wipe: Option<bool>,
    },
    EmulatorStop,
    EmulatorWipe,
    EmulatorSetup(EmulatorSetup),
    EmulatorResetDevice,
    EmulatorPressYes,
    EmulatorPressNo,
    EmulatorAllowUnsafePaths,
    EmulatorReadAndConfirmMnemonic,
    EmulatorSwipe {
        direction: SwipeDirection,
    },
    EmulatorInput {
        value: String,
    },
    BridgeStart {
        #[serde(skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
    BridgeStop,
    BackgroundCheck,
    Exit,
}

impl EmulatorCommand {
    /// Wire name of the action, as sent in the `type` field.
    pub fn name(&self) -> &'static str {
        match self {
            EmulatorCommand::Ping => "ping",
            EmulatorCommand::EmulatorStart { .. } => "emulator-start",
            EmulatorCommand::EmulatorStop => "emulator-stop",
            EmulatorCommand::EmulatorWipe => "emulator-wipe",
            EmulatorCommand::EmulatorSetup(_) => "emulator-setup",
            EmulatorCommand::EmulatorResetDevice => "emulator-reset-device",
            EmulatorCommand::EmulatorPressYes => "emulator-press-yes",
            EmulatorCommand::EmulatorPressNo => "emulator-press-no",
            EmulatorCommand::EmulatorAllowUnsafePaths => "emulator-allow-unsafe-paths",
            EmulatorCommand::EmulatorReadAndConfirmMnemonic => {
                "emulator-read-and-confirm-mnemonic"
            }
            EmulatorCommand::EmulatorSwipe { .. } => "emulator-swipe",
            EmulatorCommand::EmulatorInput { .. } => "emulator-input",
            EmulatorCommand::BridgeStart { .. } => "bridge-start",
            EmulatorCommand::BridgeStop => "bridge-stop",
            EmulatorCommand::BackgroundCheck => "background-check",
            EmulatorCommand::Exit => "exit",
        }
    }
}

/// Serializes `command` with its correlation id into a text frame.
pub fn encode(command: &EmulatorCommand, temp_id: u64) -> ControllerResult<String> {
    let mut value = serde_json::to_value(command).map_err(ControllerError::Encode)?;
    if let Value::Object(fields) = &mut value {
        fields.insert(CORRELATION_FIELD.into(), json!(temp_id));
    }
    Ok(value.to_string())
}

/// One message received from the emulator.
#[derive(Clone, Debug, PartialEq)]
pub struct EmulatorResponse {
    payload: Value,
}

impl EmulatorResponse {
    pub fn parse(text: &str) -> ControllerResult<Self> {
        serde_json::from_str(text)
            .map(|payload| Self { payload })
            .map_err(|source| ControllerError::MalformedMessage {
                payload: text.to_string(),
                source,
            })
    }

    pub fn parse_bytes(bytes: &[u8]) -> ControllerResult<Self> {
        serde_json::from_slice(bytes)
            .map(|payload| Self { payload })
            .map_err(|source| ControllerError::MalformedMessage {
                payload: String::from_utf8_lossy(bytes).into_owned(),
                source,
            })
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }

    pub fn message_type(&self) -> Option<&str> {
        self.payload.get("type").and_then(Value::as_str)
    }

    pub fn success(&self) -> Option<bool> {
        self.payload.get("success").and_then(Value::as_bool)
    }

    pub fn background_check(&self) -> bool {
        self.payload
            .get("background_check")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Greeting the server pushes right after a client connects.
    pub fn is_client_hello(&self) -> bool {
        self.message_type() == Some("client")
    }

    /// Echoed correlation id, under either `tempId` or `id`.
    pub fn correlation_id(&self) -> Option<u64> {
        self.payload
            .get(CORRELATION_FIELD)
            .or_else(|| self.payload.get("id"))
            .and_then(Value::as_u64)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.payload.get("error").and_then(Value::as_str)
    }

    /// Fails with [`ControllerError::Rejected`] when the reply carries
    /// `success: false`. Replies without a `success` field pass through.
    pub fn ensure_success(self) -> ControllerResult<Self> {
        if self.success() == Some(false) {
            let message = self
                .error_message()
                .map(str::to_string)
                .unwrap_or_else(|| self.payload.to_string());
            return Err(ControllerError::Rejected { message });
        }
        Ok(self)
    }
}
