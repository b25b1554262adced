use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("failed to connect to emulator at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },
    #[error("timed out connecting to emulator at {url}")]
    ConnectTimeout { url: String },
    #[error("controller is not connected")]
    NotConnected,
    #[error("websocket error: {0}")]
    Socket(#[from] tungstenite::Error),
    #[error("emulator connection closed")]
    ConnectionClosed,
    #[error("malformed emulator message {payload:?}: {source}")]
    MalformedMessage {
        payload: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode emulator command: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("no response to '{command}' within {timeout_ms}ms")]
    Timeout {
        command: &'static str,
        timeout_ms: u64,
    },
    #[error("emulator rejected request: {message}")]
    Rejected { message: String },
}

pub type ControllerResult<T> = Result<T, ControllerError>;
