use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::TrezorControllerConfig;
use crate::errors::{ControllerError, ControllerResult};
use crate::protocol::{encode, EmulatorCommand, EmulatorResponse, EmulatorSetup, SwipeDirection};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Request/response client for the emulator control server.
///
/// Each request is tagged with the next correlation id and answered by the
/// next reply frame. Operations take `&mut self`, so a connection never has
/// more than one request in flight.
pub struct TrezorEmulatorController {
    config: TrezorControllerConfig,
    socket: Option<Socket>,
    temp_id: u64,
    client_info: Option<Value>,
}

impl TrezorEmulatorController {
    pub fn new(config: TrezorControllerConfig) -> Self {
        Self {
            config,
            socket: None,
            temp_id: 0,
            client_info: None,
        }
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(TrezorControllerConfig {
            url: url.into(),
            ..TrezorControllerConfig::default()
        })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    /// Correlation id of the most recent request, if any was sent.
    pub fn last_temp_id(&self) -> Option<u64> {
        (self.temp_id > 0).then_some(self.temp_id)
    }

    /// Latest `type: "client"` greeting received from the server.
    pub fn client_info(&self) -> Option<&Value> {
        self.client_info.as_ref()
    }

    pub async fn connect(&mut self) -> ControllerResult<()> {
        let url = self.config.url.clone();
        let wait = Duration::from_millis(self.config.connect_timeout_ms);

        let (socket, _response) = timeout(wait, connect_async(url.as_str()))
            .await
            .map_err(|_| ControllerError::ConnectTimeout { url: url.clone() })?
            .map_err(|source| ControllerError::Connect {
                url: url.clone(),
                source,
            })?;

        self.socket = Some(socket);
        info!(target: "trezor-emulator", %url, "connected to emulator controller");
        Ok(())
    }

    /// Sends `command` and waits for its reply.
    pub async fn send(&mut self, command: EmulatorCommand) -> ControllerResult<EmulatorResponse> {
        let socket = self.socket.as_mut().ok_or(ControllerError::NotConnected)?;
        self.temp_id += 1;
        let temp_id = self.temp_id;
        let frame = encode(&command, temp_id)?;

        socket.send(Message::Text(frame)).await?;
        debug!(target: "trezor-emulator", command = command.name(), temp_id, "request sent");

        let timeout_ms = self.config.response_timeout_ms;
        let reply = timeout(
            Duration::from_millis(timeout_ms),
            next_reply(socket, &mut self.client_info, temp_id),
        )
        .await
        .map_err(|_| ControllerError::Timeout {
            command: command.name(),
            timeout_ms,
        })??;

        debug!(
            target: "trezor-emulator",
            command = command.name(),
            temp_id,
            success = ?reply.success(),
            "reply received"
        );
        Ok(reply)
    }

    pub async fn ping(&mut self) -> ControllerResult<EmulatorResponse> {
        self.send(EmulatorCommand::Ping).await
    }

    /// Starts the emulator with `version`, or the configured firmware.
    pub async fn emulator_start(
        &mut self,
        version: Option<&str>,
    ) -> ControllerResult<EmulatorResponse> {
        let version = version
            .map(str::to_string)
            .or_else(|| self.config.firmware_version.clone());
        self.send(EmulatorCommand::EmulatorStart {
            version,
            wipe: None,
        })
        .await
    }

    pub async fn emulator_stop(&mut self) -> ControllerResult<EmulatorResponse> {
        self.send(EmulatorCommand::EmulatorStop).await
    }

    pub async fn emulator_wipe(&mut self) -> ControllerResult<EmulatorResponse> {
        self.send(EmulatorCommand::EmulatorWipe).await
    }

    pub async fn emulator_setup(
        &mut self,
        setup: EmulatorSetup,
    ) -> ControllerResult<EmulatorResponse> {
        self.send(EmulatorCommand::EmulatorSetup(setup)).await
    }

    pub async fn emulator_reset_device(&mut self) -> ControllerResult<EmulatorResponse> {
        self.send(EmulatorCommand::EmulatorResetDevice).await
    }

    pub async fn emulator_press_yes(&mut self) -> ControllerResult<EmulatorResponse> {
        self.send(EmulatorCommand::EmulatorPressYes).await
    }

    pub async fn emulator_press_no(&mut self) -> ControllerResult<EmulatorResponse> {
        self.send(EmulatorCommand::EmulatorPressNo).await
    }

    pub async fn emulator_allow_unsafe_paths(&mut self) -> ControllerResult<EmulatorResponse> {
        self.send(EmulatorCommand::EmulatorAllowUnsafePaths).await
    }

    pub async fn emulator_read_and_confirm_mnemonic(
        &mut self,
    ) -> ControllerResult<EmulatorResponse> {
        self.send(EmulatorCommand::EmulatorReadAndConfirmMnemonic)
            .await
    }

    pub async fn emulator_swipe(
        &mut self,
        direction: SwipeDirection,
    ) -> ControllerResult<EmulatorResponse> {
        self.send(EmulatorCommand::EmulatorSwipe { direction }).await
    }

    pub async fn emulator_input(
        &mut self,
        value: impl Into<String>,
    ) -> ControllerResult<EmulatorResponse> {
        self.send(EmulatorCommand::EmulatorInput {
            value: value.into(),
        })
        .await
    }

    /// Starts the bridge with `version`, or the configured bridge version.
    pub async fn bridge_start(
        &mut self,
        version: Option<&str>,
    ) -> ControllerResult<EmulatorResponse> {
        let version = version
            .map(str::to_string)
            .or_else(|| self.config.bridge_version.clone());
        self.send(EmulatorCommand::BridgeStart { version }).await
    }

    pub async fn bridge_stop(&mut self) -> ControllerResult<EmulatorResponse> {
        self.send(EmulatorCommand::BridgeStop).await
    }

    pub async fn background_check(&mut self) -> ControllerResult<EmulatorResponse> {
        self.send(EmulatorCommand::BackgroundCheck).await
    }

    /// Asks the server to shut down and waits for it to close the socket.
    pub async fn exit(&mut self) -> ControllerResult<()> {
        let mut socket = self.socket.take().ok_or(ControllerError::NotConnected)?;
        self.temp_id += 1;
        let frame = encode(&EmulatorCommand::Exit, self.temp_id)?;
        socket.send(Message::Text(frame)).await?;

        let timeout_ms = self.config.response_timeout_ms;
        timeout(Duration::from_millis(timeout_ms), drain_until_closed(&mut socket))
            .await
            .map_err(|_| ControllerError::Timeout {
                command: EmulatorCommand::Exit.name(),
                timeout_ms,
            })??;

        info!(target: "trezor-emulator", url = %self.config.url, "emulator controller exited");
        Ok(())
    }

    /// Closes the socket without stopping the server.
    pub async fn disconnect(&mut self) -> ControllerResult<()> {
        let Some(mut socket) = self.socket.take() else {
            return Ok(());
        };
        match socket.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => {}
            Err(err) => return Err(err.into()),
        }
        debug!(target: "trezor-emulator", url = %self.config.url, "disconnected");
        Ok(())
    }
}

async fn next_reply(
    socket: &mut Socket,
    client_info: &mut Option<Value>,
    temp_id: u64,
) -> ControllerResult<EmulatorResponse> {
    loop {
        let message = match socket.next().await {
            Some(message) => message?,
            None => return Err(ControllerError::ConnectionClosed),
        };
        let reply = match message {
            Message::Text(text) => EmulatorResponse::parse(&text)?,
            Message::Binary(bytes) => EmulatorResponse::parse_bytes(&bytes)?,
            Message::Close(_) => return Err(ControllerError::ConnectionClosed),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        };

        if reply.is_client_hello() {
            debug!(target: "trezor-emulator", "client greeting received");
            *client_info = Some(reply.into_payload());
            continue;
        }
        match reply.correlation_id() {
            Some(id) if id == temp_id => return Ok(reply),
            Some(id) => {
                warn!(target: "trezor-emulator", expected = temp_id, got = id, "stale reply dropped");
            }
            None if reply.background_check() => {
                debug!(target: "trezor-emulator", "background status skipped");
            }
            None => return Ok(reply),
        }
    }
}

async fn drain_until_closed(socket: &mut Socket) -> ControllerResult<()> {
    loop {
        match socket.next().await {
            None => return Ok(()),
            Some(Ok(_)) => continue,
            Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => return Ok(()),
            Some(Err(WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake))) => {
                return Ok(())
            }
            Some(Err(err)) => return Err(err.into()),
        }
    }
}
