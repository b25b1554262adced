use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use url::Url;

use super::BrowserDriver;
use crate::errors::{DriverError, DriverErrorKind, DriverResult};
use crate::model::{WindowHandle, WindowKind};

/// Connection settings for a W3C WebDriver endpoint (chromedriver,
/// geckodriver or a Selenium server).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WebDriverConfig {
    pub url: String,
    pub browser_name: String,
    pub headless: bool,
    pub request_timeout_ms: u64,
    /// Merged into `alwaysMatch` as-is (e.g. `goog:chromeOptions` with the
    /// unpacked extension to load).
    pub extra_capabilities: Map<String, Value>,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9515".into(),
            browser_name: "chrome".into(),
            headless: false,
            request_timeout_ms: 30_000,
            extra_capabilities: Map::new(),
        }
    }
}

impl WebDriverConfig {
    pub fn capabilities(&self) -> Value {
        let mut always = self.extra_capabilities.clone();
        always.insert("browserName".into(), json!(self.browser_name));

        if self.headless {
            let (key, flag) = match self.browser_name.as_str() {
                "firefox" => ("moz:firefoxOptions", "-headless"),
                _ => ("goog:chromeOptions", "--headless=new"),
            };
            let options = always
                .entry(key.to_string())
                .or_insert_with(|| json!({}));
            if let Some(options) = options.as_object_mut() {
                let args = options.entry("args").or_insert_with(|| json!([]));
                if let Some(args) = args.as_array_mut() {
                    if !args.iter().any(|arg| arg == flag) {
                        args.push(json!(flag));
                    }
                }
            }
        }

        json!({ "capabilities": { "alwaysMatch": always } })
    }
}

#[derive(Debug, Deserialize)]
struct NewSessionValue {
    #[serde(rename = "sessionId")]
    session_id: String,
    #[serde(default)]
    capabilities: Value,
}

#[derive(Debug, Deserialize)]
struct NewWindowValue {
    handle: String,
}

/// HTTP client for one WebDriver session.
pub struct WebDriverClient {
    http: reqwest::Client,
    base: Url,
    session_id: String,
    capabilities: Value,
}

impl WebDriverClient {
    /// Opens a new session with the capabilities derived from `config`.
    pub async fn new_session(config: &WebDriverConfig) -> DriverResult<Self> {
        let http = build_http(config.request_timeout_ms)?;
        let base = parse_base(&config.url)?;
        let endpoint = base.join("session").map_err(invalid_url)?;

        let response = http
            .post(endpoint)
            .json(&config.capabilities())
            .send()
            .await
            .map_err(transport)?;
        let value = decode(response).await.map_err(|err| {
            if err.kind == DriverErrorKind::Command {
                DriverError {
                    kind: DriverErrorKind::SessionNotCreated,
                    hint: err.hint,
                }
            } else {
                err
            }
        })?;
        let created: NewSessionValue = serde_json::from_value(value).map_err(|err| {
            DriverError::new(DriverErrorKind::Protocol)
                .with_hint(format!("malformed new-session payload: {err}"))
        })?;

        info!(
            target: "webdriver",
            session = %created.session_id,
            browser = %config.browser_name,
            "webdriver session created"
        );

        Ok(Self {
            http,
            base,
            session_id: created.session_id,
            capabilities: created.capabilities,
        })
    }

    /// Wraps an already running session.
    pub fn attach(
        url: &str,
        session_id: impl Into<String>,
        request_timeout_ms: u64,
    ) -> DriverResult<Self> {
        Ok(Self {
            http: build_http(request_timeout_ms)?,
            base: parse_base(url)?,
            session_id: session_id.into(),
            capabilities: Value::Null,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Capabilities the remote end reported when the session was created.
    pub fn capabilities(&self) -> &Value {
        &self.capabilities
    }

    pub async fn delete_session(&self) -> DriverResult<()> {
        self.execute(Method::DELETE, "", None).await?;
        info!(target: "webdriver", session = %self.session_id, "webdriver session deleted");
        Ok(())
    }

    fn endpoint(&self, command: &str) -> DriverResult<Url> {
        let path = if command.is_empty() {
            format!("session/{}", self.session_id)
        } else {
            format!("session/{}/{}", self.session_id, command)
        };
        self.base.join(&path).map_err(invalid_url)
    }

    async fn execute(&self, method: Method, command: &str, body: Option<Value>) -> DriverResult<Value> {
        let endpoint = self.endpoint(command)?;
        debug!(target: "webdriver", %method, %endpoint, "webdriver command");

        let mut request = self.http.request(method, endpoint);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(transport)?;
        decode(response).await
    }
}

#[async_trait]
impl BrowserDriver for WebDriverClient {
    async fn window_handles(&self) -> DriverResult<Vec<WindowHandle>> {
        let value = self.execute(Method::GET, "window/handles", None).await?;
        serde_json::from_value(value).map_err(|err| {
            DriverError::new(DriverErrorKind::Protocol)
                .with_hint(format!("malformed window handle list: {err}"))
        })
    }

    async fn current_window_handle(&self) -> DriverResult<WindowHandle> {
        let value = self.execute(Method::GET, "window", None).await?;
        expect_string(value, "window handle").map(WindowHandle::from)
    }

    async fn switch_to_window(&self, handle: &WindowHandle) -> DriverResult<()> {
        self.execute(
            Method::POST,
            "window",
            Some(json!({ "handle": handle.as_str() })),
        )
        .await?;
        Ok(())
    }

    async fn new_window(&self, kind: WindowKind) -> DriverResult<WindowHandle> {
        let value = self
            .execute(
                Method::POST,
                "window/new",
                Some(json!({ "type": kind.as_str() })),
            )
            .await?;
        let created: NewWindowValue = serde_json::from_value(value).map_err(|err| {
            DriverError::new(DriverErrorKind::Protocol)
                .with_hint(format!("malformed new-window payload: {err}"))
        })?;
        Ok(WindowHandle::new(created.handle))
    }

    async fn close_window(&self) -> DriverResult<()> {
        self.execute(Method::DELETE, "window", None).await?;
        Ok(())
    }

    async fn title(&self) -> DriverResult<String> {
        let value = self.execute(Method::GET, "title", None).await?;
        expect_string(value, "title")
    }

    async fn navigate(&self, url: &str) -> DriverResult<()> {
        self.execute(Method::POST, "url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }
}

fn build_http(request_timeout_ms: u64) -> DriverResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(request_timeout_ms))
        .build()
        .map_err(|err| {
            DriverError::new(DriverErrorKind::Transport)
                .with_hint(format!("failed to build http client: {err}"))
        })
}

fn parse_base(raw: &str) -> DriverResult<Url> {
    // Url::join drops the last path segment unless the base ends with '/'.
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(invalid_url)
}

fn invalid_url(err: url::ParseError) -> DriverError {
    DriverError::new(DriverErrorKind::Transport).with_hint(format!("invalid webdriver url: {err}"))
}

fn transport(err: reqwest::Error) -> DriverError {
    DriverError::new(DriverErrorKind::Transport).with_hint(err.to_string())
}

fn expect_string(value: Value, what: &str) -> DriverResult<String> {
    match value {
        Value::String(text) => Ok(text),
        other => Err(DriverError::new(DriverErrorKind::Protocol)
            .with_hint(format!("expected {what} string, got {other}"))),
    }
}

async fn decode(response: reqwest::Response) -> DriverResult<Value> {
    let status = response.status();
    let mut body: Value = response.json().await.map_err(|err| {
        DriverError::new(DriverErrorKind::Protocol)
            .with_hint(format!("non-json webdriver response (http {status}): {err}"))
    })?;
    let value = body
        .get_mut("value")
        .map(Value::take)
        .unwrap_or(Value::Null);

    let wire_error = value
        .as_object()
        .and_then(|object| object.get("error"))
        .and_then(Value::as_str)
        .is_some();
    if status.is_success() && !wire_error {
        return Ok(value);
    }

    let err = wire_to_error(status, &value);
    warn!(target: "webdriver", %status, error = %err, "webdriver command failed");
    Err(err)
}

fn wire_to_error(status: StatusCode, value: &Value) -> DriverError {
    let code = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    let message = value.get("message").and_then(Value::as_str).unwrap_or("");
    let kind = match code {
        "no such window" => DriverErrorKind::NoSuchWindow,
        "invalid session id" | "no such session" => DriverErrorKind::NoSuchSession,
        "session not created" => DriverErrorKind::SessionNotCreated,
        _ => DriverErrorKind::Command,
    };
    DriverError::new(kind).with_hint(format!("{code}: {message} (http {})", status.as_u16()))
}
