//! One end-to-end test session: a WebDriver session, the window manager
//! bound to it, and an optional emulator controller.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn, Span};
use trezor_emulator_controller::TrezorEmulatorController;
use window_manager::{WebDriverClient, WindowManager, WindowRecord};

use crate::config::HarnessConfig;
use crate::telemetry;

pub struct HarnessSession {
    config: HarnessConfig,
    webdriver: Arc<WebDriverClient>,
    windows: WindowManager,
    trezor: Option<TrezorEmulatorController>,
    span: Span,
}

impl HarnessSession {
    /// Opens the browser session, registers its first window and, when
    /// configured, connects to the emulator. A failure after the browser
    /// session exists deletes that session before returning.
    pub async fn start(config: HarnessConfig) -> Result<Self> {
        telemetry::init_tracing(&config.logging);

        let webdriver = WebDriverClient::new_session(&config.webdriver)
            .await
            .with_context(|| {
                format!("Failed to open WebDriver session at {}", config.webdriver.url)
            })?;
        let webdriver = Arc::new(webdriver);
        let span = telemetry::session_span(webdriver.session_id());

        let mut windows = WindowManager::new(webdriver.clone(), config.windows.clone());
        let main = match windows.init().await {
            Ok(record) => record,
            Err(err) => {
                discard_session(&webdriver, &span).await;
                return Err(err).context("Failed to register the initial window");
            }
        };

        let trezor = match &config.trezor {
            Some(trezor_config) => {
                let mut controller = TrezorEmulatorController::new(trezor_config.clone());
                if let Err(err) = controller.connect().await {
                    discard_session(&webdriver, &span).await;
                    return Err(err).context("Failed to connect to the Trezor emulator");
                }
                Some(controller)
            }
            None => None,
        };

        info!(
            parent: &span,
            main_window = %main.title,
            trezor = trezor.is_some(),
            "harness session started"
        );

        Ok(Self {
            config,
            webdriver,
            windows,
            trezor,
            span,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn webdriver(&self) -> &Arc<WebDriverClient> {
        &self.webdriver
    }

    pub fn windows(&self) -> &WindowManager {
        &self.windows
    }

    pub fn windows_mut(&mut self) -> &mut WindowManager {
        &mut self.windows
    }

    /// The window registered when the session started.
    pub fn main_window(&self) -> Option<WindowRecord> {
        self.windows.records().into_iter().next()
    }

    pub fn trezor_mut(&mut self) -> Result<&mut TrezorEmulatorController> {
        self.trezor
            .as_mut()
            .ok_or_else(|| anyhow!("Trezor emulator is not configured for this session"))
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Disconnects from the emulator and deletes the WebDriver session.
    /// Both steps run even when the first fails; the first error is returned.
    pub async fn shutdown(mut self) -> Result<()> {
        let trezor_result = match self.trezor.as_mut() {
            Some(controller) => controller
                .disconnect()
                .await
                .context("Failed to disconnect from the Trezor emulator"),
            None => Ok(()),
        };
        let webdriver_result = self
            .webdriver
            .delete_session()
            .await
            .context("Failed to delete the WebDriver session");

        info!(parent: &self.span, "harness session closed");
        trezor_result.and(webdriver_result)
    }
}

async fn discard_session(webdriver: &WebDriverClient, span: &Span) {
    if let Err(err) = webdriver.delete_session().await {
        warn!(parent: span, %err, "failed to delete WebDriver session during startup");
    }
}
