use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::poll::PollPolicy;

pub const MAIN_WINDOW_TITLE: &str = "main";
pub const EXTENSION_WINDOW_TITLE: &str = "Yoroi";
pub const MOCK_DAPP_TITLE: &str = "MockDApp";
pub const POPUP_CONNECTOR_TITLE: &str = "popupConnectorWindow";

/// Timing and naming knobs for [`WindowManager`](crate::WindowManager).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WindowManagerConfig {
    /// Upper bound for title and new-window waits.
    pub wait_timeout_ms: u64,
    /// Sleep between page-title probes.
    pub repeat_period_ms: u64,
    /// Sleep between handle-list probes while waiting for a new window.
    pub new_window_poll_ms: u64,
    pub close_retries: u32,
    pub close_poll_ms: u64,
    /// Page titles kept verbatim when the initial window is registered.
    pub well_known_titles: Vec<String>,
    /// Name given to the initial window when its title is not well known.
    pub fallback_title: String,
}

impl Default for WindowManagerConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: 10_000,
            repeat_period_ms: 500,
            new_window_poll_ms: 1_000,
            close_retries: 10,
            close_poll_ms: 500,
            well_known_titles: vec![
                EXTENSION_WINDOW_TITLE.into(),
                MOCK_DAPP_TITLE.into(),
                POPUP_CONNECTOR_TITLE.into(),
            ],
            fallback_title: MAIN_WINDOW_TITLE.into(),
        }
    }
}

impl WindowManagerConfig {
    pub fn title_wait(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.wait_timeout_ms),
            Duration::from_millis(self.repeat_period_ms),
        )
    }

    pub fn new_window_wait(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.wait_timeout_ms),
            Duration::from_millis(self.new_window_poll_ms),
        )
    }

    pub fn close_wait(&self) -> PollPolicy {
        PollPolicy::from_retries(self.close_retries, Duration::from_millis(self.close_poll_ms))
    }

    /// Maps a raw page title onto the logical name used for registration.
    pub fn classify_title(&self, page_title: &str) -> String {
        if self.well_known_titles.iter().any(|known| known == page_title) {
            page_title.to_string()
        } else {
            self.fallback_title.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_exact_match() {
        let config = WindowManagerConfig::default();
        assert_eq!(config.classify_title("Yoroi"), "Yoroi");
        assert_eq!(config.classify_title("MockDApp"), "MockDApp");
        assert_eq!(config.classify_title("yoroi"), MAIN_WINDOW_TITLE);
        assert_eq!(config.classify_title("Yoroi - Dashboard"), MAIN_WINDOW_TITLE);
        assert_eq!(config.classify_title(""), MAIN_WINDOW_TITLE);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: WindowManagerConfig =
            serde_json::from_value(serde_json::json!({ "close_retries": 3 })).unwrap();
        assert_eq!(config.close_retries, 3);
        assert_eq!(config.wait_timeout_ms, 10_000);
        assert_eq!(config.fallback_title, MAIN_WINDOW_TITLE);
        assert_eq!(config.close_wait().timeout, Duration::from_millis(1_500));
    }
}
