use once_cell::sync::OnceCell;
use tracing::{span, Level, Span};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::config::LoggingConfig;

static INIT: OnceCell<()> = OnceCell::new();

/// Installs the global subscriber. Only the first call has any effect;
/// `RUST_LOG` wins over the configured level.
pub fn init_tracing(config: &LoggingConfig) {
    INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
        let registry = Registry::default().with(filter);
        let _ = if config.json {
            tracing::subscriber::set_global_default(
                registry.with(fmt::layer().json().with_current_span(true)),
            )
        } else {
            tracing::subscriber::set_global_default(
                registry.with(fmt::layer().with_ansi(config.ansi).with_target(true)),
            )
        };
    });
}

pub fn session_span(session_id: &str) -> Span {
    span!(Level::INFO, "harness_session", session = %session_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let config = LoggingConfig::default();
        init_tracing(&config);
        init_tracing(&LoggingConfig {
            json: true,
            ..config
        });
        let span = session_span("unit-test");
        span.in_scope(|| tracing::info!("within span"));
    }
}
