#![forbid(unsafe_code)]

//! Log output for otpbox hosts.
//!
//! The crates only emit `tracing` events and spans; nothing is printed until
//! a subscriber is installed. [`init`] installs a formatted stderr subscriber
//! filtered by the `OTPBOX_LOG` environment variable (falling back to the
//! given directive). With `logging-json`, [`init_json`] writes one JSON
//! object per line instead.
//!
//! Useful targets: `otpbox.program` (mount, teardown), `otpbox.effect`
//! (commands and subscriptions), and the `otp_box.edit` span.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable read for the filter directive.
pub const ENV_VAR: &str = "OTPBOX_LOG";

/// Build the filter from [`ENV_VAR`], or `default_directive` if unset.
#[must_use]
pub fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_env(ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install a human-readable stderr subscriber.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(default_directive: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_directive))
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .is_ok()
}

/// Install a JSON-lines stderr subscriber.
///
/// Returns `false` if a global subscriber was already installed.
#[cfg(feature = "logging-json")]
pub fn init_json(default_directive: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_directive))
        .with(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_falls_back_to_default() {
        // The variable is not set under test.
        let filter = env_filter("otpbox=debug");
        assert!(filter.to_string().contains("otpbox=debug"));
    }

    #[test]
    fn second_init_reports_existing_subscriber() {
        let _ = init("warn");
        assert!(!init("warn"));
    }
}
