//! Process-wide log setup.
//!
//! `log` records from the storage and worker layers are forwarded into
//! `tracing` so both end up in the same subscriber.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Output options for [`init`].
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Filter directives; `RUST_LOG` wins when set, then this, then `info`.
    pub filter: Option<String>,
    /// One JSON object per line instead of human-readable text.
    pub json: bool,
}

fn build_filter(options: &LogOptions) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    options
        .filter
        .as_deref()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Installs the global subscriber. Returns false when one was already
/// installed, which leaves the existing one in place.
pub fn init(options: &LogOptions) -> bool {
    if tracing_log::LogTracer::init().is_err() {
        return false;
    }

    let filter = build_filter(options);
    let installed = if options.json {
        let subscriber = Registry::default().with(filter).with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE),
        );
        tracing::subscriber::set_global_default(subscriber).is_ok()
    } else {
        let subscriber = Registry::default()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false));
        tracing::subscriber::set_global_default(subscriber).is_ok()
    };

    if installed {
        log::debug!("Logging initialised (json: {})", options.json);
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_filter_falls_back_to_info() {
        std::env::remove_var("RUST_LOG");
        let filter = build_filter(&LogOptions::default());
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    #[serial]
    fn test_filter_from_options() {
        std::env::remove_var("RUST_LOG");
        let filter = build_filter(&LogOptions {
            filter: Some("dtecflex=debug".to_string()),
            json: false,
        });
        assert_eq!(filter.to_string(), "dtecflex=debug");
    }

    #[test]
    #[serial]
    fn test_second_init_is_harmless() {
        let options = LogOptions::default();
        init(&options);
        assert!(!init(&options));
    }
}
