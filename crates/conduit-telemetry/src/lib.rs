//! Logging setup for Conduit
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and a `fmt`
//! layer in the configured format.

use conduit_config::{LogFormat, TelemetryConfig};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither the caller nor the configuration sets one
const DEFAULT_FILTER: &str = "info";

/// Initialize logging
///
/// The filter is `log_filter` if given, else `[telemetry] filter`, else
/// `info`. An unparsable filter falls back to `info`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init(config: Option<&TelemetryConfig>, log_filter: Option<&str>) -> anyhow::Result<()> {
    let directive = filter_directive(config, log_filter);
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let format = config.map(|c| c.format).unwrap_or_default();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(format))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    tracing::debug!(filter = %directive, ?format, "logging initialized");
    Ok(())
}

fn filter_directive<'a>(config: Option<&'a TelemetryConfig>, log_filter: Option<&'a str>) -> &'a str {
    log_filter
        .or_else(|| config.and_then(|c| c.filter.as_deref()))
        .unwrap_or(DEFAULT_FILTER)
}

fn fmt_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}
