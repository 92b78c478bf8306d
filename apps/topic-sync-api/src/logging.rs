//! Log output for the sync service.
//!
//! Every line is a JSON object. Events emitted inside a sync run carry the
//! fields of the run span (`run_id`, `reference`, `reference_id`), so one
//! run can be followed with a single filter on `run_id`.

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Failure to install the log subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {source}")]
    Filter {
        filter: String,
        #[source]
        source: ParseError,
    },

    #[error("log subscriber already installed: {0}")]
    Init(#[from] TryInitError),
}

/// Parse a filter directive such as `info,topic_sync=debug`.
///
/// The directive comes from configuration, which already resolved `RUST_LOG`.
pub fn build_filter(filter: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(filter).map_err(|source| LoggingError::Filter {
        filter: filter.to_string(),
        source,
    })
}

/// Install the JSON subscriber for the process.
pub fn init_logging(filter: &str) -> Result<(), LoggingError> {
    let filter_layer = build_filter(filter)?;

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_target(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(json_layer)
        .with(filter_layer)
        .try_init()?;

    tracing::info!(filter, "Logging initialized");
    Ok(())
}

/// Plain test output; a second call is a no-op.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}
