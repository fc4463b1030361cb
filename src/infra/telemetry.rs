use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Registers metric descriptions with whichever recorder is installed.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "oracle_artifact_view_hit_total",
            Unit::Count,
            "Materialized artifact views served from cache."
        );
        describe_counter!(
            "oracle_artifact_view_miss_total",
            Unit::Count,
            "Materialized artifact view lookups that fell through to the store."
        );
        describe_counter!(
            "oracle_artifact_view_backend_error_total",
            Unit::Count,
            "View cache backend failures treated as misses."
        );
        describe_histogram!(
            "oracle_artifact_resolve_ms",
            Unit::Milliseconds,
            "Reference resolution latency in milliseconds."
        );
        describe_histogram!(
            "oracle_cache_invalidate_ms",
            Unit::Milliseconds,
            "Artifact view invalidation latency in milliseconds."
        );
    });
}
