use std::sync::Once;

use metrics::{Unit, describe_counter};
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

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "gazette_reports_created_total",
            Unit::Count,
            "Total number of reports rendered and stored."
        );
        describe_counter!(
            "gazette_archive_rebuilds_total",
            Unit::Count,
            "Total number of archive index rebuilds."
        );
        describe_counter!(
            "gazette_archive_corrupt_records_total",
            Unit::Count,
            "Metadata records skipped during archive rebuilds because they could not be parsed."
        );
        describe_counter!(
            "gazette_retention_deleted_total",
            Unit::Count,
            "Generated pages deleted by retention passes."
        );
        describe_counter!(
            "gazette_topics_fallback_total",
            Unit::Count,
            "Topic generations that fell back to the static list."
        );
    });
}
