use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Per-statement sqlx logging is only interesting when asked for explicitly.
const QUIET_DIRECTIVES: &[&str] = &["sqlx::query=warn", "hyper=info"];

/// Install the global subscriber: env filter, span traces for errors, and a
/// compact or JSON formatter.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(build_filter(logging))
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("tracing subscriber already set: {err}")))
}

/// `RUST_LOG` wins over the configured level; quiet directives apply only
/// to targets it does not mention.
fn build_filter(logging: &LoggingSettings) -> EnvFilter {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    let mut filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .parse_lossy(&from_env);
    for directive in QUIET_DIRECTIVES {
        let target = directive.split('=').next().unwrap_or_default();
        if from_env.contains(target) {
            continue;
        }
        if let Ok(parsed) = directive.parse() {
            filter = filter.add_directive(parsed);
        }
    }
    filter
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "agora_cache_hit_total",
            Unit::Count,
            "Read-through lookups served from the cache, by key family."
        );
        describe_counter!(
            "agora_cache_miss_total",
            Unit::Count,
            "Read-through lookups that fell back to the store, by key family."
        );
        describe_counter!(
            "agora_cache_invalidate_total",
            Unit::Count,
            "Cache keys deleted after a mutation, by key family."
        );
        describe_counter!(
            "agora_cache_patch_total",
            Unit::Count,
            "Cached details patched in place after a like or view."
        );
        describe_counter!(
            "agora_cache_evict_total",
            Unit::Count,
            "Cache entries evicted due to capacity."
        );
        describe_counter!(
            "agora_cache_error_total",
            Unit::Count,
            "Cache operations that failed and were skipped, by operation."
        );
        describe_counter!(
            "agora_realtime_publish_total",
            Unit::Count,
            "Events published on the realtime channel, by event name."
        );
        describe_gauge!(
            "agora_realtime_rooms",
            Unit::Count,
            "Realtime rooms with at least one subscriber."
        );
        describe_histogram!(
            "agora_http_request_ms",
            Unit::Milliseconds,
            "HTTP request latency in milliseconds."
        );
    });
}
