//! Tracing subscriber initialization with structured logging and optional
//! OpenTelemetry trace export.
//!
//! ```no_run
//! use sitepilot_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};
//!
//! init_tracing(&TracingOptions::default()).unwrap();
//! // ...
//! shutdown_tracing();
//! ```

use std::sync::OnceLock;

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::genai_attrs::{GEN_AI_PROVIDER_NAME, PROVIDER_ANTHROPIC};

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct TracingOptions {
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
    /// Emit one JSON object per event instead of human-readable lines.
    pub json: bool,
    /// Bridge spans to OpenTelemetry with a stdout exporter.
    pub otel: bool,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            json: false,
            otel: false,
        }
    }
}

impl TracingOptions {
    /// Default filter for a CLI verbosity level: quiet, normal, `-v`, `-vv`.
    pub fn filter_for_verbosity(quiet: bool, verbose: u8) -> &'static str {
        match (quiet, verbose) {
            (true, _) => "error",
            (false, 0) => "warn,sitepilot=info",
            (false, 1) => "info,sitepilot=debug",
            (false, _) => "debug,sitepilot=trace",
        }
    }
}

fn otel_resource() -> Resource {
    Resource::builder()
        .with_service_name("sitepilot")
        .with_attribute(KeyValue::new(GEN_AI_PROVIDER_NAME, PROVIDER_ANTHROPIC))
        .build()
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `options.default_filter`.
///
/// # Errors
///
/// Fails if a global subscriber has already been installed.
pub fn init_tracing(options: &TracingOptions) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.default_filter))?;

    let text_layer = (!options.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
    });
    let json_layer = options.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
    });

    let otel_layer = options.otel.then(|| {
        let provider = SdkTracerProvider::builder()
            .with_resource(otel_resource())
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("sitepilot");

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Flush pending spans and shut down the OpenTelemetry provider.
///
/// A no-op when OTel was not enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_for_verbosity() {
        assert_eq!(TracingOptions::filter_for_verbosity(true, 2), "error");
        assert_eq!(TracingOptions::filter_for_verbosity(false, 0), "warn,sitepilot=info");
        assert_eq!(TracingOptions::filter_for_verbosity(false, 1), "info,sitepilot=debug");
        assert_eq!(TracingOptions::filter_for_verbosity(false, 5), "debug,sitepilot=trace");
    }

    #[test]
    fn test_default_filters_parse() {
        for verbose in 0..3 {
            let filter = TracingOptions::filter_for_verbosity(false, verbose);
            assert!(EnvFilter::try_new(filter).is_ok(), "{filter}");
        }
    }

    #[test]
    fn test_shutdown_without_otel_is_noop() {
        shutdown_tracing();
    }
}
