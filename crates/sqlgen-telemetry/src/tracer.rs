//! Subscriber installation and the process-wide tracer provider

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::{SimpleSpanProcessor, TracerProvider};
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_LOG_FILTER: &str = "info,sqlx=warn";

static TRACER_PROVIDER: OnceLock<Arc<TracerProvider>> = OnceLock::new();

/// Builds one span processor at initialization time
pub type ProcessorBuilder = Box<dyn FnOnce() -> SimpleSpanProcessor + Send>;

// `None` once telemetry is initialized
static PENDING_PROCESSORS: Mutex<Option<Vec<ProcessorBuilder>>> = Mutex::new(Some(Vec::new()));

/// Options for [`init_telemetry_with`]
#[derive(Debug, Clone, Default)]
pub struct TelemetryOptions {
    /// Tracer name; defaults to [`crate::attributes::SYSTEM_NAME`]
    pub service_name: Option<String>,
    /// JSON log lines instead of human-readable text
    pub json_logs: bool,
}

/// Queue a span processor (an exporter wrapper) for the tracer provider.
///
/// Only processors registered before initialization are installed; later
/// registrations are dropped with a warning.
///
/// ```ignore
/// use opentelemetry_sdk::trace::SimpleSpanProcessor;
///
/// sqlgen_telemetry::register_span_processor(Box::new(|| {
///     SimpleSpanProcessor::new(Box::new(exporter))
/// }));
/// sqlgen_telemetry::init_telemetry();
/// ```
pub fn register_span_processor(builder: ProcessorBuilder) {
    let mut pending = PENDING_PROCESSORS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    match pending.as_mut() {
        Some(builders) => builders.push(builder),
        None => tracing::warn!("Span processor registered after telemetry initialization; ignored"),
    }
}

/// Initialize telemetry with default options.
///
/// ```rust,no_run
/// sqlgen_telemetry::init_telemetry();
/// ```
pub fn init_telemetry() {
    init_telemetry_with(TelemetryOptions::default());
}

/// Install the global subscriber: `RUST_LOG` filter, log output and an
/// OpenTelemetry layer feeding the registered span processors.
///
/// Only the first call installs anything.
pub fn init_telemetry_with(options: TelemetryOptions) {
    let builders = PENDING_PROCESSORS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
    let Some(builders) = builders else {
        tracing::debug!("Telemetry already initialized");
        return;
    };

    let provider = builders
        .into_iter()
        .fold(TracerProvider::builder(), |provider, build| {
            provider.with_span_processor(build())
        })
        .build();
    let tracer = provider.tracer(
        options
            .service_name
            .unwrap_or_else(|| crate::attributes::SYSTEM_NAME.to_string()),
    );
    let _ = TRACER_PROVIDER.set(Arc::new(provider));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let installed = tracing_subscriber::registry()
        .with(log_layer(options.json_logs))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(filter)
        .try_init();

    if installed.is_err() {
        tracing::debug!("Another tracing subscriber is already installed");
    }
}

fn log_layer(json: bool) -> Box<dyn Layer<Registry> + Send + Sync> {
    if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .compact()
            .boxed()
    }
}

/// The tracer provider, once telemetry is initialized
pub fn tracer_provider() -> Option<Arc<TracerProvider>> {
    TRACER_PROVIDER.get().cloned()
}
