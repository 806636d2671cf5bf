use crate::config::TracingConfig;

#[cfg(feature = "telemetry")]
use opentelemetry::trace::TracerProvider as _;
#[cfg(feature = "telemetry")]
use opentelemetry_otlp::WithExportConfig;
#[cfg(feature = "telemetry")]
use opentelemetry_sdk::trace::TracerProvider;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to install OpenTelemetry pipeline: {0}")]
    Install(String),
}

#[cfg(feature = "telemetry")]
pub fn init_telemetry(config: &TracingConfig) -> Result<Option<TracerProvider>, TelemetryError> {
    if !config.enabled {
        return Ok(None);
    }

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(&config.otlp_endpoint);

    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(
                    config.sample_rate,
                ))
                .with_resource(opentelemetry_sdk::Resource::new(vec![
                    opentelemetry::KeyValue::new("service.name", config.service_name.clone()),
                ])),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)
        .map_err(|e| TelemetryError::Install(e.to_string()))?;

    Ok(Some(provider))
}

#[cfg(feature = "telemetry")]
pub fn make_otel_layer(
    provider: &TracerProvider,
) -> tracing_opentelemetry::OpenTelemetryLayer<
    tracing_subscriber::Registry,
    opentelemetry_sdk::trace::Tracer,
> {
    let tracer = provider.tracer("permalink-server");
    tracing_opentelemetry::layer().with_tracer(tracer)
}

#[cfg(not(feature = "telemetry"))]
pub fn init_telemetry(_config: &TracingConfig) -> Result<Option<()>, TelemetryError> {
    Ok(None)
}

/// Flushes pending spans when dropped.
#[derive(Default)]
pub struct TelemetryGuard {
    #[cfg(feature = "telemetry")]
    provider: Option<TracerProvider>,
}

impl TelemetryGuard {
    #[cfg(feature = "telemetry")]
    pub fn new(provider: Option<TracerProvider>) -> Self {
        Self { provider }
    }

    #[cfg(feature = "telemetry")]
    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    #[cfg(not(feature = "telemetry"))]
    pub fn is_enabled(&self) -> bool {
        false
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        #[cfg(feature = "telemetry")]
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("failed to shut down tracer provider: {e}");
        }
    }
}
