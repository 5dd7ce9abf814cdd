use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    trace::{Sampler, SdkTracer, SdkTracerProvider},
    Resource,
};
use tracing::warn;

use super::{Backend, OtlpProtocol, TracingConfig};
use crate::AppError;

const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");

/// Owns the tracer provider and flushes it exactly once, on
/// [`shutdown`](Self::shutdown) or on drop, whichever comes first.
#[derive(Debug, Default)]
pub struct TracerGuard {
    provider: Option<SdkTracerProvider>,
}

impl TracerGuard {
    /// Builds the provider described by `config`. A `none` backend yields a
    /// guard with nothing to export.
    pub fn new(config: &TracingConfig) -> Result<Self, AppError> {
        // W3C traceparent/tracestate on inbound requests.
        global::set_text_map_propagator(TraceContextPropagator::new());

        let provider = match config.backend {
            Backend::None => return Ok(Self::noop()),
            Backend::Otlp => build_provider(config)?,
        };
        // Makes it discoverable by tracing-opentelemetry.
        global::set_tracer_provider(provider.clone());
        Ok(Self {
            provider: Some(provider),
        })
    }

    pub fn noop() -> Self {
        Self { provider: None }
    }

    pub fn is_noop(&self) -> bool {
        self.provider.is_none()
    }

    pub fn tracer(&self) -> Option<SdkTracer> {
        self.provider.as_ref().map(|p| p.tracer(SERVICE_NAME))
    }

    pub fn shutdown(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(err) = provider.shutdown() {
                warn!("failed to shut down tracer: {}", err);
            }
        }
    }
}

impl Drop for TracerGuard {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn build_provider(config: &TracingConfig) -> Result<SdkTracerProvider, AppError> {
    let endpoint = config
        .endpoint
        .clone()
        .ok_or_else(|| AppError::Tracer("otlp backend requires an endpoint".into()))?;

    let resource = Resource::builder()
        .with_attribute(KeyValue::new("service.name", SERVICE_NAME))
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .build();

    let sampler = if config.debug {
        Sampler::AlwaysOn
    } else {
        Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(config.sample_rate)))
    };

    let exporter = match config.protocol {
        OtlpProtocol::HttpProtobuf => {
            let endpoint = if endpoint.ends_with("/v1/traces") {
                endpoint
            } else {
                format!("{}/v1/traces", endpoint.trim_end_matches('/'))
            };
            opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .with_endpoint(endpoint)
                .build()
        }
        OtlpProtocol::Grpc => opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build(),
    }
    .map_err(|e| AppError::Tracer(e.to_string()))?;

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(sampler)
        .with_batch_exporter(exporter)
        .build())
}
