use std::net::{Ipv4Addr, SocketAddr};

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderMap, Method, StatusCode, Uri},
    middleware::from_fn,
    response::{IntoResponse, Response},
    Router,
};
use bytes::Bytes;
use opentelemetry::{global, propagation::Extractor, trace::TraceContextExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tracing::{field, info, instrument, warn, Span};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::{healthz, log_request, AppError, Config, Event};

/// HTTP endpoint that decodes CloudEvents and hands them to a handler.
#[derive(Debug, Clone)]
pub struct Receiver {
    addr: SocketAddr,
    request_logging: bool,
}

impl Receiver {
    pub fn new(config: &Config) -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port)),
            request_logging: config.request_logging_enabled,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Every path is served by `handler`, behind
    /// healthz → request logging (when enabled). Bodies are not size-capped.
    pub fn router<H>(&self, handler: H) -> Router
    where
        H: Fn(&Event) + Clone + Send + Sync + 'static,
    {
        let middleware = ServiceBuilder::new()
            .layer(from_fn(healthz))
            .option_layer(self.request_logging.then(|| from_fn(log_request)));

        Router::new()
            .fallback(move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
                let handler = handler.clone();
                async move { receive(method, uri, headers, body, handler).await }
            })
            .layer(DefaultBodyLimit::disable())
            .layer(middleware)
    }

    /// Binds the configured address and serves until `cancel` fires.
    pub async fn start<H>(&self, cancel: CancellationToken, handler: H) -> Result<(), AppError>
    where
        H: Fn(&Event) + Clone + Send + Sync + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve(listener, cancel, handler).await
    }

    pub async fn serve<H>(
        &self,
        listener: TcpListener,
        cancel: CancellationToken,
        handler: H,
    ) -> Result<(), AppError>
    where
        H: Fn(&Event) + Clone + Send + Sync + 'static,
    {
        info!("Listening on {}", listener.local_addr()?);
        let app = self.router(handler);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
        Ok(())
    }
}

#[instrument(
    skip_all,
    fields(
        http.method = %method,
        http.uri = %uri,
        cloudevents.event_id = field::Empty,
        cloudevents.event_type = field::Empty,
    )
)]
async fn receive<H>(
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    handler: H,
) -> Response
where
    H: Fn(&Event),
{
    if let Some(ctx) = extract_remote_context(&headers) {
        Span::current().set_parent(ctx);
    }
    if method != Method::POST {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    match Event::from_http(&headers, body) {
        Ok(event) => {
            let span = Span::current();
            span.record("cloudevents.event_id", event.id());
            span.record("cloudevents.event_type", event.ty());
            handler(&event);
            StatusCode::OK.into_response()
        }
        Err(err) => {
            warn!(http.status_code = err.status().as_u16(), "rejected event: {}", err);
            err.into_response()
        }
    }
}

// ---- Distributed trace context extraction helpers ----
struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }
    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

// Some(ctx) only when the headers carry a valid remote span context.
fn extract_remote_context(headers: &HeaderMap) -> Option<opentelemetry::Context> {
    if headers.is_empty() {
        return None;
    }
    let carrier = HeaderExtractor(headers);
    let ctx = global::get_text_map_propagator(|prop| prop.extract(&carrier));
    if ctx.span().span_context().is_valid() {
        Some(ctx)
    } else {
        None
    }
}
