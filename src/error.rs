use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Why an inbound request could not be turned into an [`Event`](crate::Event).
#[derive(Error, Debug)]
pub enum EventError {
    #[error("unknown event encoding: expected a ce-specversion header or a structured content type")]
    UnknownEncoding,
    #[error("batch mode is not supported")]
    BatchUnsupported,
    #[error("unsupported specversion: {0}")]
    UnsupportedSpecVersion(String),
    #[error("missing required attribute: {0}")]
    MissingAttribute(&'static str),
    #[error("invalid attribute {name}: {reason}")]
    InvalidAttribute { name: String, reason: String },
    #[error("malformed event json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl EventError {
    pub(crate) fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BatchUnsupported => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for EventError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

#[derive(Error, Debug)]
pub enum TracingConfigError {
    #[error("empty json tracing config")]
    Empty,
    #[error("failed to parse json tracing config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported tracing backend: {0}")]
    UnknownBackend(String),
    #[error("otlp backend requires otlp-endpoint")]
    MissingEndpoint,
    #[error("unsupported otlp protocol: {0}")]
    UnknownProtocol(String),
    #[error("invalid {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("sample-rate {0} must be within [0, 1]")]
    SampleRateOutOfRange(f64),
}

/// Errors that end the process.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid {key}: {value}")]
    Config { key: &'static str, value: String },
    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to initialize tracing: {0}")]
    Tracer(String),
    #[error("failed to install log subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
    #[error("error during receiver's runtime: {0}")]
    Serve(#[from] std::io::Error),
}
