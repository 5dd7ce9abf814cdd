mod config;
mod display;
mod error;
mod event;
mod middleware;
mod receiver;
mod telemetry;

pub use config::{parse_bool, Config};
pub use display::{display, render};
pub use error::{AppError, EventError, TracingConfigError};
pub use event::{Event, EventBuilder, ExtensionValue, SpecVersion};
pub use middleware::{healthz, log_request, RequestSnapshot, HEALTHZ_PATH};
pub use receiver::Receiver;
pub use telemetry::{
    Backend, OtlpProtocol, RecordFormat, Telemetry, TracerGuard, TracingConfig,
};
