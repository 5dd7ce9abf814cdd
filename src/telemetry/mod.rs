//! Process log sink and tracer lifecycle.
//!
//! Layers on the global subscriber:
//! - console: stdout
//! - file: `LOG_FILE_PATH`, appended to through a non-blocking writer
//!
//! Both sinks use [`RecordFormat`], so each line is the bare record.
//! - opentelemetry: only when a tracing backend is configured
//!
//! [`Telemetry`] owns both background resources. Dropping it shuts the
//! tracer down first, then flushes the file writer.

mod config;
mod format;
mod tracer;

use std::fs::OpenOptions;

use tracing::{error, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use config::{Backend, OtlpProtocol, TracingConfig};
pub use format::RecordFormat;
pub use tracer::TracerGuard;

use crate::{AppError, Config};

pub struct Telemetry {
    // field order is drop order
    tracer: TracerGuard,
    _file_guard: WorkerGuard,
}

impl Telemetry {
    /// Opens the log file, builds the tracer and installs the global
    /// subscriber. Any error returned here is fatal.
    pub fn init(config: &Config) -> Result<Self, AppError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file_path)
            .map_err(|source| AppError::LogFile {
                path: config.log_file_path.clone(),
                source,
            })?;
        let (file_writer, file_guard) = tracing_appender::non_blocking(file);

        let tracing_config = TracingConfig::from_json(&config.tracing_config);
        let tracer = match &tracing_config {
            Ok(tracing_config) => TracerGuard::new(tracing_config),
            Err(_) => Ok(TracerGuard::noop()),
        };
        let otel = tracer
            .as_ref()
            .ok()
            .and_then(TracerGuard::tracer)
            .map(|t| tracing_opentelemetry::layer().with_tracer(t));

        let console = fmt::layer().event_format(RecordFormat);
        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .event_format(RecordFormat);
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .with(file_layer)
            .with(otel)
            .try_init()?;

        if let Err(err) = tracing_config {
            warn!("Failed to read tracing config, using the no-op default: {}", err);
        }
        let tracer = tracer.inspect_err(|err| error!("{}", err))?;

        Ok(Self {
            tracer,
            _file_guard: file_guard,
        })
    }

    pub fn tracer(&self) -> &TracerGuard {
        &self.tracer
    }

    /// Flushes the tracer now rather than at drop.
    pub fn shutdown(mut self) {
        self.tracer.shutdown();
    }
}
