use anyhow::Result;
use event_display::{display, Config, Receiver, Telemetry};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    // Held for the whole run: dropping it flushes the tracer and the log file.
    let telemetry = Telemetry::init(&config)?;

    if config.request_logging_enabled {
        warn!("Request logging enabled, request logging is not recommended for production since it might log sensitive information");
    }

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let receiver = Receiver::new(&config);
    if let Err(err) = receiver.start(cancel, display).await {
        error!("{}", err);
        return Err(err.into());
    }

    info!("Receiver stopped");
    telemetry.shutdown();
    Ok(())
}

// Cancels on SIGINT or SIGTERM.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(err) => {
                warn!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down");
    cancel.cancel();
}
