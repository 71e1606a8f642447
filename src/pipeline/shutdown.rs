use log::error;
use tokio::signal::unix::{signal, SignalKind};

/// Resolves once SIGINT or SIGTERM arrives.
///
/// The caller runs the final flush after this returns and only then lets
/// the process exit, so every graceful exit path converges on the same
/// cleanup.
pub async fn wait_for_signal() {
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        error!("Unable to wait for SIGINT: {}", e);
                    }
                }
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            error!("Unable to install SIGTERM handler: {}", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Unable to wait for SIGINT: {}", e);
            }
        }
    }
}
