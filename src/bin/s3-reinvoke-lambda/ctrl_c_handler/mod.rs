use s3_reinvoke_lambda::PipelineCancellationToken;
use tokio::task::JoinHandle;
use tokio::{select, signal};
use tracing::{debug, warn};

/// Cancel the pipeline on Ctrl-C, or on SIGTERM on unix.
///
/// The task ends on its own once the token is cancelled elsewhere.
pub fn spawn_ctrl_c_handler(cancellation_token: PipelineCancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        select! {
            _ = cancellation_token.cancelled() => {
                debug!("cancellation_token canceled.")
            }
            _ = signal::ctrl_c() => {
                warn!("ctrl-c received, stopping new invocations.");
                cancellation_token.cancel();
            }
            _ = terminate() => {
                warn!("SIGTERM received, stopping new invocations.");
                cancellation_token.cancel();
            }
        }
    })
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            debug!(error = e.to_string(), "SIGTERM handler unavailable.");
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await
}

#[cfg(test)]
mod tests {
    use super::*;

    use once_cell::sync::Lazy;
    use s3_reinvoke_lambda::create_pipeline_cancellation_token;
    use std::sync::Arc;
    use tokio::sync::Semaphore;

    static SEMAPHORE: Lazy<Arc<Semaphore>> = Lazy::new(|| Arc::new(Semaphore::new(1)));

    #[tokio::test]
    async fn handler_exits_when_token_is_cancelled() {
        let _semaphore = SEMAPHORE.clone().acquire_owned().await.unwrap();

        let cancellation_token = create_pipeline_cancellation_token();

        let join_handle = spawn_ctrl_c_handler(cancellation_token.clone());
        cancellation_token.cancel();

        tokio::time::timeout(std::time::Duration::from_secs(5), join_handle)
            .await
            .unwrap()
            .unwrap();

        assert!(cancellation_token.is_cancelled());
    }

    #[tokio::test]
    async fn handler_keeps_running_until_signalled() {
        let _semaphore = SEMAPHORE.clone().acquire_owned().await.unwrap();

        let cancellation_token = create_pipeline_cancellation_token();
        let join_handle = spawn_ctrl_c_handler(cancellation_token.clone());

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!join_handle.is_finished());
        assert!(!cancellation_token.is_cancelled());

        cancellation_token.cancel();
        join_handle.await.unwrap();
    }
}
