//! Background task spawning with uncaught-error logging.

use tokio::task::JoinHandle;
use tracing::error;

/// Spawn `fut` as a background task, logging any `Err` it resolves to.
///
/// Run tasks outlive the request that started them; the caller holds no
/// channel back to the client, so errors surface through tracing and the
/// project's own status document.
pub fn spawn_supervised<F>(task: &'static str, fut: F) -> JoinHandle<()>
where
    F: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(err) = fut.await {
            error!(task, error = %format!("{err:#}"), "background task failed");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[tokio::test]
    async fn joins_successful_task() {
        let handle = spawn_supervised("ok", async { Ok(()) });
        handle.await.expect("join");
    }

    #[tokio::test]
    async fn failing_task_does_not_panic_the_join() {
        let handle = spawn_supervised("fails", async { Err(anyhow!("boom")) });
        handle.await.expect("join");
    }
}
