//! Runs blocking model calls on the blocking pool under a deadline.

use std::time::{Duration, Instant};

use crate::error::{Error, Result, Stage};

/// Run `work` on the blocking pool and give up after `limit`.
///
/// A backend error becomes [`Error::ExternalService`] for `stage`, an expired
/// deadline becomes [`Error::Timeout`]. The abandoned call is left to finish
/// on its own thread; its result is dropped.
pub async fn run_bounded<T, F>(stage: Stage, limit: Duration, work: F) -> Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let started = Instant::now();
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(work)).await {
        Err(_) => {
            tracing::warn!(%stage, limit_ms = limit.as_millis() as u64, "call timed out");
            Err(Error::Timeout { stage, elapsed: started.elapsed() })
        }
        Ok(Err(join_err)) => Err(Error::external(stage, join_err)),
        Ok(Ok(Err(e))) => Err(Error::external(stage, format!("{e:#}"))),
        Ok(Ok(Ok(value))) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_value_within_deadline() {
        let v = run_bounded(Stage::Embedding, Duration::from_secs(5), || Ok(41 + 1)).await.unwrap();
        assert_eq!(v, 42);
    }

    #[tokio::test]
    async fn slow_call_times_out() {
        let err = run_bounded(Stage::Reranking, Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(300));
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Timeout { stage: Stage::Reranking, .. }));
    }

    #[tokio::test]
    async fn backend_error_is_external_failure() {
        let err = run_bounded::<(), _>(Stage::Embedding, Duration::from_secs(5), || Err(anyhow::anyhow!("model unreachable")))
            .await
            .unwrap_err();
        match err {
            Error::ExternalService { stage, message } => {
                assert_eq!(stage, Stage::Embedding);
                assert!(message.contains("model unreachable"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
