use std::future::Future;
use std::time::Duration;

/// Runs `op` up to `attempts` times with a fixed delay between attempts.
/// The last error is returned once every attempt has failed.
pub async fn with_retries<T, E, F, Fut>(
    attempts: usize,
    delay: Duration,
    stage: &str,
    mut op: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}, retrying in {:?}",
                    stage,
                    attempt,
                    attempts,
                    e,
                    delay
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                tracing::warn!("{} failed (attempt {}/{}): {}", stage, attempt, attempts, e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> = with_retries(3, Duration::from_millis(1), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_on_third_attempt() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> = with_retries(3, Duration::from_millis(1), "op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(format!("transient {}", n))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_and_returns_last_error() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> = with_retries(2, Duration::from_millis(1), "op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("boom {}", n)) }
        })
        .await;
        assert_eq!(result.unwrap_err(), "boom 1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> = with_retries(0, Duration::from_millis(1), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(1) }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
