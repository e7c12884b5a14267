use std::future::Future;
use std::time::Duration;

use lumi_core::error::{Error, Result, Stage};

const BASE_BACKOFF_SECS: u64 = 1;
/// Upper bound on any single wait, whatever the server asks for.
const MAX_DELAY_SECS: u64 = 60;

/// `Retry-After` in seconds when present, else exponential backoff; capped.
pub(crate) fn retry_delay(retry_after: Option<&str>, attempt: u32) -> Duration {
    let secs = retry_after
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(BASE_BACKOFF_SECS << attempt.min(6));
    Duration::from_secs(secs.min(MAX_DELAY_SECS))
}

fn retry_after(response: &reqwest::Response) -> Option<&str> {
    response.headers().get(reqwest::header::RETRY_AFTER).and_then(|v| v.to_str().ok())
}

/// Send a request, retrying up to `max_retries` times on 429 responses.
///
/// Transport errors are returned at once: a timeout as [`Error::Timeout`],
/// anything else as [`Error::ExternalService`].
pub(crate) async fn send_with_retry<F, Fut>(max_retries: u32, request_timeout: Duration, mut f: F) -> Result<reqwest::Response>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..=max_retries {
        let response = f().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout { stage: Stage::Generation, elapsed: request_timeout }
            } else {
                Error::external(Stage::Generation, e)
            }
        })?;
        if response.status() != reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Ok(response);
        }
        if attempt == max_retries {
            break;
        }
        let delay = retry_delay(retry_after(&response), attempt);
        tracing::warn!(attempt = attempt + 1, max_retries, delay_secs = delay.as_secs(), "rate limited, retrying");
        tokio::time::sleep(delay).await;
    }
    Err(Error::external(Stage::Generation, format!("rate limited after {max_retries} retries")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_hint_is_honoured_up_to_the_cap() {
        assert_eq!(retry_delay(Some("2"), 0), Duration::from_secs(2));
        assert_eq!(retry_delay(Some(" 0 "), 3), Duration::ZERO);
        assert_eq!(retry_delay(Some("3600"), 0), Duration::from_secs(MAX_DELAY_SECS));
    }

    #[test]
    fn missing_or_unparsable_hint_backs_off_exponentially() {
        assert_eq!(retry_delay(None, 0), Duration::from_secs(1));
        assert_eq!(retry_delay(None, 2), Duration::from_secs(4));
        assert_eq!(retry_delay(Some("Wed, 21 Oct 2015 07:28:00 GMT"), 1), Duration::from_secs(2));
        assert_eq!(retry_delay(None, 30), Duration::from_secs(MAX_DELAY_SECS));
    }
}
