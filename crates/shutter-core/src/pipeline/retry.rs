//! Which remote failures get another attempt, and how long to wait first.

use crate::error::PipelineError;
use std::time::Duration;

/// Longest single wait between two metadata requests.
const MAX_BACKOFF_MS: u64 = 30_000;

/// A failure is transient when the service was never reached, did not answer
/// in time, or answered with 429 / 5xx. Any other answer (404, 403 on a bad
/// signature, malformed body) repeats identically and is returned at once.
pub fn is_retryable(error: &PipelineError) -> bool {
    match error {
        PipelineError::Timeout { .. } | PipelineError::Unreachable { .. } => true,
        PipelineError::Remote {
            status_code: Some(code),
            ..
        } => *code == 429 || (500..600).contains(code),
        _ => false,
    }
}

/// Wait before retry number `retry` (zero-based): the base delay doubled per
/// retry, never more than [`MAX_BACKOFF_MS`].
pub fn backoff_duration(retry: u32, base_delay_ms: u64) -> Duration {
    let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
    Duration::from_millis(base_delay_ms.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn status(code: u16) -> PipelineError {
        PipelineError::Remote {
            message: format!("HTTP {code}"),
            status_code: Some(code),
        }
    }

    #[test]
    fn test_transport_failures_are_retried() {
        let timeout = PipelineError::Timeout {
            path: PathBuf::from("a.jpg"),
            stage: "remote".to_string(),
            timeout_ms: 10_000,
        };
        let unreachable = PipelineError::Unreachable {
            url: "http://127.0.0.1:1/unsafe/meta/a.jpg".to_string(),
            message: "error sending request for url".to_string(),
        };
        assert!(is_retryable(&timeout));
        assert!(is_retryable(&unreachable));
    }

    #[test]
    fn test_status_classification() {
        assert!(is_retryable(&status(429)));
        assert!(is_retryable(&status(500)));
        assert!(is_retryable(&status(503)));
        assert!(!is_retryable(&status(400)));
        assert!(!is_retryable(&status(403)));
        assert!(!is_retryable(&status(404)));
    }

    #[test]
    fn test_statusless_remote_error_is_final() {
        // A body that does not parse is not going to parse next time either,
        // whatever its message says
        let err = PipelineError::Remote {
            message: "Invalid metadata response: could not connect fields".to_string(),
            status_code: None,
        };
        assert!(!is_retryable(&err));
    }

    #[test]
    fn test_local_errors_are_final() {
        let err = PipelineError::Extraction {
            path: PathBuf::from("a.jpg"),
            message: "invalid header".to_string(),
        };
        assert!(!is_retryable(&err));
        assert!(!is_retryable(&PipelineError::Cancelled));
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_duration(0, 250), Duration::from_millis(250));
        assert_eq!(backoff_duration(1, 250), Duration::from_millis(500));
        assert_eq!(backoff_duration(3, 250), Duration::from_millis(2000));
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(backoff_duration(10, 1000), Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(backoff_duration(80, 1000), Duration::from_millis(MAX_BACKOFF_MS));
    }
}
