//! Mapping of remote-store errors onto the status vocabulary.

use remote_store::{ErrorCode, RemoteError};
use tracing::{error, warn};

use crate::status::{Fatal, Status};

/// What a failed remote call means to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    MissingBucket,
    MissingObject,
    Other,
}

impl Failure {
    pub fn of(err: &RemoteError) -> Self {
        match &err.code {
            ErrorCode::NoSuchBucket => Failure::MissingBucket,
            code if code.is_missing_object() => Failure::MissingObject,
            _ => Failure::Other,
        }
    }
}

/// Status for a failure no call site handles specifically.
///
/// The provider message goes to the log and to a warning; the status itself
/// only names the backend.
pub fn internal_failure(backend: &str, op: &str, params: &str, err: &RemoteError) -> Status {
    error!(
        backend,
        op,
        params,
        code = %err.code,
        message = %err.message,
        "remote store call failed"
    );
    Status::fatal(Fatal::Internal {
        backend: backend.to_string(),
    })
    .with_warning(format!("{} {} failed: {}", op, params, err))
}

/// Classify a failure of a query that has no status to return.
///
/// The warnings [`internal_failure`] raises are written to the log instead.
pub fn report_query_failure(backend: &str, op: &str, params: &str, err: &RemoteError) {
    let status = internal_failure(backend, op, params, err);
    for warning in status.warnings() {
        warn!(backend, op, "{}", warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds() {
        assert_eq!(
            Failure::of(&RemoteError::no_such_bucket("b")),
            Failure::MissingBucket
        );
        assert_eq!(
            Failure::of(&RemoteError::no_such_key("b", "k")),
            Failure::MissingObject
        );
        assert_eq!(
            Failure::of(&RemoteError::new(ErrorCode::NotFound, "")),
            Failure::MissingObject
        );
        assert_eq!(
            Failure::of(&RemoteError::new(ErrorCode::AccessDenied, "denied")),
            Failure::Other
        );
    }

    #[test]
    fn test_internal_failure_hides_provider_wording() {
        let err = RemoteError::new(ErrorCode::Other("SlowDown".into()), "reduce request rate");
        let status = internal_failure("s3", "create", "media/x", &err);
        assert_eq!(
            status.fatals(),
            [Fatal::Internal {
                backend: "s3".to_string()
            }]
        );
        assert!(!status.to_string().contains("reduce request rate"));
        assert!(status.warnings()[0].contains("reduce request rate"));
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_query_failure_logs_warning() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .finish();
        let err = RemoteError::new(ErrorCode::AccessDenied, "denied by policy");
        tracing::subscriber::with_default(subscriber, || {
            report_query_failure("s3", "stat", "media/a.txt", &err);
        });

        let logs = String::from_utf8(captured.0.lock().clone()).unwrap();
        assert!(logs.contains("ERROR"));
        assert!(logs.contains("WARN"));
        assert!(logs.contains("stat media/a.txt failed"));
    }
}
