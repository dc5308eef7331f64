use crate::error::ClientError;

/// Sink for user-facing failure notifications.
///
/// The console facade calls this once for every failed request unless the
/// caller opted out with `skip_error_handler`.
pub trait ErrorNotifier: Send + Sync {
    fn notify(&self, error: &ClientError);
}

impl<F> ErrorNotifier for F
where
    F: Fn(&ClientError) + Send + Sync,
{
    fn notify(&self, error: &ClientError) {
        self(error);
    }
}

/// Default notifier: reports failures as `error` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl ErrorNotifier for TracingNotifier {
    fn notify(&self, error: &ClientError) {
        match error.status() {
            Some(status) => {
                tracing::error!(status = %status, error = %error, "console request failed");
            }
            None => tracing::error!(error = %error, "console request failed"),
        }
    }
}
