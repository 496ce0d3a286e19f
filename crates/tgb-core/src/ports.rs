use crate::{types::Update, Result};

/// Receives updates from polling or the webhook.
///
/// A decode or read failure is delivered as `Err` in place of an update; the
/// handler decides whether to log, count or ignore it. Implementations run on
/// worker threads and may call the blocking client.
pub trait UpdateHandler: Send + Sync {
    fn handle(&self, update: Result<Update>);
}

impl<F> UpdateHandler for F
where
    F: Fn(Result<Update>) + Send + Sync,
{
    fn handle(&self, update: Result<Update>) {
        self(update)
    }
}
