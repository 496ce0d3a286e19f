use std::{fmt, io::Read, sync::Arc};

use tgb_core::{ports::UpdateHandler, types::Update, Error};
use tracing::{debug, warn};

/// Turns one pushed request body into one handler invocation.
///
/// Every entry point calls the handler exactly once, with either the decoded
/// update or the error that prevented decoding. Nothing is returned to the
/// caller, so a malformed push can never fail the HTTP exchange.
#[derive(Clone)]
pub struct WebhookIngest {
    handler: Arc<dyn UpdateHandler>,
}

impl WebhookIngest {
    pub fn new(handler: Arc<dyn UpdateHandler>) -> Self {
        Self { handler }
    }

    pub fn handle_body(&self, body: &[u8]) {
        match serde_json::from_slice::<Update>(body) {
            Ok(update) => {
                debug!(update_id = update.update_id, "webhook update received");
                self.handler.handle(Ok(update));
            }
            Err(e) => {
                warn!(bytes = body.len(), "webhook body is not an update: {e}");
                self.handler.handle(Err(Error::Json(e)));
            }
        }
    }

    /// Read the whole body first; a read failure is reported like a decode failure.
    pub fn handle_reader(&self, mut reader: impl Read) {
        let mut body = Vec::new();
        match reader.read_to_end(&mut body) {
            Ok(_) => self.handle_body(&body),
            Err(e) => self.handle_error(Error::Io(e)),
        }
    }

    pub fn handle_error(&self, err: Error) {
        warn!("webhook body could not be read: {err}");
        self.handler.handle(Err(err));
    }
}

impl fmt::Debug for WebhookIngest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookIngest").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::Mutex,
    };

    use tgb_core::Result;

    use super::*;

    type Seen = Arc<Mutex<Vec<Result<Update>>>>;

    fn recording() -> (WebhookIngest, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let ingest = WebhookIngest::new(Arc::new(move |update: Result<Update>| {
            sink.lock().unwrap().push(update);
        }));
        (ingest, seen)
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away"))
        }
    }

    #[test]
    fn message_update_is_delivered() {
        let (ingest, seen) = recording();
        ingest.handle_body(
            br#"{"update_id":1,"message":{"message_id":1,"date":0,"chat":{"id":5,"type":"private"},"text":"hi"}}"#,
        );

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let update = seen[0].as_ref().unwrap();
        assert_eq!(update.update_id, 1);
        let message = update.message.as_ref().unwrap();
        assert_eq!(message.chat.id, 5);
        assert_eq!(message.text.as_deref(), Some("hi"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let (ingest, seen) = recording();
        ingest.handle_body(br#"{"update_id":9,"my_chat_member":{"anything":true}}"#);

        let seen = seen.lock().unwrap();
        let update = seen[0].as_ref().unwrap();
        assert_eq!(update.update_id, 9);
        assert!(update.any_message().is_none());
    }

    #[test]
    fn garbage_is_reported_as_json_error() {
        let (ingest, seen) = recording();
        ingest.handle_body(b"not json");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], Err(Error::Json(_))));
    }

    #[test]
    fn empty_body_is_reported_as_json_error() {
        let (ingest, seen) = recording();
        ingest.handle_body(b"");
        assert!(matches!(seen.lock().unwrap()[0], Err(Error::Json(_))));
    }

    #[test]
    fn reader_is_drained_before_decoding() {
        let (ingest, seen) = recording();
        ingest.handle_reader(io::Cursor::new(br#"{"update_id":77}"#.to_vec()));
        assert_eq!(seen.lock().unwrap()[0].as_ref().unwrap().update_id, 77);
    }

    #[test]
    fn read_failure_is_reported_as_io_error() {
        let (ingest, seen) = recording();
        ingest.handle_reader(Broken);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        match &seen[0] {
            Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
