use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use tgb_core::{config::PollingConfig, ports::UpdateHandler, types::Update};
use tgb_transport::ParamBag;
use tracing::{debug, info, warn};

use crate::Bot;

/// Long-poll `getUpdates` until `stop` is set.
///
/// Each update is handed to `handler` in arrival order and the offset moves
/// past it, so an update is delivered at most once per process. A failed call
/// is handed over as `Err` and retried after `cfg.retry_interval`. The flag is
/// checked between calls; an in-flight long poll finishes first.
pub fn run_polling(
    bot: &Bot,
    handler: &dyn UpdateHandler,
    cfg: &PollingConfig,
    stop: &AtomicBool,
) {
    info!(
        timeout_secs = cfg.timeout_secs,
        limit = cfg.limit,
        "polling started"
    );
    let mut offset: i64 = 0;

    while !stop.load(Ordering::SeqCst) {
        let mut options = ParamBag::new()
            .with("timeout", cfg.timeout_secs)
            .with("limit", cfg.limit);
        if offset != 0 {
            options.insert("offset", offset);
        }

        match bot.get_updates(options).into_result() {
            Ok(updates) => {
                let updates: Vec<Update> = updates.unwrap_or_default();
                debug!(count = updates.len(), offset, "updates received");
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    handler.handle(Ok(update));
                }
            }
            Err(e) => {
                warn!("getUpdates failed: {e}");
                handler.handle(Err(e));
                thread::sleep(cfg.retry_interval);
            }
        }
    }

    info!("polling stopped");
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use tgb_core::{config::Config, Error, Result};
    use tgb_transport::{ParamValue, Transport};

    use super::*;

    /// Serves canned getUpdates bodies, then raises the stop flag.
    struct Script {
        bodies: Mutex<VecDeque<&'static str>>,
        offsets: Mutex<Vec<Option<i64>>>,
        stop: Arc<AtomicBool>,
    }

    impl Transport for Script {
        fn request(&self, method: &str, params: ParamBag) -> Result<Vec<u8>> {
            assert_eq!(method, "getUpdates");
            let offset = match params.get("offset") {
                Some(ParamValue::Int64(v)) => Some(*v),
                _ => None,
            };
            self.offsets.lock().unwrap().push(offset);

            let mut bodies = self.bodies.lock().unwrap();
            let body = bodies.pop_front().unwrap_or(r#"{"ok":true,"result":[]}"#);
            if bodies.is_empty() {
                self.stop.store(true, Ordering::SeqCst);
            }
            Ok(body.as_bytes().to_vec())
        }
    }

    fn run(bodies: Vec<&'static str>) -> (Vec<std::result::Result<i64, String>>, Vec<Option<i64>>) {
        let stop = Arc::new(AtomicBool::new(false));
        let script = Arc::new(Script {
            bodies: Mutex::new(bodies.into()),
            offsets: Mutex::new(Vec::new()),
            stop: stop.clone(),
        });
        let bot = Bot::with_transport(script.clone(), &Config::new("1:t"));

        let seen = Mutex::new(Vec::new());
        let handler = |update: Result<Update>| {
            seen.lock()
                .unwrap()
                .push(update.map(|u| u.update_id).map_err(|e| e.to_string()));
        };
        let cfg = PollingConfig {
            retry_interval: Duration::from_millis(1),
            ..PollingConfig::default()
        };
        run_polling(&bot, &handler, &cfg, &stop);

        let offsets = script.offsets.lock().unwrap().clone();
        (seen.into_inner().unwrap(), offsets)
    }

    #[test]
    fn delivers_updates_in_order_and_advances_offset() {
        let (seen, offsets) = run(vec![
            r#"{"ok":true,"result":[{"update_id":10},{"update_id":11}]}"#,
            r#"{"ok":true,"result":[{"update_id":12}]}"#,
        ]);
        assert_eq!(seen, vec![Ok(10), Ok(11), Ok(12)]);
        assert_eq!(offsets, vec![None, Some(12)]);
    }

    #[test]
    fn failed_call_is_forwarded_and_retried() {
        let (seen, offsets) = run(vec![
            r#"{"ok":false,"error_code":409,"description":"Conflict: terminated by other getUpdates request"}"#,
            r#"{"ok":true,"result":[{"update_id":3}]}"#,
        ]);
        assert_eq!(seen.len(), 2);
        let err = seen[0].as_ref().unwrap_err();
        assert!(err.contains("(409)"));
        assert!(err.contains("Conflict"));
        assert_eq!(seen[1], Ok(3));
        assert_eq!(offsets, vec![None, None]);
    }

    #[test]
    fn stop_flag_set_before_start_makes_no_calls() {
        let stop = AtomicBool::new(true);
        let script = Arc::new(Script {
            bodies: Mutex::new(VecDeque::new()),
            offsets: Mutex::new(Vec::new()),
            stop: Arc::new(AtomicBool::new(false)),
        });
        let bot = Bot::with_transport(script.clone(), &Config::new("1:t"));
        let handler = |_: Result<Update>| {
            panic!("no update expected");
        };

        run_polling(&bot, &handler, &PollingConfig::default(), &stop);
        assert!(script.offsets.lock().unwrap().is_empty());
    }

    #[test]
    fn api_error_variant_reaches_handler() {
        let stop = Arc::new(AtomicBool::new(false));
        let script = Arc::new(Script {
            bodies: Mutex::new(vec![r#"{"ok":false,"description":"Unauthorized"}"#].into()),
            offsets: Mutex::new(Vec::new()),
            stop: stop.clone(),
        });
        let bot = Bot::with_transport(script, &Config::new("1:t"));
        let errors = Mutex::new(Vec::new());
        let handler = |update: Result<Update>| {
            if let Err(e) = update {
                errors.lock().unwrap().push(e);
            }
        };
        let cfg = PollingConfig {
            retry_interval: Duration::ZERO,
            ..PollingConfig::default()
        };
        run_polling(&bot, &handler, &cfg, &stop);

        let errors = errors.into_inner().unwrap();
        assert!(matches!(
            errors.as_slice(),
            [Error::Api { error_code: None, description }] if description == "Unauthorized"
        ));
    }
}
