//! Shared call path: dispatch, decode, and report failures as envelopes.

use serde::de::DeserializeOwned;
use tracing::{error, warn};

use tgb_core::envelope::{MessageOrBool, ResponseEnvelope};

use crate::{
    decode::{decode_envelope, decode_message_or_bool},
    params::ParamBag,
    request::Transport,
};

/// Call `method` and decode its result as `T`.
pub fn call<T: DeserializeOwned>(
    transport: &dyn Transport,
    method: &str,
    params: ParamBag,
) -> ResponseEnvelope<T> {
    dispatch(transport, method, params, decode_envelope::<T>)
}

/// Call an edit-style `method` whose result is a message or `true`.
pub fn call_message_or_bool(
    transport: &dyn Transport,
    method: &str,
    params: ParamBag,
) -> ResponseEnvelope<MessageOrBool> {
    dispatch(transport, method, params, decode_message_or_bool)
}

fn dispatch<T>(
    transport: &dyn Transport,
    method: &str,
    params: ParamBag,
    decode: impl FnOnce(&[u8]) -> ResponseEnvelope<T>,
) -> ResponseEnvelope<T> {
    let mut envelope = match transport.request(method, params) {
        Ok(bytes) => decode(&bytes),
        Err(e) => ResponseEnvelope::failed(format!("{method} failed with error: {e}")),
    };

    if !envelope.ok {
        let description = envelope
            .description
            .as_deref()
            .map(|d| transport.redact(d))
            .unwrap_or_default();
        if envelope.error_code.is_some() {
            warn!(method, error_code = ?envelope.error_code, %description, "api call rejected");
        } else {
            error!(method, %description, "api call failed");
        }
        envelope.description = Some(description).filter(|d| !d.is_empty());
    }
    envelope
}
