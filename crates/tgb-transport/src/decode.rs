//! Response decoding into typed envelopes.
//!
//! Decoding never fails outward: a body that does not fit the expected shape
//! becomes a failed envelope whose description carries the parse error and the
//! raw body.

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use tgb_core::{
    envelope::{MessageOrBool, ResponseEnvelope},
    types::Message,
};

pub fn decode_envelope<T: DeserializeOwned>(bytes: &[u8]) -> ResponseEnvelope<T> {
    match serde_json::from_slice::<ResponseEnvelope<T>>(bytes) {
        Ok(envelope) => envelope,
        Err(e) => ResponseEnvelope::failed(format!(
            "json parse error: {e} ({})",
            String::from_utf8_lossy(bytes)
        )),
    }
}

/// One accepted shape for an ambiguous `result`.
///
/// Returns `Some(result)` when the candidate accepts the (possibly absent)
/// payload, `None` to fall through to the next candidate.
type Candidate = fn(Option<&Value>) -> Option<Option<MessageOrBool>>;

/// Tried in order; the first acceptance wins.
const MESSAGE_OR_BOOL: &[(&str, Candidate)] = &[("Message", as_message), ("bool", as_bool)];

fn as_message(result: Option<&Value>) -> Option<Option<MessageOrBool>> {
    match result {
        None => Some(None),
        // Only objects may become messages; `true` must fall through.
        Some(v @ Value::Object(_)) => Message::deserialize(v)
            .ok()
            .map(|m| Some(MessageOrBool::Message(Box::new(m)))),
        Some(_) => None,
    }
}

fn as_bool(result: Option<&Value>) -> Option<Option<MessageOrBool>> {
    match result {
        Some(Value::Bool(b)) => Some(Some(MessageOrBool::Bool(*b))),
        _ => None,
    }
}

/// Decode a response whose `result` is either an edited message or `true`.
pub fn decode_message_or_bool(bytes: &[u8]) -> ResponseEnvelope<MessageOrBool> {
    let raw = match serde_json::from_slice::<ResponseEnvelope<Value>>(bytes) {
        Ok(raw) => raw,
        Err(e) => {
            return ResponseEnvelope::failed(format!(
                "json parse error: {e} ({})",
                String::from_utf8_lossy(bytes)
            ))
        }
    };

    let accepted = MESSAGE_OR_BOOL
        .iter()
        .find_map(|(_, candidate)| candidate(raw.result.as_ref()));

    match accepted {
        Some(result) => ResponseEnvelope {
            ok: raw.ok,
            description: raw.description,
            result,
            error_code: raw.error_code,
            parameters: raw.parameters,
        },
        None => {
            let shapes = MESSAGE_OR_BOOL
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(" nor ");
            ResponseEnvelope::failed(format!(
                "json parse error: not in {shapes} type ({})",
                String::from_utf8_lossy(bytes)
            ))
        }
    }
}
