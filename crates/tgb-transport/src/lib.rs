//! Request transport and response decoding for the Telegram Bot API.
//!
//! A call is a method name plus a [`ParamBag`]. The bag is encoded as
//! url-encoded form fields, or as multipart form data when it carries file
//! content, sent with one blocking POST, and the reply is decoded into a
//! [`ResponseEnvelope`](tgb_core::envelope::ResponseEnvelope).

pub mod call;
pub mod decode;
pub mod encode;
pub mod params;
pub mod request;
pub mod sniff;

pub use call::{call, call_message_or_bool};
pub use params::{InputFile, OpenFile, ParamBag, ParamValue};
pub use request::{HttpTransport, Transport};
