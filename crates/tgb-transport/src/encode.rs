//! Parameter encoding: one value to its wire-scalar text.

use tracing::warn;

use crate::params::{InputFile, ParamBag, ParamValue};

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("file content can only be sent as a multipart file part")]
    FileContent,

    #[error("empty file content is not sent")]
    EmptyFile,

    #[error("could not be encoded as json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convert one parameter into the text sent on the wire.
pub fn encode_param(value: &ParamValue) -> Result<String, EncodeError> {
    match value {
        ParamValue::Int(v) => Ok(v.to_string()),
        ParamValue::Int64(v) => Ok(v.to_string()),
        ParamValue::Float(v) => Ok(format!("{v:.8}")),
        ParamValue::Bool(v) => Ok(v.to_string()),
        ParamValue::Str(v) => Ok(v.clone()),
        ParamValue::ParseMode(v) => Ok(v.as_str().to_string()),
        ParamValue::ChatAction(v) => Ok(v.as_str().to_string()),
        ParamValue::File(InputFile::Url(url)) => Ok(url.clone()),
        ParamValue::File(InputFile::FileId(id)) => Ok(id.clone()),
        ParamValue::File(InputFile::Bytes(b)) | ParamValue::Bytes(b) if b.is_empty() => {
            Err(EncodeError::EmptyFile)
        }
        ParamValue::File(InputFile::Bytes(_) | InputFile::Path(_))
        | ParamValue::Bytes(_)
        | ParamValue::Handle(_) => Err(EncodeError::FileContent),
        ParamValue::Json(v) => Ok(v.to_json()?),
    }
}

/// True when at least one parameter carries content that must be uploaded.
///
/// Pure lookahead: nothing is read or opened.
pub fn has_file_param(params: &ParamBag) -> bool {
    params.iter().any(|(_, value)| match value {
        ParamValue::Bytes(bytes) => !bytes.is_empty(),
        ParamValue::Handle(_) => true,
        ParamValue::File(file) => file.is_upload(),
        _ => false,
    })
}

/// Encode a non-file field, logging and dropping it when conversion fails.
pub(crate) fn encode_or_omit(key: &str, value: &ParamValue) -> Option<String> {
    match encode_param(value) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(field = key, error = %e, "parameter omitted from request");
            None
        }
    }
}

/// `application/x-www-form-urlencoded` fields, in bag order.
pub fn encode_fields(params: &ParamBag) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(key, value)| encode_or_omit(key, value).map(|s| (key.to_string(), s)))
        .collect()
}
