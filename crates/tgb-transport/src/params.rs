//! Parameter bags: the named inputs of one Bot API call.

use std::{
    collections::{btree_map, BTreeMap},
    fmt,
    fs::File,
    io::{self, Read},
    path::PathBuf,
    sync::Arc,
};

use serde::Serialize;

use tgb_core::types::{ChatAction, ChatId, InlineKeyboardMarkup, ParseMode, UpdateType};

/// A file argument.
///
/// Only `Bytes` (non-empty) and `Path` are uploaded; `Url` and `FileId` travel as
/// plain strings and let Telegram fetch or reuse the file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputFile {
    Bytes(Vec<u8>),
    Path(PathBuf),
    Url(String),
    FileId(String),
}

impl InputFile {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        InputFile::Bytes(bytes.into())
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        InputFile::Path(path.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        InputFile::Url(url.into())
    }

    pub fn file_id(id: impl Into<String>) -> Self {
        InputFile::FileId(id.into())
    }

    /// Whether this value has to go out as a multipart file part.
    pub fn is_upload(&self) -> bool {
        match self {
            InputFile::Bytes(b) => !b.is_empty(),
            InputFile::Path(_) => true,
            InputFile::Url(_) | InputFile::FileId(_) => false,
        }
    }
}

/// An already-open file supplied by the caller.
///
/// The transport reads it through a shared reference and never closes it: the
/// handle stays open for as long as the caller keeps its own `Arc`.
#[derive(Clone, Debug)]
pub struct OpenFile {
    name: String,
    file: Arc<File>,
}

impl OpenFile {
    pub fn new(name: impl Into<String>, file: Arc<File>) -> Self {
        Self {
            name: name.into(),
            file,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn read_remaining(&self) -> io::Result<Vec<u8>> {
        let mut reader: &File = &self.file;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Structured values sent as JSON text (reply markup, media lists, ...).
///
/// Serialization is deferred to encoding time so a value that cannot be
/// represented as JSON only drops its own field.
pub trait JsonParam: fmt::Debug + Send + Sync {
    fn to_json(&self) -> serde_json::Result<String>;
}

impl<T> JsonParam for T
where
    T: Serialize + fmt::Debug + Send + Sync,
{
    fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Clone, Debug)]
pub enum ParamValue {
    Int(i32),
    Int64(i64),
    /// Sent with exactly 8 fractional digits.
    Float(f64),
    Bool(bool),
    Str(String),
    ParseMode(ParseMode),
    ChatAction(ChatAction),
    File(InputFile),
    /// Raw upload content; the file name is derived from the field and content.
    Bytes(Vec<u8>),
    Handle(OpenFile),
    Json(Arc<dyn JsonParam>),
}

impl ParamValue {
    pub fn json<T>(value: T) -> Self
    where
        T: Serialize + fmt::Debug + Send + Sync + 'static,
    {
        ParamValue::Json(Arc::new(value))
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int64(v)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int64(i64::from(v))
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Float(f64::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<ParseMode> for ParamValue {
    fn from(v: ParseMode) -> Self {
        ParamValue::ParseMode(v)
    }
}

impl From<ChatAction> for ParamValue {
    fn from(v: ChatAction) -> Self {
        ParamValue::ChatAction(v)
    }
}

impl From<InputFile> for ParamValue {
    fn from(v: InputFile) -> Self {
        ParamValue::File(v)
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(v: Vec<u8>) -> Self {
        ParamValue::Bytes(v)
    }
}

impl From<OpenFile> for ParamValue {
    fn from(v: OpenFile) -> Self {
        ParamValue::Handle(v)
    }
}

impl From<ChatId> for ParamValue {
    fn from(v: ChatId) -> Self {
        match v {
            ChatId::Id(id) => ParamValue::Int64(id),
            ChatId::Username(name) => ParamValue::Str(name),
        }
    }
}

impl From<InlineKeyboardMarkup> for ParamValue {
    fn from(v: InlineKeyboardMarkup) -> Self {
        ParamValue::json(v)
    }
}

impl From<Vec<UpdateType>> for ParamValue {
    fn from(v: Vec<UpdateType>) -> Self {
        ParamValue::json(v)
    }
}

/// Field name → value. Names are sent exactly as given.
#[derive(Clone, Debug, Default)]
pub struct ParamBag {
    fields: BTreeMap<String, ParamValue>,
}

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Option<ParamValue> {
        self.fields.insert(key.into(), value.into())
    }

    /// Insert only when `value` is present.
    pub fn insert_opt<V: Into<ParamValue>>(&mut self, key: impl Into<String>, value: Option<V>) {
        if let Some(v) = value {
            self.insert(key, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.fields.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.fields.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl IntoIterator for ParamBag {
    type Item = (String, ParamValue);
    type IntoIter = btree_map::IntoIter<String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<K, V> FromIterator<(K, V)> for ParamBag
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = ParamBag::new();
        for (k, v) in iter {
            bag.insert(k, v);
        }
        bag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_insert_replaces_earlier_value() {
        let mut bag = ParamBag::new().with("text", "first");
        let old = bag.insert("text", "second");
        assert!(matches!(old, Some(ParamValue::Str(s)) if s == "first"));
        assert_eq!(bag.len(), 1);
        assert!(matches!(bag.get("text"), Some(ParamValue::Str(s)) if s == "second"));
    }

    #[test]
    fn insert_opt_skips_none() {
        let mut bag = ParamBag::new();
        bag.insert_opt("caption", None::<String>);
        bag.insert_opt("duration", Some(3));
        assert_eq!(bag.keys().collect::<Vec<_>>(), vec!["duration"]);
    }

    #[test]
    fn chat_id_maps_to_int_or_string() {
        assert!(matches!(
            ParamValue::from(ChatId::Id(-5)),
            ParamValue::Int64(-5)
        ));
        assert!(matches!(
            ParamValue::from(ChatId::from("@chan")),
            ParamValue::Str(s) if s == "@chan"
        ));
    }

    #[test]
    fn only_bytes_and_paths_are_uploads() {
        assert!(InputFile::bytes(vec![1, 2]).is_upload());
        assert!(!InputFile::bytes(Vec::new()).is_upload());
        assert!(InputFile::path("/tmp/x.png").is_upload());
        assert!(!InputFile::url("https://example.com/x.png").is_upload());
        assert!(!InputFile::file_id("AgAD").is_upload());
    }
}
