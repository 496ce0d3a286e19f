//! Request building and blocking dispatch.

use std::{
    fmt,
    fs::File,
    io::{self, Read},
    path::Path,
};

use reqwest::{
    blocking::{
        multipart::{Form, Part},
        Client,
    },
    header::CONNECTION,
};
use tracing::{debug, warn};

use tgb_core::{config::Config, errors::Error, redact::Redactor, Result};

use crate::{
    encode::{encode_fields, encode_or_omit, has_file_param},
    params::{InputFile, ParamBag, ParamValue},
    sniff::upload_file_name,
};

/// Sends one Bot API call and returns the raw response body.
///
/// HTTP status is not inspected; Telegram reports failures inside the JSON
/// envelope, which the decoder handles.
pub trait Transport: Send + Sync {
    fn request(&self, method: &str, params: ParamBag) -> Result<Vec<u8>>;

    /// Scrub secrets from text derived from a call (descriptions, bodies).
    fn redact(&self, text: &str) -> String {
        text.to_string()
    }
}

/// One multipart form part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        bytes: Vec<u8>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestBody {
    UrlEncoded(Vec<(String, String)>),
    Multipart(Vec<FormPart>),
}

/// Lay out the body for `params`: multipart when anything must be uploaded,
/// url-encoded otherwise. Fields that cannot be converted are dropped.
pub fn build_body(params: ParamBag) -> RequestBody {
    if !has_file_param(&params) {
        return RequestBody::UrlEncoded(encode_fields(&params));
    }

    let mut parts = Vec::with_capacity(params.len());
    for (key, value) in params {
        let part = match value {
            ParamValue::Bytes(bytes) | ParamValue::File(InputFile::Bytes(bytes))
                if !bytes.is_empty() =>
            {
                Some(FormPart::File {
                    file_name: upload_file_name(&key, &bytes),
                    name: key,
                    bytes,
                })
            }
            ParamValue::File(InputFile::Path(path)) => match read_local_file(&path) {
                Ok(bytes) => Some(FormPart::File {
                    file_name: local_file_name(&key, &path, &bytes),
                    name: key,
                    bytes,
                }),
                Err(e) => {
                    warn!(field = %key, path = %path.display(), error = %e, "could not read file parameter");
                    None
                }
            },
            ParamValue::Handle(handle) => match handle.read_remaining() {
                Ok(bytes) => Some(FormPart::File {
                    file_name: handle.name().to_string(),
                    name: key,
                    bytes,
                }),
                Err(e) => {
                    warn!(field = %key, error = %e, "could not read file handle parameter");
                    None
                }
            },
            other => encode_or_omit(&key, &other).map(|value| FormPart::Text { name: key, value }),
        };
        parts.extend(part);
    }
    RequestBody::Multipart(parts)
}

/// Open, copy and close a local file. The handle is released before this returns.
fn read_local_file(path: &Path) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

fn local_file_name(field: &str, path: &Path, bytes: &[u8]) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| upload_file_name(field, bytes))
}

fn into_form(parts: Vec<FormPart>) -> Form {
    parts.into_iter().fold(Form::new(), |form, part| match part {
        FormPart::Text { name, value } => form.text(name, value),
        FormPart::File {
            name,
            file_name,
            bytes,
        } => form.part(name, Part::bytes(bytes).file_name(file_name)),
    })
}

/// Blocking HTTP transport against `<api_base_url><token>/<method>`.
///
/// Idle connections are not pooled and every request asks the server to close
/// the connection; there is no retry.
pub struct HttpTransport {
    http: Client,
    api_base_url: String,
    token: String,
    redactor: Redactor,
}

impl HttpTransport {
    pub fn new(cfg: &Config) -> Result<Self> {
        let redactor = Redactor::new(cfg.bot_token.clone());

        let mut builder = Client::builder().pool_max_idle_per_host(0);
        if let Some(timeout) = cfg.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::BuildRequest(redactor.redact(&format!("http client: {e}"))))?;

        Ok(Self {
            http,
            api_base_url: cfg.api_base_url.clone(),
            token: cfg.bot_token.clone(),
            redactor,
        })
    }

    pub fn method_url(&self, method: &str) -> String {
        format!("{}{}/{}", self.api_base_url, self.token, method)
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }
}

impl Transport for HttpTransport {
    fn request(&self, method: &str, params: ParamBag) -> Result<Vec<u8>> {
        debug!(
            method,
            params = ?params.keys().collect::<Vec<_>>(),
            "sending request"
        );

        let builder = self.http.post(self.method_url(method)).header(CONNECTION, "close");
        let builder = match build_body(params) {
            RequestBody::UrlEncoded(fields) => builder.form(&fields),
            RequestBody::Multipart(parts) => builder.multipart(into_form(parts)),
        };

        let request = builder
            .build()
            .map_err(|e| Error::BuildRequest(self.redactor.redact(&e.to_string())))?;

        let response = self
            .http
            .execute(request)
            .map_err(|e| Error::Request(self.redactor.redact(&e.to_string())))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .map_err(|e| Error::ResponseRead(self.redactor.redact(&e.to_string())))?;

        debug!(method, status = status.as_u16(), len = bytes.len(), "received response");
        Ok(bytes.to_vec())
    }

    fn redact(&self, text: &str) -> String {
        self.redactor.redact(text)
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("api_base_url", &self.api_base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        io::{Seek, Write},
        sync::Arc,
    };

    use httpmock::{Method::POST, MockServer};

    use crate::params::OpenFile;

    use super::*;

    const TOKEN: &str = "1234:test-token";

    fn transport_for(server: &MockServer) -> HttpTransport {
        let cfg = Config::new(TOKEN).with_api_base_url(server.url("/bot"));
        HttpTransport::new(&cfg).unwrap()
    }

    #[test]
    fn plain_fields_build_urlencoded_body() {
        let bag = ParamBag::new()
            .with("chat_id", 42_i64)
            .with("text", "hello")
            .with("photo", InputFile::url("https://example.com/p.png"));
        assert_eq!(
            build_body(bag),
            RequestBody::UrlEncoded(vec![
                ("chat_id".to_string(), "42".to_string()),
                ("photo".to_string(), "https://example.com/p.png".to_string()),
                ("text".to_string(), "hello".to_string()),
            ])
        );
    }

    #[test]
    fn one_file_and_one_string_build_two_parts() {
        let bag = ParamBag::new()
            .with("photo", InputFile::bytes(b"\x89PNG\r\n\x1a\n0000".to_vec()))
            .with("caption", "look");
        let RequestBody::Multipart(parts) = build_body(bag) else {
            panic!("expected multipart body");
        };
        assert_eq!(parts.len(), 2);
        let files: Vec<_> = parts
            .iter()
            .filter_map(|p| match p {
                FormPart::File {
                    name, file_name, ..
                } => Some((name.as_str(), file_name.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(files, vec![("photo", "photo.png")]);
        assert!(parts.contains(&FormPart::Text {
            name: "caption".to_string(),
            value: "look".to_string(),
        }));
    }

    #[test]
    fn multipart_omits_unencodable_and_unreadable_fields() {
        let mut bad = HashMap::new();
        bad.insert((0, 0), 0);
        let bag = ParamBag::new()
            .with("document", vec![1_u8, 2, 3])
            .with("thumb", InputFile::path("/definitely/not/here.jpg"))
            .with("reply_markup", ParamValue::json(bad))
            .with("chat_id", 9_i64);
        let RequestBody::Multipart(parts) = build_body(bag) else {
            panic!("expected multipart body");
        };
        assert_eq!(
            parts,
            vec![
                FormPart::Text {
                    name: "chat_id".to_string(),
                    value: "9".to_string()
                },
                FormPart::File {
                    name: "document".to_string(),
                    file_name: "document".to_string(),
                    bytes: vec![1, 2, 3]
                },
            ]
        );
    }

    #[test]
    fn empty_byte_content_keeps_body_urlencoded() {
        let bag = ParamBag::new()
            .with("caption", "nothing attached")
            .with("document", Vec::<u8>::new());
        assert_eq!(
            build_body(bag),
            RequestBody::UrlEncoded(vec![(
                "caption".to_string(),
                "nothing attached".to_string()
            )])
        );
    }

    #[test]
    fn local_path_is_read_and_named_after_the_file() {
        let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        tmp.write_all(b"%PDF-1.4 local").unwrap();
        let expected_name = tmp
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string();

        let bag = ParamBag::new().with("document", InputFile::path(tmp.path()));
        let RequestBody::Multipart(parts) = build_body(bag) else {
            panic!("expected multipart body");
        };
        assert_eq!(
            parts,
            vec![FormPart::File {
                name: "document".to_string(),
                file_name: expected_name,
                bytes: b"%PDF-1.4 local".to_vec(),
            }]
        );
    }

    #[test]
    fn caller_handle_is_read_but_left_open() {
        let mut tmp = tempfile::tempfile().unwrap();
        tmp.write_all(b"voice bytes").unwrap();
        tmp.rewind().unwrap();
        let shared = Arc::new(tmp);

        let bag = ParamBag::new().with("voice", OpenFile::new("note.ogg", shared.clone()));
        let RequestBody::Multipart(parts) = build_body(bag) else {
            panic!("expected multipart body");
        };
        assert_eq!(
            parts,
            vec![FormPart::File {
                name: "voice".to_string(),
                file_name: "note.ogg".to_string(),
                bytes: b"voice bytes".to_vec(),
            }]
        );
        // Still usable by the caller.
        assert_eq!(Arc::strong_count(&shared), 1);
        assert!(shared.metadata().is_ok());
    }

    #[test]
    fn urlencoded_request_hits_method_url() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(format!("/bot{TOKEN}/sendMessage"))
                .header("content-type", "application/x-www-form-urlencoded")
                .header("connection", "close")
                .body("chat_id=42&parse_mode=HTML&text=hello+world");
            then.status(200).body(r#"{"ok":true,"result":true}"#);
        });

        let bag = ParamBag::new()
            .with("chat_id", 42_i64)
            .with("text", "hello world")
            .with("parse_mode", tgb_core::types::ParseMode::Html);
        let body = transport_for(&server).request("sendMessage", bag).unwrap();

        mock.assert();
        assert_eq!(body, br#"{"ok":true,"result":true}"#.to_vec());
    }

    #[test]
    fn multipart_request_carries_file_and_text_parts() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(format!("/bot{TOKEN}/sendDocument"))
                .header_exists("content-type")
                .body_contains(r#"name="document"; filename="document.pdf""#)
                .body_contains("%PDF-1.4 report")
                .body_contains(r#"name="caption""#)
                .body_contains("quarterly");
            then.status(200).body(r#"{"ok":true}"#);
        });

        let bag = ParamBag::new()
            .with("document", InputFile::bytes(b"%PDF-1.4 report".to_vec()))
            .with("caption", "quarterly");
        transport_for(&server).request("sendDocument", bag).unwrap();
        mock.assert();
    }

    #[test]
    fn error_status_still_returns_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(format!("/bot{TOKEN}/getMe"));
            then.status(401)
                .body(r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#);
        });

        let body = transport_for(&server)
            .request("getMe", ParamBag::new())
            .unwrap();
        assert!(String::from_utf8(body).unwrap().contains("Unauthorized"));
    }

    #[test]
    fn network_failure_is_redacted() {
        // Nothing listens on port 1.
        let cfg = Config::new(TOKEN).with_api_base_url("http://127.0.0.1:1/bot");
        let transport = HttpTransport::new(&cfg).unwrap();

        let err = transport.request("getMe", ParamBag::new()).unwrap_err();
        assert!(matches!(err, Error::Request(_)));
        let text = err.to_string();
        assert!(!text.contains(TOKEN), "token leaked: {text}");
        assert!(!format!("{err:?}").contains(TOKEN));
    }

    #[test]
    fn debug_hides_token() {
        let transport = HttpTransport::new(&Config::new(TOKEN)).unwrap();
        assert!(!format!("{transport:?}").contains(TOKEN));
        assert_eq!(
            transport.method_url("getMe"),
            format!("https://api.telegram.org/bot{TOKEN}/getMe")
        );
    }
}
