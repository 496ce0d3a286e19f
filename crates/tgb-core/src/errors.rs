/// Core error type for the client.
///
/// Transport failures carry already-redacted text; callers may log or return
/// them without further sanitizing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("building request error: {0}")]
    BuildRequest(String),

    #[error("request error: {0}")]
    Request(String),

    #[error("response read error: {0}")]
    ResponseRead(String),

    #[error("api error ({}): {description}", error_code.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()))]
    Api {
        description: String,
        error_code: Option<i64>,
    },

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_includes_code_when_present() {
        let e = Error::Api {
            description: "Bad Request: chat not found".to_string(),
            error_code: Some(400),
        };
        assert_eq!(e.to_string(), "api error (400): Bad Request: chat not found");

        let e = Error::Api {
            description: "x".to_string(),
            error_code: None,
        };
        assert_eq!(e.to_string(), "api error (-): x");
    }
}
