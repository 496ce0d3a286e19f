use std::{
    env, fmt, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::warn;

use crate::{errors::Error, types::UpdateType, Result};

pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org/bot";
pub const DEFAULT_FILE_BASE_URL: &str = "https://api.telegram.org/file/bot";

/// Typed configuration for the client.
///
/// Everything the transport needs is passed in explicitly; nothing is read from
/// process-wide state after construction.
#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    pub api_base_url: String,
    pub file_base_url: String,
    /// Per-request deadline. `None` keeps the HTTP client default.
    pub request_timeout: Option<Duration>,
    pub verbose: bool,

    pub polling: PollingConfig,
    pub webhook: Option<WebhookConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollingConfig {
    pub timeout_secs: u32,
    pub limit: u32,
    pub retry_interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            limit: 100,
            retry_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Public host name Telegram will push to.
    pub host: String,
    /// Public port; Telegram accepts 443, 80, 88 or 8443.
    pub port: u16,
    /// Local listen address (TLS is terminated in front of it).
    pub bind_addr: SocketAddr,
    pub certificate_path: Option<PathBuf>,
    pub max_connections: u32,
    pub allowed_updates: Vec<UpdateType>,
}

impl WebhookConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            certificate_path: None,
            max_connections: 40,
            allowed_updates: Vec::new(),
        }
    }
}

impl Config {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            file_base_url: DEFAULT_FILE_BASE_URL.to_string(),
            request_timeout: None,
            verbose: false,
            polling: PollingConfig::default(),
            webhook: None,
        }
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_file_base_url(mut self, url: impl Into<String>) -> Self {
        self.file_base_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_webhook(mut self, webhook: WebhookConfig) -> Self {
        self.webhook = Some(webhook);
        self
    }

    /// Load from the environment, reading `.env` first when present.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_env()
    }

    /// Load from the current environment only.
    pub fn from_env() -> Result<Self> {
        let bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let api_base_url = env_str("TELEGRAM_API_BASE_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let file_base_url = env_str("TELEGRAM_FILE_BASE_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_FILE_BASE_URL.to_string());
        let request_timeout = env_u64("TELEGRAM_REQUEST_TIMEOUT_MS").map(Duration::from_millis);
        let verbose = env_bool("TELEGRAM_VERBOSE").unwrap_or(false);

        let defaults = PollingConfig::default();
        let polling = PollingConfig {
            timeout_secs: env_u32("POLLING_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs),
            limit: env_u32("POLLING_LIMIT")
                .unwrap_or(defaults.limit)
                .clamp(1, 100),
            retry_interval: env_u64("POLLING_RETRY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_interval),
        };

        let webhook = match env_str("WEBHOOK_HOST").and_then(non_empty) {
            Some(host) => Some(webhook_from_env(host)?),
            None => None,
        };

        Ok(Self {
            bot_token: bot_token.trim().to_string(),
            api_base_url,
            file_base_url,
            request_timeout,
            verbose,
            polling,
            webhook,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("file_base_url", &self.file_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("verbose", &self.verbose)
            .field("polling", &self.polling)
            .field("webhook", &self.webhook)
            .finish()
    }
}

fn webhook_from_env(host: String) -> Result<WebhookConfig> {
    let port = match env_str("WEBHOOK_PORT") {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map_err(|_| Error::Config(format!("WEBHOOK_PORT is not a valid port: {raw}")))?,
        None => 8443,
    };

    let mut webhook = WebhookConfig::new(host, port);
    if let Some(raw) = env_str("WEBHOOK_BIND_ADDR").and_then(non_empty) {
        webhook.bind_addr = raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("WEBHOOK_BIND_ADDR is not a socket address: {raw}")))?;
    }
    webhook.certificate_path = env_path("WEBHOOK_CERT_PATH");
    if let Some(n) = env_u32("WEBHOOK_MAX_CONNECTIONS") {
        webhook.max_connections = n.clamp(1, 100);
    }
    webhook.allowed_updates = parse_allowed_updates(env_str("WEBHOOK_ALLOWED_UPDATES"))?;
    Ok(webhook)
}

fn parse_allowed_updates(v: Option<String>) -> Result<Vec<UpdateType>> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<UpdateType>()
                .map_err(|_| Error::Config(format!("unknown update type in WEBHOOK_ALLOWED_UPDATES: {s}")))
        })
        .collect()
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_number(key)
}

fn env_u32(key: &str) -> Option<u32> {
    env_number(key)
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_str(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring non-numeric value");
            None
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotenv_parsing_strips_quotes_and_comments() {
        let parsed = parse_dotenv(
            "# comment\n\nTELEGRAM_BOT_TOKEN=\"1:abc\"\nWEBHOOK_HOST='bot.example.com'\nBROKEN\n=novalue\nPOLLING_LIMIT = 50\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("TELEGRAM_BOT_TOKEN".to_string(), "1:abc".to_string()),
                ("WEBHOOK_HOST".to_string(), "bot.example.com".to_string()),
                ("POLLING_LIMIT".to_string(), "50".to_string()),
            ]
        );
    }

    #[test]
    fn dotenv_file_does_not_override_environment() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "TGB_TEST_DOTENV_NEW=from-file").unwrap();
        writeln!(file, "TGB_TEST_DOTENV_SET=from-file").unwrap();
        env::set_var("TGB_TEST_DOTENV_SET", "from-env");

        load_dotenv_if_present(file.path());

        assert_eq!(env::var("TGB_TEST_DOTENV_NEW").unwrap(), "from-file");
        assert_eq!(env::var("TGB_TEST_DOTENV_SET").unwrap(), "from-env");
    }

    #[test]
    fn missing_dotenv_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        load_dotenv_if_present(&dir.path().join(".env"));
    }

    #[test]
    fn allowed_updates_parse_known_kinds() {
        let parsed =
            parse_allowed_updates(Some("message, callback_query,,edited_message".to_string()))
                .unwrap();
        assert_eq!(
            parsed,
            vec![
                UpdateType::Message,
                UpdateType::CallbackQuery,
                UpdateType::EditedMessage
            ]
        );
        assert!(parse_allowed_updates(Some("message,bogus".to_string())).is_err());
        assert!(parse_allowed_updates(None).unwrap().is_empty());
    }

    #[test]
    fn builder_defaults_and_overrides() {
        let cfg = Config::new("1:abc")
            .with_api_base_url("http://127.0.0.1:9/bot")
            .with_request_timeout(Duration::from_secs(3))
            .with_webhook(WebhookConfig::new("bot.example.com", 443));
        assert_eq!(cfg.api_base_url, "http://127.0.0.1:9/bot");
        assert_eq!(cfg.file_base_url, DEFAULT_FILE_BASE_URL);
        assert_eq!(cfg.request_timeout, Some(Duration::from_secs(3)));
        let webhook = cfg.webhook.unwrap();
        assert_eq!(webhook.max_connections, 40);
        assert_eq!(webhook.bind_addr.port(), 443);
        assert_eq!(cfg.polling, PollingConfig::default());
    }

    #[test]
    fn debug_hides_token() {
        let cfg = Config::new("999:very-secret");
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
