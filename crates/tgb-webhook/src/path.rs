use std::fmt::Write;

use sha2::{Digest, Sha256};

/// Secret route for pushed updates: `/` followed by the SHA-256 hex digest of
/// the bot token.
///
/// Only Telegram learns this path (through `setWebhook`), and the token itself
/// never shows up in the URL or in access logs.
pub fn webhook_path(token: &str) -> String {
    let mut h = Sha256::new();
    h.update(token.as_bytes());
    let digest = h.finalize();

    let mut path = String::with_capacity(1 + digest.len() * 2);
    path.push('/');
    for b in digest.iter() {
        let _ = write!(&mut path, "{b:02x}");
    }
    path
}

/// Public URL to register with `setWebhook`.
pub fn webhook_url(host: &str, port: u16, token: &str) -> String {
    format!("https://{host}:{port}{}", webhook_path(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_is_hex_digest_of_token() {
        // sha256("abc")
        assert_eq!(
            webhook_path("abc"),
            "/ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn path_never_contains_token() {
        let token = "123456:ABC-DEF";
        let path = webhook_path(token);
        assert_eq!(path.len(), 65);
        assert!(!path.contains(token));
        assert!(!path.contains("123456"));
    }

    #[test]
    fn url_combines_host_port_and_path() {
        let url = webhook_url("bot.example.com", 8443, "abc");
        assert!(url.starts_with("https://bot.example.com:8443/ba7816bf"));
    }
}
