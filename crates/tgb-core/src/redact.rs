const MASK: &str = "<redacted>";

/// Scrubs the bot credential out of text before it is logged or returned.
#[derive(Clone)]
pub struct Redactor {
    secret: String,
    encoded: String,
}

impl Redactor {
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        // Tokens are `<id>:<hash>`; URL libraries may percent-encode the colon.
        let encoded = secret.replace(':', "%3A");
        Self { secret, encoded }
    }

    pub fn redact(&self, text: &str) -> String {
        if self.secret.is_empty() {
            return text.to_string();
        }
        let mut out = text.replace(&self.secret, MASK);
        if self.encoded != self.secret {
            out = out.replace(&self.encoded, MASK);
            out = out.replace(&self.encoded.replace("%3A", "%3a"), MASK);
        }
        out
    }
}

impl std::fmt::Debug for Redactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor").finish_non_exhaustive()
    }
}
