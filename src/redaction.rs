use once_cell::sync::Lazy;
use regex::Regex;

static SECRET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r#"(?i)(authorization)\s*[:=]\s*["']?(?:basic|bearer)\s+([A-Za-z0-9+/=_\-\.]+)["']?"#)
            .expect("valid regex"),
        Regex::new(r#"(?i)(api[_-]?key|apikey|token|secret|password)\s*[:=]\s*["']?([A-Za-z0-9_\-\.]{6,})["']?"#)
            .expect("valid regex"),
    ]
});

/// Scrubs credentials out of text headed for the log. Known secrets are
/// replaced literally; common `name=value` and auth header shapes by pattern.
#[derive(Debug, Default, Clone)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, secret: &str) -> Self {
        if !secret.is_empty() {
            self.secrets.push(secret.to_string());
        }
        self
    }

    pub fn redact(&self, input: &str) -> String {
        let mut result = input.to_string();
        for secret in &self.secrets {
            result = result.replace(secret.as_str(), "[REDACTED]");
        }

        for pattern in SECRET_PATTERNS.iter() {
            if !pattern.is_match(&result) {
                continue;
            }
            result = pattern
                .replace_all(&result, |caps: &regex::Captures<'_>| {
                    let key = caps
                        .get(1)
                        .map(|m| m.as_str())
                        .unwrap_or("secret")
                        .to_ascii_lowercase();
                    format!("{}=[REDACTED]", key)
                })
                .to_string();
        }
        result
    }
}
