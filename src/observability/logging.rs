//! Tracing setup and log redaction.

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Newline-delimited JSON output.
    Json,
}

/// Installs a global tracing subscriber with an env-filter.
///
/// The filter honours `RUST_LOG`, defaulting to `info`. Calling this when a
/// subscriber is already installed is a no-op, so libraries and tests can
/// both call it safely.
pub fn init_tracing(format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Redacts credential material from text before it reaches logs.
pub fn redact(text: &str) -> String {
    let mut result = text.to_string();

    // Key/value pairs first. A value of "Bearer" is the scheme of a header
    // like "Authorization: Bearer <token>"; it is left intact here and the
    // token itself is handled by the bearer pass below, so the two passes
    // never touch the same text.
    if let Ok(re) = regex::Regex::new(r"(?i)(authorization|token)[=:]\s*([^\s,}&]+)") {
        result = re
            .replace_all(&result, |caps: &regex::Captures<'_>| {
                if caps[2].eq_ignore_ascii_case("bearer") {
                    caps[0].to_string()
                } else {
                    format!("{}=***", &caps[1])
                }
            })
            .to_string();
    }

    if let Ok(re) = regex::Regex::new(r"(?i)(bearer)\s+[A-Za-z0-9._~+/=-]+") {
        result = re.replace_all(&result, "$1 ***").to_string();
    }

    result
}
