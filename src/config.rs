use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_EMBED_MODEL: &str = "embedding-001";
const DEFAULT_CHAT_MODEL: &str = "gemini-pro";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_EMBEDDING_DIMENSION: usize = 768;
const DEFAULT_TOP_K: usize = 3;
const DEFAULT_MAX_EMBED_CHARS: usize = 32_000;

/// Runtime configuration, assembled from environment variables once at
/// startup and shared read-only through `AppState`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub log_dir: PathBuf,
    /// Credential for the Gemini embedding and generation endpoints.
    pub google_api_key: String,
    pub gemini_base_url: String,
    pub embed_model: String,
    pub chat_model: String,
    pub pinecone_api_key: String,
    /// Data-plane host of the Pinecone index, e.g. `https://my-index-abc123.svc.pinecone.io`.
    pub pinecone_index_host: String,
    pub pinecone_namespace: Option<String>,
    pub webdriver_url: String,
    pub fetch_timeout: Duration,
    pub embedding_dimension: usize,
    pub top_k: usize,
    pub max_embed_chars: usize,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::build(&|key| env::var(key).ok())
    }

    fn build(lookup: &dyn Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let google_api_key = require(lookup, "GOOGLE_API_KEY")?;
        let pinecone_api_key = require(lookup, "PINECONE_API_KEY")?;
        let pinecone_index_host = require(lookup, "PINECONE_INDEX_HOST")?;
        require_http_url("PINECONE_INDEX_HOST", &pinecone_index_host)?;

        let gemini_base_url =
            optional(lookup, "GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.into());
        require_http_url("GEMINI_BASE_URL", &gemini_base_url)?;

        let webdriver_url =
            optional(lookup, "WEBDRIVER_URL").unwrap_or_else(|| DEFAULT_WEBDRIVER_URL.into());
        require_http_url("WEBDRIVER_URL", &webdriver_url)?;

        let port = parse_or(lookup, "PORT", DEFAULT_PORT)?;
        let fetch_timeout_secs = parse_in_range(
            lookup,
            "FETCH_TIMEOUT_SECS",
            DEFAULT_FETCH_TIMEOUT_SECS,
            1,
            600,
        )?;
        let embedding_dimension = parse_in_range(
            lookup,
            "EMBEDDING_DIMENSION",
            DEFAULT_EMBEDDING_DIMENSION,
            1,
            8192,
        )?;
        let top_k = parse_in_range(lookup, "RAG_TOP_K", DEFAULT_TOP_K, 1, 100)?;
        let max_embed_chars = parse_in_range(
            lookup,
            "MAX_EMBED_CHARS",
            DEFAULT_MAX_EMBED_CHARS,
            1,
            5_000_000,
        )?;

        Ok(Settings {
            port,
            log_dir: optional(lookup, "LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("logs")),
            google_api_key,
            gemini_base_url: gemini_base_url.trim_end_matches('/').to_string(),
            embed_model: optional(lookup, "GEMINI_EMBED_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBED_MODEL.into()),
            chat_model: optional(lookup, "GEMINI_CHAT_MODEL")
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.into()),
            pinecone_api_key,
            pinecone_index_host: pinecone_index_host.trim_end_matches('/').to_string(),
            pinecone_namespace: optional(lookup, "PINECONE_NAMESPACE"),
            webdriver_url: webdriver_url.trim_end_matches('/').to_string(),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            embedding_dimension,
            top_k,
            max_embed_chars,
        })
    }
}

fn require(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<String> {
    match optional(lookup, key) {
        Some(value) => Ok(value),
        None => bail!("missing required environment variable {}", key),
    }
}

fn optional(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn require_http_url(key: &str, value: &str) -> anyhow::Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        return Ok(());
    }
    bail!("{} must be an http(s) URL, got '{}'", key, value)
}

fn parse_or<T: std::str::FromStr>(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(lookup, key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid value for {}: '{}'", key, raw)),
        None => Ok(default),
    }
}

fn parse_in_range<T>(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    min: T,
    max: T,
) -> anyhow::Result<T>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = parse_or(lookup, key, default)?;
    if value < min || value > max {
        bail!("{} must be between {} and {}, got {}", key, min, max, value);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("GOOGLE_API_KEY", "g-key"),
            ("PINECONE_API_KEY", "p-key"),
            ("PINECONE_INDEX_HOST", "https://idx-abc.svc.pinecone.io/"),
        ])
    }

    fn build_with(vars: HashMap<&'static str, &'static str>) -> anyhow::Result<Settings> {
        Settings::build(&move |key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_are_applied() {
        let settings = build_with(base_vars()).unwrap();
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.top_k, 3);
        assert_eq!(settings.embedding_dimension, 768);
        assert_eq!(settings.fetch_timeout, Duration::from_secs(30));
        assert_eq!(settings.webdriver_url, "http://localhost:9515");
        assert_eq!(settings.embed_model, "embedding-001");
        assert_eq!(settings.chat_model, "gemini-pro");
        // Trailing slash trimmed so clients can append paths.
        assert_eq!(
            settings.pinecone_index_host,
            "https://idx-abc.svc.pinecone.io"
        );
        assert!(settings.pinecone_namespace.is_none());
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let mut vars = base_vars();
        vars.remove("GOOGLE_API_KEY");
        let err = build_with(vars).unwrap_err();
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut vars = base_vars();
        vars.insert("PINECONE_API_KEY", "   ");
        let err = build_with(vars).unwrap_err();
        assert!(err.to_string().contains("PINECONE_API_KEY"));
    }

    #[test]
    fn out_of_range_top_k_is_rejected() {
        let mut vars = base_vars();
        vars.insert("RAG_TOP_K", "0");
        let err = build_with(vars).unwrap_err();
        assert!(err.to_string().contains("RAG_TOP_K"));
    }

    #[test]
    fn non_http_index_host_is_rejected() {
        let mut vars = base_vars();
        vars.insert("PINECONE_INDEX_HOST", "idx-abc.svc.pinecone.io");
        assert!(build_with(vars).is_err());
    }

    #[test]
    fn overrides_are_honored() {
        let mut vars = base_vars();
        vars.insert("RAG_TOP_K", "5");
        vars.insert("FETCH_TIMEOUT_SECS", "10");
        vars.insert("PINECONE_NAMESPACE", "prod");
        let settings = build_with(vars).unwrap();
        assert_eq!(settings.top_k, 5);
        assert_eq!(settings.fetch_timeout, Duration::from_secs(10));
        assert_eq!(settings.pinecone_namespace.as_deref(), Some("prod"));
    }
}
