use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::inference::ModelChoice;

pub const TOKEN_ENV: &str = "LEADWARM_API_TOKEN";
/// Accepted as a fallback since Hugging Face tooling conventionally sets it.
pub const TOKEN_FALLBACK_ENV: &str = "HF_TOKEN";
pub const API_BASE_ENV: &str = "LEADWARM_API_BASE";
pub const MODEL_ENV: &str = "LEADWARM_MODEL";
pub const MAX_SCRAPE_CHARS_ENV: &str = "LEADWARM_MAX_SCRAPE_CHARS";
pub const FETCH_TIMEOUT_ENV: &str = "LEADWARM_FETCH_TIMEOUT_SECS";

pub const DEFAULT_API_BASE: &str = "https://router.huggingface.co/v1";
pub const DEFAULT_MAX_SCRAPE_CHARS: usize = 8_000;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Process-wide settings, read once at startup and passed explicitly to each
/// component. Read-only after construction.
///
/// A missing API token is not a startup error: the UI stays usable and the
/// inference client reports the missing credential per request.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_token: Option<String>,
    pub api_base: String,
    pub default_model: ModelChoice,
    /// Upper bound, in characters, on scraped text forwarded to the model.
    pub max_scrape_chars: usize,
    /// Budget for both the preflight request and the browser render.
    pub fetch_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup. Tests inject a closure here
    /// instead of mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_token = lookup(TOKEN_ENV)
            .or_else(|| lookup(TOKEN_FALLBACK_ENV))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        let api_base = lookup(API_BASE_ENV)
            .map(|base| base.trim().trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let default_model = match lookup(MODEL_ENV) {
            Some(raw) => raw.trim().parse::<ModelChoice>().map_err(ConfigError::from)?,
            None => ModelChoice::default(),
        };

        let max_scrape_chars = parse_positive(
            MAX_SCRAPE_CHARS_ENV,
            lookup(MAX_SCRAPE_CHARS_ENV),
            DEFAULT_MAX_SCRAPE_CHARS,
        )?;
        let timeout_secs = parse_positive(
            FETCH_TIMEOUT_ENV,
            lookup(FETCH_TIMEOUT_ENV),
            DEFAULT_FETCH_TIMEOUT_SECS,
        )?;

        Ok(Self {
            api_token,
            api_base,
            default_model,
            max_scrape_chars,
            fetch_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_positive<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + From<u8>,
{
    let Some(raw) = raw else {
        return Ok(default);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }
    let value = trimmed.parse::<T>().map_err(|_| ConfigError::Invalid {
        var,
        value: raw.clone(),
        reason: "not a number".to_string(),
    })?;
    if value <= T::from(0u8) {
        return Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}
