//! Configuration management for Lambda functions.

use std::env;
use std::time::Duration;

use reqwest::Url;

use crate::auth::MIN_SECRET_LEN;
use crate::{Error, Result};

const DEFAULT_JWT_EXPIRES_IN: &str = "1d";
const DEFAULT_AI_TIMEOUT_MS: u64 = 3500;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database host
    pub db_host: String,
    /// Database name
    pub db_name: String,
    /// ARN of the secret containing database credentials
    pub db_secret_arn: String,
    /// Inline token signing secret
    pub jwt_secret: Option<String>,
    /// ARN of the secret holding the signing secret, used when `jwt_secret` is unset
    pub jwt_secret_arn: Option<String>,
    /// Token lifetime
    pub jwt_expires_in: Duration,
    /// Base URL of the AI service; fallback-only when unset
    pub ai_service_url: Option<String>,
    /// Hard limit on a single AI service call
    pub ai_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::Config(format!("{} not set", key)))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = optional("JWT_SECRET");
        if let Some(secret) = &jwt_secret {
            if secret.len() < MIN_SECRET_LEN {
                return Err(Error::Config(format!(
                    "JWT_SECRET must be at least {} characters",
                    MIN_SECRET_LEN
                )));
            }
        }
        let jwt_secret_arn = optional("JWT_SECRET_ARN");
        if jwt_secret.is_none() && jwt_secret_arn.is_none() {
            return Err(Error::Config("JWT_SECRET or JWT_SECRET_ARN must be set".to_string()));
        }

        let jwt_expires_in = parse_duration(
            &optional("JWT_EXPIRES_IN").unwrap_or_else(|| DEFAULT_JWT_EXPIRES_IN.to_string()),
        )?;

        let ai_service_url = optional("AI_SERVICE_URL");
        if let Some(url) = &ai_service_url {
            Url::parse(url).map_err(|e| Error::Config(format!("AI_SERVICE_URL is not a URL: {}", e)))?;
        }

        let ai_timeout = match optional("AI_TIMEOUT_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => return Err(Error::Config(format!("AI_TIMEOUT_MS must be a positive integer, got {}", raw))),
            },
            None => Duration::from_millis(DEFAULT_AI_TIMEOUT_MS),
        };

        Ok(Self {
            db_host: required("DATABASE_HOST")?,
            db_name: optional("DATABASE_NAME").unwrap_or_else(|| "clinic".to_string()),
            db_secret_arn: required("DATABASE_URL_SECRET_ARN")?,
            jwt_secret,
            jwt_secret_arn,
            jwt_expires_in,
            ai_service_url,
            ai_timeout,
        })
    }
}

/// Parse `90`, `45s`, `30m`, `12h` or `7d` into a duration. Bare numbers are seconds.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let invalid = || Error::Config(format!("Invalid duration: {:?}", raw));

    let (digits, unit_secs) = match raw.char_indices().last() {
        Some((idx, 's')) => (&raw[..idx], 1),
        Some((idx, 'm')) => (&raw[..idx], 60),
        Some((idx, 'h')) => (&raw[..idx], 3600),
        Some((idx, 'd')) => (&raw[..idx], 86_400),
        Some(_) => (raw, 1),
        None => return Err(invalid()),
    };

    let amount: u64 = digits.trim().parse().map_err(|_| invalid())?;
    if amount == 0 {
        return Err(invalid());
    }

    amount
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("DATABASE_HOST", "db.internal"),
        ("DATABASE_URL_SECRET_ARN", "arn:aws:secretsmanager:us-east-1:1:secret:db"),
        ("JWT_SECRET", "0123456789abcdef"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&BASE)).unwrap();

        assert_eq!(config.db_name, "clinic");
        assert_eq!(config.jwt_expires_in, Duration::from_secs(86_400));
        assert_eq!(config.ai_timeout, Duration::from_millis(3500));
        assert!(config.ai_service_url.is_none());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut pairs = BASE.to_vec();
        pairs[2] = ("JWT_SECRET", "short");
        assert!(matches!(Config::from_lookup(lookup(&pairs)), Err(Error::Config(_))));
    }

    #[test]
    fn test_secret_arn_accepted_without_inline_secret() {
        let pairs = [
            BASE[0],
            BASE[1],
            ("JWT_SECRET_ARN", "arn:aws:secretsmanager:us-east-1:1:secret:jwt"),
        ];
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert!(config.jwt_secret.is_none());
        assert!(config.jwt_secret_arn.is_some());
    }

    #[test]
    fn test_ai_settings_parsed() {
        let mut pairs = BASE.to_vec();
        pairs.push(("AI_SERVICE_URL", "http://ai-service:8000"));
        pairs.push(("AI_TIMEOUT_MS", "1200"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(config.ai_service_url.as_deref(), Some("http://ai-service:8000"));
        assert_eq!(config.ai_timeout, Duration::from_millis(1200));
    }

    #[test]
    fn test_bad_ai_url_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("AI_SERVICE_URL", "ai-service"));
        assert!(matches!(Config::from_lookup(lookup(&pairs)), Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("12h").unwrap(), Duration::from_secs(43_200));
        assert_eq!(parse_duration("7d").unwrap(), Duration::from_secs(604_800));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("0s").is_err());
    }
}
