use std::{env, fmt::Display, str::FromStr};

use chrono::Offset;

use crate::prelude::*;

const DEFAULT_DATABASE_URL: &str = "sqlite:shots.db?mode=rwc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimit {
  /// Seconds to replenish one request of the burst
  pub per_second: u64,
  pub burst: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub port: u16,
  /// Allowed CORS origin. Any origin, without credentials, when unset
  pub cors_origin: Option<String>,
  pub jwt_secret: String,
  pub token_ttl: Duration,
  pub query_timeout: Duration,
  /// Offset used to place day, week and month boundaries
  pub stats_offset: FixedOffset,
  pub body_limit: usize,
  pub graceful_shutdown: bool,
  pub rate_limit: RateLimit,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: String::from(DEFAULT_DATABASE_URL),
      port: 4000,
      cors_origin: None,
      jwt_secret: String::new(),
      token_ttl: Duration::from_secs(24 * 3600),
      query_timeout: Duration::from_secs(5),
      stats_offset: Utc.fix(),
      body_limit: 100 * 1024,
      graceful_shutdown: true,
      rate_limit: RateLimit { per_second: 2, burst: 100 },
    }
  }
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    Self::from_source(|key| env::var(key).ok())
  }

  pub fn from_source(
    var: impl Fn(&str) -> Option<String>,
  ) -> anyhow::Result<Self> {
    let defaults = Self::default();

    let jwt_secret = var("JWT_SECRET")
      .filter(|secret| !secret.trim().is_empty())
      .context("JWT_SECRET not set")?;

    Ok(Self {
      database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
      port: parse(&var, "PORT", defaults.port)?,
      cors_origin: var("FRONTEND_URL").filter(|url| !url.trim().is_empty()),
      jwt_secret,
      token_ttl: duration(&var, "TOKEN_TTL", defaults.token_ttl)?,
      query_timeout: duration(&var, "QUERY_TIMEOUT", defaults.query_timeout)?,
      stats_offset: parse(&var, "STATS_UTC_OFFSET", defaults.stats_offset)?,
      body_limit: parse(&var, "BODY_LIMIT", defaults.body_limit)?,
      graceful_shutdown: parse(
        &var,
        "GRACEFUL_SHUTDOWN",
        defaults.graceful_shutdown,
      )?,
      rate_limit: RateLimit {
        per_second: parse(
          &var,
          "RATE_LIMIT_PER_SECOND",
          defaults.rate_limit.per_second,
        )?,
        burst: parse(&var, "RATE_LIMIT_BURST", defaults.rate_limit.burst)?,
      },
    })
  }
}

fn parse<T>(
  var: &impl Fn(&str) -> Option<String>,
  key: &str,
  default: T,
) -> anyhow::Result<T>
where
  T: FromStr + Display,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  match var(key) {
    Some(raw) => {
      raw.trim().parse().with_context(|| format!("Invalid {key} value: {raw}"))
    }
    None => {
      debug!("{key} not set, using default: {default}");
      Ok(default)
    }
  }
}

fn duration(
  var: &impl Fn(&str) -> Option<String>,
  key: &str,
  default: Duration,
) -> anyhow::Result<Duration> {
  match var(key) {
    Some(raw) => humantime::parse_duration(raw.trim())
      .with_context(|| format!("Invalid {key} value: {raw}")),
    None => Ok(default),
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
    let vars: HashMap<String, String> = pairs
      .iter()
      .map(|(key, value)| (key.to_string(), value.to_string()))
      .collect();
    Config::from_source(|key| vars.get(key).cloned())
  }

  #[test]
  fn test_defaults() {
    let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();

    assert_eq!(config.port, 4000);
    assert_eq!(config.jwt_secret, "s3cret");
    assert_eq!(config.token_ttl, Duration::from_secs(86400));
    assert_eq!(config.stats_offset.local_minus_utc(), 0);
    assert!(config.cors_origin.is_none());
    assert!(config.graceful_shutdown);
  }

  #[test]
  fn test_missing_secret_is_fatal() {
    assert!(load(&[]).is_err());
    assert!(load(&[("JWT_SECRET", "  ")]).is_err());
  }

  #[test]
  fn test_overrides() {
    let config = load(&[
      ("JWT_SECRET", "s3cret"),
      ("PORT", "8080"),
      ("FRONTEND_URL", "https://example.com"),
      ("TOKEN_TTL", "2h"),
      ("QUERY_TIMEOUT", "250ms"),
      ("STATS_UTC_OFFSET", "+02:00"),
      ("GRACEFUL_SHUTDOWN", "false"),
      ("RATE_LIMIT_BURST", "10"),
    ])
    .unwrap();

    assert_eq!(config.port, 8080);
    assert_eq!(config.cors_origin.as_deref(), Some("https://example.com"));
    assert_eq!(config.token_ttl, Duration::from_secs(7200));
    assert_eq!(config.query_timeout, Duration::from_millis(250));
    assert_eq!(config.stats_offset.local_minus_utc(), 7200);
    assert!(!config.graceful_shutdown);
    assert_eq!(config.rate_limit.burst, 10);
  }

  #[test]
  fn test_malformed_value_rejected() {
    assert!(load(&[("JWT_SECRET", "s"), ("PORT", "http")]).is_err());
    assert!(load(&[("JWT_SECRET", "s"), ("TOKEN_TTL", "soon")]).is_err());
  }
}
