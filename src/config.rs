use std::env;

use chrono::FixedOffset;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("ACADEMIC_MAX_CONNECTIONS must be a positive integer, got '{0}'")]
    InvalidMaxConnections(String),
    #[error("ACADEMIC_UTC_OFFSET must look like +HH:MM or -HH:MM, got '{0}'")]
    InvalidUtcOffset(String),
}

/// Settings read from the environment (and `.env`, when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub log_level: String,
    /// Pins "now" to this offset; the host's local zone is used when unset.
    pub utc_offset: Option<FixedOffset>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let max_connections = match lookup("ACADEMIC_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidMaxConnections(raw))?,
            None => 5,
        };

        let log_level = lookup("ACADEMIC_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let utc_offset = match lookup("ACADEMIC_UTC_OFFSET") {
            Some(raw) => Some(parse_utc_offset(&raw).ok_or(ConfigError::InvalidUtcOffset(raw))?),
            None => None,
        };

        Ok(Self {
            database_url,
            max_connections,
            log_level,
            utc_offset,
        })
    }
}

fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let value = raw.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match value.chars().next()? {
        '+' => (1, &value[1..]),
        '-' => (-1, &value[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.utc_offset, None);
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/academics"),
            ("ACADEMIC_MAX_CONNECTIONS", "12"),
            ("ACADEMIC_LOG_LEVEL", "debug"),
            ("ACADEMIC_UTC_OFFSET", "-04:00"),
        ])
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/academics"));
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.utc_offset, FixedOffset::west_opt(4 * 3600));
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            config(&[("ACADEMIC_MAX_CONNECTIONS", "0")]).unwrap_err(),
            ConfigError::InvalidMaxConnections("0".to_string())
        );
        assert_eq!(
            config(&[("ACADEMIC_UTC_OFFSET", "EST")]).unwrap_err(),
            ConfigError::InvalidUtcOffset("EST".to_string())
        );
    }

    #[test]
    fn offsets_parse() {
        assert_eq!(parse_utc_offset("+05:30"), FixedOffset::east_opt(19800));
        assert_eq!(parse_utc_offset("Z"), FixedOffset::east_opt(0));
        assert_eq!(parse_utc_offset("+25:00"), None);
    }
}
