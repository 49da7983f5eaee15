use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use autosnap_core::policy::{DEFAULT_DAYS, DEFAULT_MONTHS, DEFAULT_WEEKS};
use autosnap_core::RetentionPolicy;
use autosnap_gateway::lightsail::DEFAULT_REGION;
use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

/// Optional TOML file. Every value can also come from the environment, which wins.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub backup: BackupConfig,
    pub provider: ProviderConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct BackupConfig {
    pub instances: Option<Vec<String>>,
    pub days: Option<i64>,
    pub weeks: Option<i64>,
    pub months: Option<i64>,
    pub utc_offset: Option<String>,
    pub concurrency: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("BACKUP_INSTANCES must list at least one instance")]
    NoInstances,
    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("BACKUP_UTC_OFFSET must look like +02:00 or -0530, got {0:?}")]
    InvalidOffset(String),
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub instances: Vec<String>,
    pub policy: RetentionPolicy,
    pub utc_offset: FixedOffset,
    pub concurrency: usize,
    pub region: String,
    pub endpoint: Option<String>,
    pub max_attempts: u32,
}

impl Settings {
    /// Merge `cfg` with values from `lookup` (normally the process environment).
    pub fn resolve<F>(cfg: &Config, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let instances = match lookup("BACKUP_INSTANCES") {
            Some(raw) => parse_instances(&raw),
            None => cfg
                .backup
                .instances
                .iter()
                .flatten()
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect(),
        };
        if instances.is_empty() {
            return Err(ConfigError::NoInstances);
        }

        let days = number(&lookup, "BACKUP_DAYS", cfg.backup.days, DEFAULT_DAYS)?;
        let weeks = number(&lookup, "BACKUP_WEEKS", cfg.backup.weeks, DEFAULT_WEEKS)?;
        let months = number(&lookup, "BACKUP_MONTHS", cfg.backup.months, DEFAULT_MONTHS)?;

        let utc_offset = match lookup("BACKUP_UTC_OFFSET").or_else(|| cfg.backup.utc_offset.clone())
        {
            Some(raw) => parse_offset(&raw)?,
            None => Utc.fix(),
        };

        let concurrency = match lookup("BACKUP_CONCURRENCY") {
            Some(raw) => parse_count("BACKUP_CONCURRENCY", &raw)?,
            None => cfg.backup.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
        }
        .max(1);

        let max_attempts = match lookup("BACKUP_MAX_ATTEMPTS") {
            Some(raw) => parse_count("BACKUP_MAX_ATTEMPTS", &raw)?,
            None => cfg.provider.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
        }
        .max(1);

        Ok(Self {
            instances,
            policy: RetentionPolicy::new(days, weeks, months),
            utc_offset,
            concurrency,
            region: lookup("AWS_REGION")
                .or_else(|| cfg.provider.region.clone())
                .unwrap_or_else(|| DEFAULT_REGION.to_owned()),
            endpoint: lookup("LIGHTSAIL_ENDPOINT").or_else(|| cfg.provider.endpoint.clone()),
            max_attempts,
        })
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading config file {path:?}"))?;
    toml::from_str(&contents).with_context(|| format!("parsing config file {path:?}"))
}

fn parse_instances(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn number<F>(lookup: &F, key: &'static str, file: Option<i64>, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match lookup(key) {
        Some(raw) => raw.trim().parse::<i64>().map_err(|_| ConfigError::InvalidNumber {
            key,
            value: raw.clone(),
        })?,
        None => file.unwrap_or(default),
    };
    if value < 0 {
        return Err(ConfigError::InvalidNumber {
            key,
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn parse_count<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: raw.to_owned(),
    })
}

/// Accepts `Z`, `+HH:MM`, `-HH:MM`, `+HHMM` and `+HH`.
fn parse_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = || ConfigError::InvalidOffset(raw.to_owned());
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'+') => (1, &trimmed[1..]),
        Some(b'-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().map_err(|_| invalid())?, 0),
        4 => (
            digits[..2].parse::<i32>().map_err(|_| invalid())?,
            digits[2..].parse::<i32>().map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
