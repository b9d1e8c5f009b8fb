//! Backend argument-string utilities
//!
//! Authentication backends receive their source-specific settings as a
//! semicolon-separated `key=value` string (for example
//! `Servers=ldap1,ldap2;BindFormat=Email;MaxCacheTime=5m`). Keys are
//! compared case-insensitively. The engine-reserved keys listed in
//! [`RESERVED_KEYS`] are consumed by the realm mapping layer; backends
//! skip them when vetting their arguments.

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use thiserror::Error;

/// Keys consumed by the realm mapping layer. These are never forwarded to
/// backend-specific connection builders.
pub const RESERVED_KEYS: [&str; 4] = [
    "MaxCacheTime",
    "LockoutCount",
    "LockoutThreshold",
    "LockoutTime",
];

static ENV_MACRO_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\(([A-Za-z_][A-Za-z0-9_]*)\)").unwrap());

/// Errors raised while parsing argument strings and their values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgParseError {
    #[error("malformed argument pair '{pair}' (expected key=value)")]
    MalformedPair { pair: String },

    #[error("invalid value '{value}' for argument '{key}' (expected {expected})")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

/// Expand `$(NAME)` environment-variable macros inside a string.
///
/// Unknown variables are left intact so a missing macro surfaces in the
/// downstream component's own validation rather than as an empty value.
pub fn expand_env_macros(input: &str) -> String {
    ENV_MACRO_REGEX
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Parse a duration value: a bare integer is seconds, and the suffixes
/// `ms`, `s`, `m`, `h`, `d` select a unit (`5m`, `10s`, `250ms`).
pub fn parse_duration(value: &str) -> Result<Duration, ArgParseError> {
    let value = value.trim();
    let invalid = || ArgParseError::InvalidValue {
        key: String::new(),
        value: value.to_string(),
        expected: "a duration such as 30, 10s, 5m, 1h",
    };

    let (digits, unit) = match value.find(|c: char| !c.is_ascii_digit()) {
        Some(split) => value.split_at(split),
        None => (value, ""),
    };
    let amount: u64 = digits.parse().map_err(|_| invalid())?;

    let duration = match unit {
        "" | "s" => Duration::from_secs(amount),
        "ms" => Duration::from_millis(amount),
        "m" => Duration::from_secs(amount * 60),
        "h" => Duration::from_secs(amount * 3600),
        "d" => Duration::from_secs(amount * 86_400),
        _ => return Err(invalid()),
    };
    Ok(duration)
}

/// Ordered, case-insensitive collection of `key=value` backend arguments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgMap {
    entries: Vec<(String, String)>,
}

impl ArgMap {
    /// Create an empty argument map
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a semicolon-separated `key=value` string. Empty segments are
    /// skipped; a segment without `=` is an error.
    pub fn parse(input: &str) -> Result<Self, ArgParseError> {
        let mut entries = Vec::new();
        for segment in input.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| ArgParseError::MalformedPair {
                    pair: segment.to_string(),
                })?;
            entries.push((key.trim().to_string(), value.trim().to_string()));
        }
        Ok(Self { entries })
    }

    /// Look up a value by case-insensitive key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the map contains the given key
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Interpret a value as a boolean (`true`/`false`, `yes`/`no`, `on`/`off`, `1`/`0`)
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ArgParseError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Some(true)),
                "false" | "no" | "off" | "0" => Ok(Some(false)),
                _ => Err(ArgParseError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    expected: "a boolean",
                }),
            },
        }
    }

    /// Interpret a value as an unsigned integer
    pub fn get_u32(&self, key: &str) -> Result<Option<u32>, ArgParseError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| ArgParseError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    expected: "an unsigned integer",
                }),
        }
    }

    /// Interpret a value as a duration (see [`parse_duration`])
    pub fn get_duration(&self, key: &str) -> Result<Option<Duration>, ArgParseError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => parse_duration(value).map(Some).map_err(|_| {
                ArgParseError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    expected: "a duration such as 30, 10s, 5m, 1h",
                }
            }),
        }
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
