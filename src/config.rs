//! Server configuration and the selection options derived from it.
//!
//! Configuration files hold `key = value` lines; blank lines and lines
//! starting with `#` are ignored. Values read from a file can be replaced by
//! an environment variable with the upper-cased key, then by explicit
//! overrides. Nothing here is global: callers load a [Config] and pass the
//! [SelectionOptions] they derive from it.

use std::{collections::BTreeMap, fmt, fs, io, path::Path};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key controlling whether `[]` is accepted as an index list.
pub const ALLOW_EMPTY_INDEX_LIST_KEY: &str = "hs_allow_empty_index_list";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read configuration")]
    Io(#[from] io::Error),
    #[error("Invalid value for configuration key '{key}': '{value}'")]
    InvalidValue { key: String, value: String },
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Config {
    values: BTreeMap<String, String>,
}

impl Config {
    /// Parse `key = value` lines. Lines without `=` are logged and skipped.
    pub fn parse_str(text: &str) -> Self {
        let mut values = BTreeMap::default();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                warn!("Skipping invalid config line {}: {:?}", idx + 1, line);
                continue;
            };
            values.insert(key.trim().to_owned(), value.trim().to_owned());
        }
        Self { values }
    }

    /// Read a configuration file. A missing file gives an empty configuration.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match fs::read_to_string(path.as_ref()) {
            Ok(text) => Ok(Self::parse_str(&text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No config file at {}", path.as_ref().display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace values of already-known keys with environment variables
    /// named by the upper-cased key.
    pub fn with_env_overrides<I>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env: BTreeMap<String, String> = env.into_iter().collect();
        for (key, value) in self.values.iter_mut() {
            if let Some(v) = env.get(&key.to_uppercase()) {
                info!("Config '{}' overridden from environment", key);
                *value = v.clone();
            }
        }
        self
    }

    /// Set values unconditionally, adding keys which were not present.
    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in overrides {
            self.values.insert(k.into(), v.into());
        }
        self
    }

    /// File, then environment, then explicit overrides.
    pub fn load<P, E, I, K, V>(path: P, env: E, overrides: I) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        E: IntoIterator<Item = (String, String)>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Ok(Self::from_file(path)?
            .with_env_overrides(env)
            .with_overrides(overrides))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Interpret a value as a boolean: true/false, yes/no or 1/0.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Some(true)),
            "false" | "no" | "0" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_owned(),
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_string(&self.values).map_err(|_| fmt::Error)?;
        write!(f, "{}", s)
    }
}

/// Options which change how index arguments are parsed.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct SelectionOptions {
    allow_empty_index_list: bool,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            allow_empty_index_list: true,
        }
    }
}

impl SelectionOptions {
    /// Whether `[]` selects nothing (true) or is a malformed argument (false).
    pub fn allow_empty_index_list(&self) -> bool {
        self.allow_empty_index_list
    }

    pub fn set_allow_empty_index_list(&mut self, allow: bool) -> &mut Self {
        self.allow_empty_index_list = allow;
        self
    }

    pub fn with_allow_empty_index_list(mut self, allow: bool) -> Self {
        self.allow_empty_index_list = allow;
        self
    }

    /// Options from a loaded configuration; absent keys keep their defaults.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut out = Self::default();
        if let Some(allow) = config.get_bool(ALLOW_EMPTY_INDEX_LIST_KEY)? {
            out.set_allow_empty_index_list(allow);
        }
        Ok(out)
    }
}
