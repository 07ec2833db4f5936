//! Configuration loading and validation.
//!
//! Values come from environment variables layered over built-in defaults and
//! are validated once into a [`Config`], which is then passed by reference to
//! everything that needs it.
//!
//! | Variable          | Default                    |
//! |-------------------|----------------------------|
//! | `INITIAL_DELAY`   | `10s`                      |
//! | `INTERVAL`        | `1h`                       |
//! | `PUBLIC_URL`      | `http://127.0.0.1:8080/`   |
//! | `DOUBAN_ID`       | `157489011`                |
//! | `USER_AGENT`      | desktop Chrome             |
//! | `TIMEOUT`         | `10s`                      |
//! | `SAVE_DIR`        | `./tmp`                    |
//! | `INDEX_FILE_NAME` | `index.json`               |

mod duration;
pub mod error;

pub use crate::duration::parse_duration;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_INITIAL_DELAY: &str = "10s";
pub const DEFAULT_INTERVAL: &str = "1h";
pub const DEFAULT_PUBLIC_URL: &str = "http://127.0.0.1:8080/";
pub const DEFAULT_FEED_ID: &str = "157489011";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36";
pub const DEFAULT_TIMEOUT: &str = "10s";
pub const DEFAULT_SAVE_DIR: &str = "./tmp";
pub const DEFAULT_INDEX_FILE_NAME: &str = "index.json";

const ENV_KEYS: [&str; 8] = [
    "INITIAL_DELAY",
    "INTERVAL",
    "PUBLIC_URL",
    "DOUBAN_ID",
    "USER_AGENT",
    "TIMEOUT",
    "SAVE_DIR",
    "INDEX_FILE_NAME",
];

/// Validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Wait before the first cycle.
    pub initial_delay: Duration,
    /// Time between the start of consecutive cycles.
    pub interval: Duration,
    /// Base URL the save directory is served under.
    pub public_url: Url,
    /// Identity of the remote feed (a user ID).
    pub feed_id: String,
    pub user_agent: String,
    /// Per-request timeout for the feed and every cover download.
    pub timeout: Duration,
    /// Absolute path of the directory holding the index file and covers.
    pub save_dir: PathBuf,
    pub index_file_name: String,
}

/// Configuration exactly as provided, before validation.
///
/// Every field is read as a string. The environment provider parses values
/// like `157489011` as numbers, so fields accept numbers and booleans too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawConfig {
    #[serde(deserialize_with = "lenient_string")]
    pub initial_delay: String,
    #[serde(deserialize_with = "lenient_string")]
    pub interval: String,
    #[serde(deserialize_with = "lenient_string")]
    pub public_url: String,
    #[serde(rename = "douban_id", deserialize_with = "lenient_string")]
    pub feed_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub user_agent: String,
    #[serde(deserialize_with = "lenient_string")]
    pub timeout: String,
    #[serde(deserialize_with = "lenient_string")]
    pub save_dir: String,
    #[serde(deserialize_with = "lenient_string")]
    pub index_file_name: String,
}
impl Default for RawConfig {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY.to_string(),
            interval: DEFAULT_INTERVAL.to_string(),
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            feed_id: DEFAULT_FEED_ID.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT.to_string(),
            save_dir: DEFAULT_SAVE_DIR.to_string(),
            index_file_name: DEFAULT_INDEX_FILE_NAME.to_string(),
        }
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        String(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Bool(bool),
    }
    Ok(match Lenient::deserialize(deserializer)? {
        Lenient::String(s) => s,
        Lenient::Unsigned(n) => n.to_string(),
        Lenient::Signed(n) => n.to_string(),
        Lenient::Float(n) => n.to_string(),
        Lenient::Bool(b) => b.to_string(),
    })
}

impl Config {
    /// Defaults overridden by environment variables.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(RawConfig::default())).merge(Env::raw().only(&ENV_KEYS))
    }

    /// Load from the environment, validate, and create the save directory.
    pub fn load() -> Result<Self> {
        Self::from_figment(&Self::figment())
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let raw: RawConfig = figment.extract().or_raise(|| ErrorKind::Extract)?;
        Self::try_from(raw)
    }

    /// Path of the index file.
    pub fn index_path(&self) -> PathBuf {
        self.save_dir.join(&self.index_file_name)
    }

    fn prepare_save_dir(raw: &str) -> Result<PathBuf> {
        if raw.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid {
                field: "save_dir",
                value: raw.to_string(),
            });
        }
        let path = Path::new(raw);
        std::fs::create_dir_all(path).or_raise(|| ErrorKind::SaveDir(raw.to_string()))?;
        let absolute = std::path::absolute(path).or_raise(|| ErrorKind::SaveDir(raw.to_string()))?;
        tracing::debug!(save_dir = %absolute.display(), "Save directory ready");
        Ok(absolute)
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = exn::Exn<ErrorKind>;

    fn try_from(raw: RawConfig) -> Result<Self> {
        let feed_id = raw.feed_id.trim().to_string();
        if feed_id.is_empty() {
            exn::bail!(ErrorKind::Invalid {
                field: "douban_id",
                value: "(empty)".to_string(),
            });
        }
        let public_url = Url::parse(raw.public_url.trim()).or_raise(|| ErrorKind::Invalid {
            field: "public_url",
            value: raw.public_url.clone(),
        })?;
        if public_url.cannot_be_a_base() {
            exn::bail!(ErrorKind::Invalid {
                field: "public_url",
                value: raw.public_url,
            });
        }
        // The index lives directly in the save directory next to the covers.
        let index_file_name = raw.index_file_name.trim().to_string();
        if index_file_name.is_empty()
            || index_file_name.contains(['/', '\\'])
            || matches!(index_file_name.as_str(), "." | "..")
        {
            exn::bail!(ErrorKind::Invalid {
                field: "index_file_name",
                value: raw.index_file_name,
            });
        }

        Ok(Self {
            initial_delay: parse_duration("initial_delay", &raw.initial_delay)?,
            interval: non_zero("interval", parse_duration("interval", &raw.interval)?, &raw.interval)?,
            public_url,
            feed_id,
            user_agent: raw.user_agent,
            timeout: non_zero("timeout", parse_duration("timeout", &raw.timeout)?, &raw.timeout)?,
            save_dir: Self::prepare_save_dir(&raw.save_dir)?,
            index_file_name,
        })
    }
}

fn non_zero(field: &'static str, duration: Duration, raw: &str) -> Result<Duration> {
    if duration.is_zero() {
        exn::bail!(ErrorKind::Invalid {
            field,
            value: raw.to_string(),
        });
    }
    Ok(duration)
}
