//! Configuration for a sync run, loadable from TOML.
//!
//! Every field has a default, so a config file only needs the keys it changes:
//!
//! ```toml
//! [site]
//! base_url = "https://join.gov.tw"
//!
//! [sync]
//! limit = 50
//! delay_ms = 2000
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::FixedOffset;
use serde::Deserialize;

use crate::extract::{ExtractError, Extractor, DEFAULT_PAYLOAD_PATTERN};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid utc_offset '{0}', expected +HH:MM or -HH:MM")]
    InvalidOffset(String),
    #[error(transparent)]
    InvalidPattern(#[from] ExtractError),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub site: SiteConfig,
    pub sync: SyncConfig,
}

/// Where the petition site lives and how to read it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub base_url: String,
    /// Search endpoint; the size parameter is appended to its query string.
    pub search_path: String,
    pub size_param: String,
    /// JSON pointer to the hit array in the search response.
    pub hits_pointer: String,
    pub id_field: String,
    pub title_field: String,
    /// Detail page path, `{id}` is replaced with the proposal id.
    pub detail_path: String,
    pub payload_pattern: String,
    /// Timezone the site's naive timestamps are in.
    pub utc_offset: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://join.gov.tw".to_string(),
            search_path: "/joinComments/api/proposals/search".to_string(),
            size_param: "size".to_string(),
            hits_pointer: "/result".to_string(),
            id_field: "id".to_string(),
            title_field: "title".to_string(),
            detail_path: "/idea/detail/{id}".to_string(),
            payload_pattern: DEFAULT_PAYLOAD_PATTERN.to_string(),
            utc_offset: "+08:00".to_string(),
            user_agent: concat!("petition-sync/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// How many of the newest proposals to ask for.
    pub limit: usize,
    /// Pause before every detail request.
    pub delay_ms: u64,
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            limit: 20,
            delay_ms: 1000,
            data_dir: PathBuf::from("data"),
            log_file: PathBuf::from("proposals.log"),
        }
    }
}

impl SyncConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Config {
    /// Reads `path` if given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                tracing::info!("read config from '{}'", path.display());
                Self::from_toml(&text)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.limit == 0 {
            return Err(ConfigError::Invalid("sync.limit must be at least 1".into()));
        }
        if !self.site.detail_path.contains("{id}") {
            return Err(ConfigError::Invalid(format!(
                "site.detail_path '{}' has no {{id}} placeholder",
                self.site.detail_path
            )));
        }
        self.extractor()?;
        Ok(())
    }

    pub fn extractor(&self) -> Result<Extractor, ConfigError> {
        let offset = parse_utc_offset(&self.site.utc_offset)?;
        Ok(Extractor::new(&self.site.payload_pattern, offset)?)
    }
}

/// Parses `+HH:MM` / `-HH:MM`.
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = || ConfigError::InvalidOffset(s.to_string());
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let is_two_digits = |field: &str| field.len() == 2 && field.bytes().all(|b| b.is_ascii_digit());
    if !is_two_digits(hours) || !is_two_digits(minutes) {
        return Err(invalid());
    }
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.sync.limit, 20);
        assert_eq!(config.sync.delay(), Duration::from_secs(1));
        assert_eq!(
            config.extractor().unwrap().utc_offset(),
            FixedOffset::east_opt(8 * 3600).unwrap()
        );
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [site]
            base_url = "http://localhost:8080"

            [sync]
            limit = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.site.base_url, "http://localhost:8080");
        assert_eq!(config.site.detail_path, "/idea/detail/{id}");
        assert_eq!(config.sync.limit, 5);
        assert_eq!(config.sync.delay_ms, 1000);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml("[sync]\nlimt = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.sync.limit = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.site.detail_path = "/idea/detail".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.site.payload_pattern = "no group".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPattern(_))
        ));

        let mut config = Config::default();
        config.site.utc_offset = "Asia/Taipei".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOffset(_))
        ));
    }

    #[test]
    fn utc_offsets() {
        assert_eq!(
            parse_utc_offset("-05:30").unwrap(),
            FixedOffset::west_opt(5 * 3600 + 30 * 60).unwrap()
        );
        assert_eq!(
            parse_utc_offset("+00:00").unwrap(),
            FixedOffset::east_opt(0).unwrap()
        );
        for bad in [
            "08:00", "+8:00", "+08", "+08:60", "+24:00", "", "+-1:00", "+08:-5", "+ 8:00",
        ] {
            assert!(parse_utc_offset(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/petition-sync.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
