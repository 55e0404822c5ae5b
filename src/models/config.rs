use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which wall clock lead-time and "today" comparisons are made against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClockSource {
    /// The machine running the session, i.e. the customer's clock
    #[default]
    Customer,
    /// The business's configured time zone
    Business,
}

impl ClockSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClockSource::Customer => "customer",
            ClockSource::Business => "business",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(ClockSource::Customer),
            "business" => Some(ClockSource::Business),
            _ => None,
        }
    }
}

impl std::fmt::Display for ClockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration stored locally for the CLI and server
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LocalConfig {
    /// Base URL of the booking proxy
    pub api_url: Option<String>,
    /// Default business slug
    pub business: Option<String>,
    /// Default service display name
    pub service: Option<String>,
    #[serde(default)]
    pub clock: ClockSource,
}

impl LocalConfig {
    pub fn config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".config")
            .join("bookd")
            .join("config.json")
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Self::config_path())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(Self::config_path())
    }

    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Flag, then `BOOKD_API_URL`, then this file, then the default
    pub fn resolve_api_url(&self, flag: Option<&str>) -> anyhow::Result<String> {
        let raw = flag
            .map(str::to_string)
            .or_else(|| std::env::var("BOOKD_API_URL").ok())
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| crate::DEFAULT_API_URL.to_string());
        let parsed = url::Url::parse(&raw)
            .map_err(|e| anyhow::anyhow!("Invalid API URL {:?}: {}", raw, e))?;
        Ok(parsed.as_str().trim_end_matches('/').to_string())
    }

    /// Flag, then `BOOKD_BUSINESS`, then this file
    pub fn resolve_business(&self, flag: Option<&str>) -> anyhow::Result<String> {
        flag.map(str::to_string)
            .or_else(|| std::env::var("BOOKD_BUSINESS").ok())
            .or_else(|| self.business.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("No business configured. Pass --business or run 'bookd config business <slug>'.")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = LocalConfig {
            api_url: Some("https://bookings.example.com".to_string()),
            business: Some("acme@example.com".to_string()),
            service: Some("Repair".to_string()),
            clock: ClockSource::Business,
        };
        config.save_to(&path).unwrap();

        assert_eq!(LocalConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = LocalConfig::load_from(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, LocalConfig::default());
        assert_eq!(config.clock, ClockSource::Customer);
    }

    #[test]
    fn test_flag_wins_and_trailing_slash_is_trimmed() {
        let config = LocalConfig {
            api_url: Some("https://file.example.com".to_string()),
            ..Default::default()
        };
        let url = config
            .resolve_api_url(Some("https://flag.example.com/"))
            .unwrap();
        assert_eq!(url, "https://flag.example.com");
        assert!(config.resolve_api_url(Some("not a url")).is_err());
        assert_eq!(
            config.resolve_business(Some("acme")).unwrap(),
            "acme"
        );
    }

    #[test]
    fn test_clock_source_parse() {
        assert_eq!(ClockSource::parse("business"), Some(ClockSource::Business));
        assert_eq!(ClockSource::parse("browser"), None);
    }
}
