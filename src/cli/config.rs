use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use super::{OutputFormat, SuccessResponse};
use crate::models::{ClockSource, LocalConfig};

/// Config show response
#[derive(Debug, Serialize)]
pub struct ConfigShowResponse {
    pub path: String,
    pub api_url: String,
    pub business: Option<String>,
    pub service: Option<String>,
    pub clock: String,
}

impl std::fmt::Display for ConfigShowResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Config file: {}", self.path)?;
        writeln!(f, "API URL: {}", self.api_url)?;
        writeln!(
            f,
            "Business: {}",
            self.business.as_deref().unwrap_or("not set")
        )?;
        writeln!(
            f,
            "Service: {}",
            self.service.as_deref().unwrap_or("first listed")
        )?;
        write!(f, "Clock: {}", self.clock)
    }
}

/// Show the effective configuration
pub fn run_config_show(api_url_flag: Option<&str>, format: OutputFormat) -> Result<()> {
    let path = LocalConfig::config_path();
    let config = LocalConfig::load_from(&path)?;
    format.print(&show_config(&config, &path, api_url_flag)?)
}

fn show_config(config: &LocalConfig, path: &Path, api_url_flag: Option<&str>) -> Result<ConfigShowResponse> {
    Ok(ConfigShowResponse {
        path: path.display().to_string(),
        api_url: config.resolve_api_url(api_url_flag)?,
        business: config.resolve_business(None).ok(),
        service: config.service.clone(),
        clock: config.clock.to_string(),
    })
}

/// Which stored setting to change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigUpdate {
    ApiUrl(String),
    Business(String),
    Service(Option<String>),
    Clock(String),
}

/// Apply a change to the local config file
pub fn run_config_set(update: ConfigUpdate, format: OutputFormat) -> Result<()> {
    let path = LocalConfig::config_path();
    let mut config = LocalConfig::load_from(&path).unwrap_or_default();
    let message = apply_update(&mut config, update)?;
    config.save_to(&path)?;
    format.print(&SuccessResponse { message })
}

fn apply_update(config: &mut LocalConfig, update: ConfigUpdate) -> Result<String> {
    let message = match update {
        ConfigUpdate::ApiUrl(url) => {
            let url = config.resolve_api_url(Some(&url))?;
            config.api_url = Some(url.clone());
            format!("API URL set to: {}", url)
        }
        ConfigUpdate::Business(slug) => {
            config.business = Some(slug.clone());
            format!("Business set to: {}", slug)
        }
        ConfigUpdate::Service(Some(name)) => {
            config.service = Some(name.clone());
            format!("Service set to: {}", name)
        }
        ConfigUpdate::Service(None) => {
            config.service = None;
            "Service cleared; the first listed service will be used".to_string()
        }
        ConfigUpdate::Clock(source) => {
            let clock = ClockSource::parse(&source)
                .ok_or_else(|| anyhow::anyhow!("Invalid clock. Use: customer or business"))?;
            config.clock = clock;
            format!("Clock set to: {}", clock)
        }
    };
    Ok(message)
}
