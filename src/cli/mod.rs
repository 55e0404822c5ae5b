mod book;
mod config;
mod questions;
mod slots;
mod timezone;

pub use book::*;
pub use config::*;
pub use questions::*;
pub use slots::*;
pub use timezone::*;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::BookingsClient;
use crate::models::LocalConfig;
use crate::session::BookingSession;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn print<T: Serialize + std::fmt::Display>(&self, value: &T) -> Result<()> {
        match self {
            OutputFormat::Human => println!("{}", value),
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(value)?);
            }
        }
        Ok(())
    }
}

/// Success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

impl std::fmt::Display for SuccessResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Connection settings shared by every command that talks to the proxy
#[derive(Debug, Clone, Default)]
pub struct Target {
    pub api_url: Option<String>,
    pub business: Option<String>,
    pub service: Option<String>,
}

impl Target {
    /// Resolve flags against the environment and the local config file
    pub fn resolve(&self) -> Result<(BookingsClient, BookingSession)> {
        let config = LocalConfig::load().unwrap_or_default();
        let api_url = config.resolve_api_url(self.api_url.as_deref())?;
        let business = config.resolve_business(self.business.as_deref())?;
        let service = self.service.clone().or(config.service);

        let client = BookingsClient::new(&api_url);
        let session = BookingSession::new(&business, service.as_deref(), config.clock);
        Ok((client, session))
    }

    /// Resolve and load a session, failing on anything but a browsable state
    pub async fn load(&self) -> Result<(BookingsClient, BookingSession)> {
        let (client, mut session) = self.resolve()?;
        session
            .load(&client)
            .await
            .with_context(|| format!("Failed to load booking options for {}", session.slug()))?;
        Ok((client, session))
    }

    /// Resolve a session and show `date` without searching for the nearest day
    pub async fn load_date(&self, date: NaiveDate) -> Result<(BookingsClient, BookingSession)> {
        let (client, mut session) = self.resolve()?;
        session
            .load_date(date, &client)
            .await
            .with_context(|| format!("Failed to load {} for {}", date, session.slug()))?;
        Ok((client, session))
    }
}

/// Parse a "YYYY-MM-DD" argument
pub fn parse_date_arg(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date {:?}. Use YYYY-MM-DD", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_arg() {
        assert_eq!(
            parse_date_arg(" 2025-06-16 ").unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
        );
        assert!(parse_date_arg("16/06/2025").is_err());
    }
}
