use anyhow::{Context, Result};
use serde::Serialize;

use super::{parse_date_arg, OutputFormat, Target};
use crate::calendar::DirectoryService;
use crate::models::{BookableSlot, Service};
use crate::session::BookingSession;

/// One row of the service listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub id: String,
    pub display_name: String,
    pub duration: String,
    pub price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&Service> for ServiceSummary {
    fn from(service: &Service) -> Self {
        Self {
            id: service.id.clone(),
            display_name: service.display_name.clone(),
            duration: service.duration().to_string(),
            price: service.price_label(),
            description: service.description.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub services: Vec<ServiceSummary>,
}

impl std::fmt::Display for ServicesResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.services.is_empty() {
            return writeln!(f, "No services available for booking.");
        }
        writeln!(f, "Services:")?;
        for service in &self.services {
            writeln!(
                f,
                "  {} ({}, {})",
                service.display_name, service.duration, service.price
            )?;
        }
        Ok(())
    }
}

/// List the services customers can book
pub async fn run_services(target: &Target, format: OutputFormat) -> Result<()> {
    let (client, session) = target.resolve()?;
    let services = client
        .list_services(session.slug())
        .await
        .context("Failed to list services")?;

    let response = ServicesResponse {
        services: services
            .iter()
            .filter(|s| !s.is_hidden_from_customers)
            .map(ServiceSummary::from)
            .collect(),
    };
    format.print(&response)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsResponse {
    pub date: String,
    pub service: String,
    pub slots: Vec<BookableSlot>,
}

impl std::fmt::Display for SlotsResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let open: Vec<&BookableSlot> = self.slots.iter().filter(|s| s.available).collect();
        if open.is_empty() {
            return writeln!(f, "No available times for {} on {}.", self.service, self.date);
        }
        writeln!(f, "{} on {}:", self.service, self.date)?;
        for slot in open {
            writeln!(f, "  {}", slot.time)?;
        }
        Ok(())
    }
}

impl SlotsResponse {
    pub fn from_session(session: &BookingSession) -> Result<Self> {
        let date = session
            .selected_date()
            .context("No date selected")?;
        let service = session
            .selected_service()
            .map(|s| s.display_name.clone())
            .unwrap_or_default();
        Ok(Self {
            date: date.format("%Y-%m-%d").to_string(),
            service,
            slots: session.slots_for_selected_date()?,
        })
    }
}

/// Show the slots for one day
pub async fn run_slots(target: &Target, date: &str, format: OutputFormat) -> Result<()> {
    let date = parse_date_arg(date)?;
    let (_client, session) = target.load_date(date).await?;
    format.print(&SlotsResponse::from_session(&session)?)
}

/// Find the nearest date with an open slot and list its times
pub async fn run_nearest(target: &Target, format: OutputFormat) -> Result<()> {
    let (_client, session) = target.load().await?;
    if let Some(failure) = session.failure() {
        anyhow::bail!("{}", failure.message);
    }
    format.print(&SlotsResponse::from_session(&session)?)
}
