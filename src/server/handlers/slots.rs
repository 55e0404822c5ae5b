use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::calendar::DirectoryService;
use crate::error::{BookingError, ErrorKind};
use crate::models::{BookableSlot, CustomQuestion, Service};
use crate::server::AppState;
use crate::session::BookingSession;

#[derive(Serialize)]
pub struct ServicesResponse {
    pub services: Vec<Service>,
}

/// Services customers can book
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<ServicesResponse>, BookingError> {
    let services = state.client.list_services(&slug).await?;
    Ok(Json(ServicesResponse {
        services: services
            .into_iter()
            .filter(|s| !s.is_hidden_from_customers)
            .collect(),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsResponse {
    pub service_id: String,
    pub questions: Vec<CustomQuestion>,
    pub required: Vec<String>,
}

/// Custom questions asked when booking one service
pub async fn service_questions(
    State(state): State<Arc<AppState>>,
    Path((slug, service_id)): Path<(String, String)>,
) -> Result<Json<QuestionsResponse>, BookingError> {
    let services = state.client.list_services(&slug).await?;
    let service = services
        .iter()
        .find(|s| s.id == service_id && !s.is_hidden_from_customers)
        .ok_or_else(|| BookingError::Validation(format!("Unknown service {}", service_id)))?;
    let questions = if service.custom_questions.is_empty() {
        Vec::new()
    } else {
        service.questions_from(&state.client.list_custom_questions(&slug).await?)
    };
    Ok(Json(QuestionsResponse {
        service_id,
        required: service.required_question_ids().map(str::to_string).collect(),
        questions,
    }))
}

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsResponse {
    pub date: NaiveDate,
    pub week_start: Option<NaiveDate>,
    pub service_id: String,
    pub slots: Vec<BookableSlot>,
}

impl SlotsResponse {
    fn from_session(session: &BookingSession) -> Result<Self, BookingError> {
        let date = session
            .selected_date()
            .ok_or(BookingError::MissingContext("No date selected"))?;
        let service_id = session
            .selected_service()
            .map(|s| s.id.clone())
            .unwrap_or_default();
        Ok(Self {
            date,
            week_start: session.current_week_start(),
            service_id,
            slots: session.slots_for_selected_date()?,
        })
    }
}

fn require_service(session: BookingSession, service_id: &str) -> Result<BookingSession, BookingError> {
    match session.selected_service() {
        Some(service) if service.id == service_id => Ok(session),
        _ => Err(BookingError::Validation(format!("Unknown service {}", service_id))),
    }
}

/// Slots for one day
pub async fn day_slots(
    State(state): State<Arc<AppState>>,
    Path((slug, service_id)): Path<(String, String)>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, BookingError> {
    let date = NaiveDate::parse_from_str(&query.date, "%Y-%m-%d")
        .map_err(|_| BookingError::Validation(format!("Invalid date {:?}", query.date)))?;

    let mut session = state.session(&slug, Some(&service_id));
    session.load_date(date, &state.client).await?;
    let session = require_service(session, &service_id)?;
    Ok(Json(SlotsResponse::from_session(&session)?))
}

/// Nearest bookable day and its slots
pub async fn nearest_date(
    State(state): State<Arc<AppState>>,
    Path((slug, service_id)): Path<(String, String)>,
) -> Result<Json<SlotsResponse>, BookingError> {
    let mut session = state.session(&slug, Some(&service_id));
    session.load(&state.client).await?;
    let session = require_service(session, &service_id)?;
    if let Some(failure) = session.failure() {
        if failure.kind == ErrorKind::Exhausted {
            return Err(BookingError::NoAvailability);
        }
    }
    Ok(Json(SlotsResponse::from_session(&session)?))
}
