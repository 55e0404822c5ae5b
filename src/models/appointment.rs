use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::availability::{format_naive, ZonedDateTime};
use super::service::CustomQuestion;

/// Answer to a business custom question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnswer {
    pub question_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default)]
    pub selected_options: Vec<String>,
    pub answer_input_type: String,
}

impl QuestionAnswer {
    /// Answer `question` with `value`. Choice questions only accept one of their options.
    pub fn for_question(question: &CustomQuestion, value: &str) -> Result<Self, String> {
        let value = value.trim();
        let selected_options = if question.answer_options.is_empty() {
            Vec::new()
        } else {
            let option = question
                .answer_options
                .iter()
                .find(|option| option.eq_ignore_ascii_case(value))
                .ok_or_else(|| {
                    format!(
                        "{:?} is not an option for {:?} ({})",
                        value,
                        question.display_name,
                        question.answer_options.join(", ")
                    )
                })?;
            vec![option.clone()]
        };
        Ok(Self {
            question_id: question.id.clone(),
            answer: Some(selected_options.first().map(String::as_str).unwrap_or(value).to_string()),
            selected_options,
            answer_input_type: question.answer_input_type.clone(),
        })
    }

    pub fn is_blank(&self) -> bool {
        self.answer.as_deref().map_or(true, |a| a.trim().is_empty()) && self.selected_options.is_empty()
    }
}

/// Customer block of an appointment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentCustomer {
    pub name: String,
    pub email_address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub custom_question_answers: Vec<QuestionAnswer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Customer's zone in the business naming convention
    pub time_zone: String,
}

/// Appointment creation body sent to the availability provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPayload {
    pub service_id: String,
    pub staff_member_ids: Vec<String>,
    pub start_date_time: ZonedDateTime,
    pub end_date_time: ZonedDateTime,
    #[serde(default)]
    pub is_customer_allowed_to_manage_booking: bool,
    #[serde(default)]
    pub opt_out_of_customer_email: bool,
    #[serde(default)]
    pub is_self_service_enabled: bool,
    #[serde(default)]
    pub customer_notes: String,
    #[serde(default)]
    pub service_notes: String,
    pub customers: Vec<AppointmentCustomer>,
}

/// Contact details collected from the booking form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: Option<String>,
    /// Answers to the service's custom questions
    #[serde(default)]
    pub answers: Vec<QuestionAnswer>,
}

impl CustomerDetails {
    /// Reject details the provider would refuse anyway
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Name is required".to_string());
        }
        let email = self.email.trim();
        let valid_email = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !email.contains(char::is_whitespace)
            }
            None => false,
        };
        if !valid_email {
            return Err("Please enter a valid email address".to_string());
        }
        Ok(())
    }

    /// Whether a non-blank answer was given for `question_id`
    pub fn has_answer(&self, question_id: &str) -> bool {
        self.answers
            .iter()
            .any(|a| a.question_id == question_id && !a.is_blank())
    }

    /// Phone number reduced to its digits
    pub fn phone_digits(&self) -> String {
        self.phone.chars().filter(|c| c.is_ascii_digit()).collect()
    }
}

impl AppointmentPayload {
    /// Build a payload for one customer. Only the first staff id is submitted.
    pub fn new(
        service_id: &str,
        staff_ids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        customer: &CustomerDetails,
        customer_time_zone: &str,
    ) -> Self {
        let notes = customer.notes.clone().unwrap_or_default();
        Self {
            service_id: service_id.to_string(),
            staff_member_ids: staff_ids.iter().take(1).cloned().collect(),
            start_date_time: utc_wall_clock(start),
            end_date_time: utc_wall_clock(end),
            is_customer_allowed_to_manage_booking: true,
            opt_out_of_customer_email: false,
            is_self_service_enabled: true,
            service_notes: format!("Customer note: {}", notes),
            customer_notes: notes,
            customers: vec![AppointmentCustomer {
                name: customer.name.trim().to_string(),
                email_address: customer.email.trim().to_string(),
                phone: customer.phone_digits(),
                custom_question_answers: customer.answers.clone(),
                notes: None,
                time_zone: customer_time_zone.to_string(),
            }],
        }
    }
}

fn utc_wall_clock(instant: DateTime<Utc>) -> ZonedDateTime {
    ZonedDateTime {
        date_time: format_naive(instant.naive_utc()),
        time_zone: "UTC".to_string(),
    }
}

/// Appointment as echoed back by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAppointment {
    #[serde(default)]
    pub id: Option<String>,
    pub service_id: String,
    #[serde(default)]
    pub staff_member_ids: Vec<String>,
    pub start_date_time: ZonedDateTime,
    pub end_date_time: ZonedDateTime,
    #[serde(default)]
    pub customers: Vec<AppointmentCustomer>,
}
