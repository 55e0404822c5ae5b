use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{AvailabilityProvider, DirectoryService};
use crate::error::BookingError;
use crate::models::{
    AppointmentPayload, AvailabilityRecord, Business, CreatedAppointment, CustomQuestion, Service,
    StaffAvailabilityRequest,
};
use crate::retry::RetryPolicy;

/// Timeout for read-style lookups
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the booking write
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP client for the booking proxy
#[derive(Debug, Clone)]
pub struct BookingsClient {
    client: reqwest::Client,
    base_url: String,
    read_policy: RetryPolicy,
}

#[derive(Deserialize)]
struct TaskEnvelope {
    result: TaskResult,
}

#[derive(Deserialize)]
struct TaskResult {
    task: Business,
}

#[derive(Deserialize)]
struct ResultsEnvelope<T> {
    results: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

impl BookingsClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            read_policy: RetryPolicy::reads(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.read_policy = policy;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn tasks_url(&self, slug: &str) -> String {
        format!("{}/api/tasks/{}", self.base_url, urlencoding::encode(slug))
    }

    fn solutions_url(&self, slug: &str, resource: &str) -> String {
        format!(
            "{}/solutions/bookingBusinesses/{}/{}",
            self.base_url,
            urlencoding::encode(slug),
            resource
        )
    }

    /// GET with the read retry policy, returning the raw body
    async fn get_with_retry(&self, context: &str, url: &str) -> Result<String, BookingError> {
        self.read_policy
            .retry_if(
                |attempt| {
                    debug!(context, url, attempt, "GET");
                    self.send(context, self.client.get(url).timeout(READ_TIMEOUT))
                },
                BookingError::is_retryable,
            )
            .await
    }

    /// POST with the read retry policy; used for availability lookups
    async fn post_with_retry<B: Serialize + Sync>(
        &self,
        context: &str,
        url: &str,
        body: &B,
    ) -> Result<String, BookingError> {
        self.read_policy
            .retry_if(
                |attempt| {
                    debug!(context, url, attempt, "POST");
                    self.send(context, self.client.post(url).json(body).timeout(READ_TIMEOUT))
                },
                BookingError::is_retryable,
            )
            .await
    }

    async fn send(
        &self,
        context: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<String, BookingError> {
        let resp = request.send().await.map_err(|e| transport_error(context, e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| transport_error(context, e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            warn!(context, status = status.as_u16(), %message, "Upstream rejected request");
            return Err(BookingError::Upstream {
                context: context.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }
}

fn transport_error(context: &str, err: reqwest::Error) -> BookingError {
    if err.is_timeout() {
        BookingError::Timeout {
            context: context.to_string(),
        }
    } else {
        BookingError::Network {
            context: context.to_string(),
            source: err,
        }
    }
}

fn decode<T: DeserializeOwned>(context: &str, body: &str) -> Result<T, BookingError> {
    serde_json::from_str(body).map_err(|e| {
        warn!(context, error = %e, "Response failed schema validation");
        BookingError::Shape {
            context: context.to_string(),
            source: e,
        }
    })
}

#[async_trait]
impl DirectoryService for BookingsClient {
    async fn get_business(&self, slug: &str) -> Result<Business, BookingError> {
        let context = "Business info fetch";
        let body = self.get_with_retry(context, &self.tasks_url(slug)).await?;
        let envelope: TaskEnvelope = decode(context, &body)?;
        Ok(envelope.result.task)
    }

    async fn list_services(&self, slug: &str) -> Result<Vec<Service>, BookingError> {
        let context = "Services fetch";
        let url = format!("{}/services", self.tasks_url(slug));
        let body = self.get_with_retry(context, &url).await?;
        let envelope: ResultsEnvelope<Vec<Service>> = decode(context, &body)?;
        Ok(envelope.results)
    }

    async fn list_custom_questions(&self, slug: &str) -> Result<Vec<CustomQuestion>, BookingError> {
        let context = "Custom questions fetch";
        let body = self
            .get_with_retry(context, &self.solutions_url(slug, "customQuestions"))
            .await?;
        let envelope: ResultsEnvelope<Vec<CustomQuestion>> = decode(context, &body)?;
        Ok(envelope.results)
    }
}

#[async_trait]
impl AvailabilityProvider for BookingsClient {
    async fn get_staff_availability(
        &self,
        slug: &str,
        request: &StaffAvailabilityRequest,
    ) -> Result<Vec<AvailabilityRecord>, BookingError> {
        let context = "Staff availability fetch";
        let body = self
            .post_with_retry(context, &self.solutions_url(slug, "staffAvailability"), request)
            .await?;
        // A missing list means nobody is free, not a broken response.
        let envelope: ResultsEnvelope<Option<Vec<AvailabilityRecord>>> = decode(context, &body)?;
        Ok(envelope.results.unwrap_or_default())
    }

    async fn create_appointment(
        &self,
        slug: &str,
        payload: &AppointmentPayload,
    ) -> Result<CreatedAppointment, BookingError> {
        let context = "Appointment booking";
        let url = self.solutions_url(slug, "appointments");
        debug!(context, url = %url, "POST");
        let body = self
            .send(context, self.client.post(&url).json(payload).timeout(WRITE_TIMEOUT))
            .await?;
        let envelope: ResultsEnvelope<CreatedAppointment> = decode(context, &body)?;
        Ok(envelope.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CustomerDetails, ZonedDateTime};
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;
    use wiremock::{
        matchers::{body_partial_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn client_for(server: &MockServer) -> BookingsClient {
        BookingsClient::new(&server.uri()).with_retry_policy(RetryPolicy::new(3, 1, 1, 0.0))
    }

    fn business_json() -> serde_json::Value {
        json!({
            "id": "acme@example.com",
            "displayName": "Acme Repairs",
            "businessHours": [
                {"day": "monday", "timeSlots": [{"startTime": "09:00:00.0000000", "endTime": "17:00:00.0000000"}]}
            ],
            "bookingPageSettings": {"businessTimeZone": "Eastern Standard Time"}
        })
    }

    #[tokio::test]
    async fn test_get_business_unwraps_task_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/acme%40example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": {"task": business_json()}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let business = client_for(&server).get_business("acme@example.com").await.unwrap();

        assert_eq!(business.display_name, "Acme Repairs");
        assert_eq!(business.time_zone(), "Eastern Standard Time");
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_a_hard_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/acme/services"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"displayName": "Missing id"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).list_services("acme").await.unwrap_err();

        assert!(matches!(err, BookingError::Shape { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/acme"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "success": false,
                "error": "Graph unavailable"
            })))
            .expect(3)
            .mount(&server)
            .await;

        let err = client_for(&server).get_business("acme").await.unwrap_err();

        match err {
            BookingError::Upstream { status, message, .. } => {
                assert_eq!(status, 503);
                assert_eq!(message, "Graph unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/solutions/bookingBusinesses/acme/staffAvailability"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "success": false,
                "error": "Invalid request",
                "details": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = StaffAvailabilityRequest::for_week(
            &["alice".to_string()],
            NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
            "Eastern Standard Time",
        );
        let err = client_for(&server)
            .get_staff_availability("acme", &request)
            .await
            .unwrap_err();

        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_staff_availability_posts_week_window() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/solutions/bookingBusinesses/acme/staffAvailability"))
            .and(body_partial_json(json!({
                "staffIds": ["alice"],
                "startDateTime": {"dateTime": "2025-06-16T00:00:00", "timeZone": "Eastern Standard Time"},
                "endDateTime": {"dateTime": "2025-06-23T00:00:00", "timeZone": "Eastern Standard Time"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{
                    "staffId": "alice",
                    "availabilityItems": [{
                        "status": "available",
                        "startDateTime": {"dateTime": "2025-06-16T09:00:00.0000000", "timeZone": "Eastern Standard Time"},
                        "endDateTime": {"dateTime": "2025-06-16T12:00:00.0000000", "timeZone": "Eastern Standard Time"}
                    }]
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = StaffAvailabilityRequest::for_week(
            &["alice".to_string()],
            NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
            "Eastern Standard Time",
        );
        let records = client_for(&server)
            .get_staff_availability("acme", &request)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].availability_items.len(), 1);
        assert!(records[0].availability_items[0].is_available());
    }

    #[tokio::test]
    async fn test_appointment_write_is_attempted_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/solutions/bookingBusinesses/acme/appointments"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "success": false,
                "error": "Failed to create appointment"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let details = CustomerDetails {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: "555 123 4567".to_string(),
            notes: None,
            answers: Vec::new(),
        };
        let start = Utc.with_ymd_and_hms(2025, 6, 16, 14, 0, 0).unwrap();
        let payload = AppointmentPayload::new(
            "svc-1",
            &["alice".to_string()],
            start,
            start + chrono::Duration::minutes(30),
            &details,
            "Eastern Standard Time",
        );

        let err = client_for(&server)
            .create_appointment("acme", &payload)
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(err.to_string().contains("Failed to create appointment"));
    }

    #[tokio::test]
    async fn test_appointment_response_is_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/solutions/bookingBusinesses/acme/appointments"))
            .and(body_partial_json(json!({"serviceId": "svc-1", "staffMemberIds": ["alice"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "results": {
                    "id": "appt-42",
                    "serviceId": "svc-1",
                    "staffMemberIds": ["alice"],
                    "startDateTime": {"dateTime": "2025-06-16T14:00:00", "timeZone": "UTC"},
                    "endDateTime": {"dateTime": "2025-06-16T14:30:00", "timeZone": "UTC"}
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let details = CustomerDetails {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: "5551234567".to_string(),
            notes: Some("Ring twice".to_string()),
            answers: Vec::new(),
        };
        let start = Utc.with_ymd_and_hms(2025, 6, 16, 14, 0, 0).unwrap();
        let payload = AppointmentPayload::new(
            "svc-1",
            &["alice".to_string(), "bob".to_string()],
            start,
            start + chrono::Duration::minutes(30),
            &details,
            "Eastern Standard Time",
        );

        let created = client_for(&server)
            .create_appointment("acme", &payload)
            .await
            .unwrap();

        assert_eq!(created.id.as_deref(), Some("appt-42"));
        assert_eq!(
            created.start_date_time,
            ZonedDateTime {
                date_time: "2025-06-16T14:00:00".to_string(),
                time_zone: "UTC".to_string()
            }
        );
    }
}
