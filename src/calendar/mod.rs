mod bookings;
pub mod search;
pub mod slots;

pub use bookings::*;
pub use search::{
    advance_window_days, find_available_date_in_week, find_nearest_available_date,
    maximum_advance_date, SearchContext, SearchOutcome, WeekSource,
};
pub use slots::{bookable_slots, compute_slots_for_day, weekday_name};

use async_trait::async_trait;

use crate::error::BookingError;
use crate::models::{
    AppointmentPayload, AvailabilityRecord, Business, CreatedAppointment, CustomQuestion, Service,
    StaffAvailabilityRequest,
};

/// Business, service and custom-question lookup
#[async_trait]
pub trait DirectoryService: Send + Sync {
    async fn get_business(&self, slug: &str) -> Result<Business, BookingError>;

    async fn list_services(&self, slug: &str) -> Result<Vec<Service>, BookingError>;

    async fn list_custom_questions(&self, slug: &str) -> Result<Vec<CustomQuestion>, BookingError>;
}

/// Staff availability and appointment creation
#[async_trait]
pub trait AvailabilityProvider: Send + Sync {
    /// Availability records for the requested staff and window
    async fn get_staff_availability(
        &self,
        slug: &str,
        request: &StaffAvailabilityRequest,
    ) -> Result<Vec<AvailabilityRecord>, BookingError>;

    /// Create an appointment. The provider rejects conflicting writes.
    async fn create_appointment(
        &self,
        slug: &str,
        payload: &AppointmentPayload,
    ) -> Result<CreatedAppointment, BookingError>;
}

/// Everything a booking session talks to
pub trait BookingBackend: DirectoryService + AvailabilityProvider {}

impl<T: DirectoryService + AvailabilityProvider> BookingBackend for T {}
