use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::calendar::{
    compute_slots_for_day, find_nearest_available_date, maximum_advance_date, AvailabilityProvider,
    BookingBackend, SearchContext, WeekSource,
};
use crate::error::{BookingError, ErrorKind};
use crate::models::{
    select_service, AppointmentPayload, AvailabilityRecord, BookableSlot, Business, ClockSource,
    CreatedAppointment, CustomQuestion, CustomerDetails, QuestionAnswer, Service,
    StaffAvailabilityRequest,
};
use crate::retry::RetryPolicy;
use crate::timezone::{
    customer_time_zone, resolve_customer_timezone_note, resolve_tz, CustomerZone, SchedulingClock,
    TimezoneNote,
};

/// Reloads allowed from the error state before a reset is required
pub const MAX_SESSION_RETRIES: u32 = 3;

/// Extra booking attempts allowed after the first one fails
pub const MAX_SUBMIT_RETRIES: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Loading,
    Error,
    Browsing,
    SlotSelected,
    Form,
    Confirmed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Loading => "loading",
            SessionPhase::Error => "error",
            SessionPhase::Browsing => "browsing",
            SessionPhase::SlotSelected => "slot_selected",
            SessionPhase::Form => "form",
            SessionPhase::Confirmed => "confirmed",
        }
    }
}

/// Last user-facing failure recorded on the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&BookingError> for SessionFailure {
    fn from(err: &BookingError) -> Self {
        let message = match err.kind() {
            ErrorKind::DataShape => "Could not load booking information.".to_string(),
            _ => err.to_string(),
        };
        Self {
            kind: err.kind(),
            message,
        }
    }
}

/// Fetches weeks of availability for the selected service
pub struct ServiceWeekSource<'a, P: ?Sized> {
    pub provider: &'a P,
    pub slug: &'a str,
    pub staff_ids: &'a [String],
    pub time_zone: &'a str,
}

#[async_trait]
impl<P> WeekSource for ServiceWeekSource<'_, P>
where
    P: AvailabilityProvider + ?Sized,
{
    async fn fetch_week(&self, week_start: NaiveDate) -> Result<Vec<AvailabilityRecord>, BookingError> {
        let request = StaffAvailabilityRequest::for_week(self.staff_ids, week_start, self.time_zone);
        self.provider.get_staff_availability(self.slug, &request).await
    }
}

/// State of one customer's booking flow.
///
/// Each session is independent; nothing here is shared between customers.
#[derive(Debug, Clone)]
pub struct BookingSession {
    slug: String,
    service_name: Option<String>,
    clock_source: ClockSource,
    clock: SchedulingClock,
    customer_zone: CustomerZone,
    submit_backoff: RetryPolicy,

    business: Option<Business>,
    services: Vec<Service>,
    selected_service: Option<Service>,
    questions: Vec<CustomQuestion>,
    current_week_start: Option<NaiveDate>,
    selected_date: Option<NaiveDate>,
    selected_slot: Option<BookableSlot>,
    selected_timestamp: Option<DateTime<Utc>>,
    availability: Vec<AvailabilityRecord>,
    phase: SessionPhase,
    failure: Option<SessionFailure>,
    retry_count: u32,
    submit_attempts: u32,
    last_submit_error: Option<ErrorKind>,
    confirmation: Option<CreatedAppointment>,
}

impl BookingSession {
    pub fn new(slug: &str, service_name: Option<&str>, clock_source: ClockSource) -> Self {
        Self {
            slug: slug.to_string(),
            service_name: service_name.map(str::to_string),
            clock_source,
            clock: SchedulingClock::Local,
            customer_zone: CustomerZone::detect(),
            submit_backoff: RetryPolicy::new(3, 2_000, 8_000, 0.0),
            business: None,
            services: Vec::new(),
            selected_service: None,
            questions: Vec::new(),
            current_week_start: None,
            selected_date: None,
            selected_slot: None,
            selected_timestamp: None,
            availability: Vec::new(),
            phase: SessionPhase::Loading,
            failure: None,
            retry_count: 0,
            submit_attempts: 0,
            last_submit_error: None,
            confirmation: None,
        }
    }

    /// Pin the clock. A fixed clock is never replaced by the business zone.
    pub fn with_clock(mut self, clock: SchedulingClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_customer_zone(mut self, zone: CustomerZone) -> Self {
        self.customer_zone = zone;
        self
    }

    pub fn with_submit_backoff(mut self, policy: RetryPolicy) -> Self {
        self.submit_backoff = policy;
        self
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn failure(&self) -> Option<&SessionFailure> {
        self.failure.as_ref()
    }

    pub fn business(&self) -> Option<&Business> {
        self.business.as_ref()
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn selected_service(&self) -> Option<&Service> {
        self.selected_service.as_ref()
    }

    /// Custom questions of the selected service, once loaded
    pub fn questions(&self) -> &[CustomQuestion] {
        &self.questions
    }

    pub fn current_week_start(&self) -> Option<NaiveDate> {
        self.current_week_start
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.selected_date
    }

    pub fn selected_slot(&self) -> Option<&BookableSlot> {
        self.selected_slot.as_ref()
    }

    pub fn selected_timestamp(&self) -> Option<DateTime<Utc>> {
        self.selected_timestamp
    }

    pub fn availability(&self) -> &[AvailabilityRecord] {
        &self.availability
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn submit_attempts(&self) -> u32 {
        self.submit_attempts
    }

    pub fn confirmation(&self) -> Option<&CreatedAppointment> {
        self.confirmation.as_ref()
    }

    pub fn clock(&self) -> &SchedulingClock {
        &self.clock
    }

    /// Load business info and services, fetch this week and pick the nearest
    /// bookable date.
    pub async fn load<B>(&mut self, backend: &B) -> Result<(), BookingError>
    where
        B: BookingBackend + ?Sized,
    {
        self.phase = SessionPhase::Loading;
        self.failure = None;
        match self.load_inner(backend).await {
            Ok(()) => Ok(()),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Load business info and services, then show `date` directly. No
    /// nearest-date search runs, so only the week starting at `date` is fetched.
    pub async fn load_date<B>(&mut self, date: NaiveDate, backend: &B) -> Result<(), BookingError>
    where
        B: BookingBackend + ?Sized,
    {
        self.phase = SessionPhase::Loading;
        self.failure = None;
        if let Err(err) = self.load_directory(backend).await {
            return Err(self.fail(err));
        }
        self.current_week_start = None;
        self.selected_date = None;
        self.availability = Vec::new();
        self.clear_slot();
        self.phase = SessionPhase::Browsing;
        self.view_date(date, backend).await
    }

    async fn load_inner<B>(&mut self, backend: &B) -> Result<(), BookingError>
    where
        B: BookingBackend + ?Sized,
    {
        self.load_directory(backend).await?;

        let today = self.clock.today();
        self.current_week_start = Some(today);
        self.selected_date = None;
        self.clear_slot();
        self.availability = self.fetch_week(backend, today).await?;
        self.phase = SessionPhase::Browsing;
        self.select_nearest_available_date(backend).await?;
        Ok(())
    }

    async fn load_directory<B>(&mut self, backend: &B) -> Result<(), BookingError>
    where
        B: BookingBackend + ?Sized,
    {
        let business = backend.get_business(&self.slug).await?;
        let services = backend.list_services(&self.slug).await?;
        let service = select_service(&services, self.service_name.as_deref())
            .cloned()
            .ok_or(BookingError::MissingContext("No services available for booking"))?;

        info!(
            business = %business.display_name,
            service = %service.display_name,
            "Loaded business and services"
        );
        self.business = Some(business);
        self.services = services;
        self.selected_service = Some(service);
        self.questions.clear();
        self.resolve_clock();
        Ok(())
    }

    fn resolve_clock(&mut self) {
        if matches!(self.clock, SchedulingClock::Fixed { .. }) {
            return;
        }
        self.clock = match (self.clock_source, &self.business) {
            (ClockSource::Business, Some(business)) => SchedulingClock::Zone(resolve_tz(business.time_zone())),
            _ => SchedulingClock::Local,
        };
    }

    /// Refetch the loaded week and re-run the nearest-date search
    pub async fn refresh<B>(&mut self, backend: &B) -> Result<(), BookingError>
    where
        B: BookingBackend + ?Sized,
    {
        self.require_browsing()?;
        let week_start = self
            .current_week_start
            .ok_or(BookingError::MissingContext("No week loaded"))?;
        self.reload_week(backend, week_start).await
    }

    /// Move to another week. Weeks starting in the past begin today instead.
    pub async fn change_week<B>(&mut self, week_start: NaiveDate, backend: &B) -> Result<(), BookingError>
    where
        B: BookingBackend + ?Sized,
    {
        self.require_browsing()?;
        let today = self.clock.today();
        let week_start = week_start.max(today);
        let (_, service) = self.context()?;
        if week_start > maximum_advance_date(service, today) {
            return Err(BookingError::Validation(format!(
                "Week of {} is beyond the booking window",
                week_start
            )));
        }
        self.reload_week(backend, week_start).await
    }

    /// Select `date`, fetching the seven days starting at it when it falls
    /// outside the loaded week. Never searches ahead.
    pub async fn view_date<B>(&mut self, date: NaiveDate, backend: &B) -> Result<(), BookingError>
    where
        B: BookingBackend + ?Sized,
    {
        self.require_browsing()?;
        self.check_in_window(date)?;
        let loaded = self
            .current_week_start
            .map(|start| {
                date >= start
                    && start
                        .checked_add_signed(chrono::Duration::days(7))
                        .map_or(true, |end| date < end)
            })
            .unwrap_or(false);
        if !loaded {
            self.clear_slot();
            self.current_week_start = Some(date);
            match self.fetch_week(backend, date).await {
                Ok(records) => self.availability = records,
                Err(err) => return Err(self.fail(err)),
            }
        }
        self.select_date(date)
    }

    async fn reload_week<B>(&mut self, backend: &B, week_start: NaiveDate) -> Result<(), BookingError>
    where
        B: BookingBackend + ?Sized,
    {
        self.clear_slot();
        self.phase = SessionPhase::Browsing;
        self.current_week_start = Some(week_start);
        let fetched = match self.fetch_week(backend, week_start).await {
            Ok(records) => records,
            Err(err) => return Err(self.fail(err)),
        };
        self.availability = fetched;
        if let Err(err) = self.select_nearest_available_date(backend).await {
            return Err(self.fail(err));
        }
        Ok(())
    }

    async fn fetch_week<B>(&self, backend: &B, week_start: NaiveDate) -> Result<Vec<AvailabilityRecord>, BookingError>
    where
        B: BookingBackend + ?Sized,
    {
        let (business, service) = self.context()?;
        let source = ServiceWeekSource {
            provider: backend,
            slug: &self.slug,
            staff_ids: &service.staff_member_ids,
            time_zone: business.time_zone(),
        };
        debug!(%week_start, "Fetching week availability");
        source.fetch_week(week_start).await
    }

    /// Run the nearest-date search from the loaded week. Exhausting the
    /// window records a failure but leaves the session browsing.
    async fn select_nearest_available_date<B>(&mut self, backend: &B) -> Result<Option<NaiveDate>, BookingError>
    where
        B: BookingBackend + ?Sized,
    {
        let week_start = self
            .current_week_start
            .ok_or(BookingError::MissingContext("No week loaded"))?;
        let outcome = {
            let (business, service) = self.context()?;
            let ctx = SearchContext {
                business_hours: &business.business_hours,
                service,
                now: self.clock.now(),
            };
            let source = ServiceWeekSource {
                provider: backend,
                slug: &self.slug,
                staff_ids: &service.staff_member_ids,
                time_zone: business.time_zone(),
            };
            find_nearest_available_date(&ctx, week_start, &self.availability, &source).await
        };

        match outcome {
            Ok(outcome) => {
                if let Some(records) = outcome.fetched {
                    self.availability = records;
                }
                self.current_week_start = Some(outcome.week_start);
                self.selected_date = Some(outcome.date);
                self.failure = None;
                Ok(Some(outcome.date))
            }
            Err(err @ BookingError::NoAvailability) => {
                warn!(slug = %self.slug, "{}", err);
                self.failure = Some(SessionFailure::from(&err));
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub fn select_date(&mut self, date: NaiveDate) -> Result<(), BookingError> {
        self.require_browsing()?;
        self.check_in_window(date)?;
        self.clear_slot();
        self.phase = SessionPhase::Browsing;
        self.selected_date = Some(date);
        Ok(())
    }

    fn check_in_window(&self, date: NaiveDate) -> Result<(), BookingError> {
        let today = self.clock.today();
        let (_, service) = self.context()?;
        if date < today || date > maximum_advance_date(service, today) {
            return Err(BookingError::Validation(format!(
                "{} is outside the booking window",
                date
            )));
        }
        Ok(())
    }

    /// Slots for `date` against the loaded week's availability
    pub fn slots_for(&self, date: NaiveDate) -> Result<Vec<BookableSlot>, BookingError> {
        let (business, service) = self.context()?;
        Ok(compute_slots_for_day(
            date,
            service,
            &self.availability,
            &business.business_hours,
            self.clock.now(),
        ))
    }

    pub fn slots_for_selected_date(&self) -> Result<Vec<BookableSlot>, BookingError> {
        let date = self
            .selected_date
            .ok_or(BookingError::MissingContext("No date selected"))?;
        self.slots_for(date)
    }

    /// Select an available slot on the selected date by its label, e.g. "10:30 AM"
    pub fn select_slot(&mut self, time_label: &str) -> Result<&BookableSlot, BookingError> {
        self.require_browsing()?;
        let slot = self
            .slots_for_selected_date()?
            .into_iter()
            .find(|slot| slot.time.eq_ignore_ascii_case(time_label.trim()))
            .ok_or_else(|| BookingError::Validation(format!("No slot at {}", time_label)))?;
        if !slot.available {
            return Err(BookingError::Validation(format!(
                "{} is not available",
                slot.time
            )));
        }
        let instant = self.clock.to_utc(slot.start).ok_or_else(|| {
            BookingError::Validation(format!("{} does not exist on this clock", slot.start))
        })?;

        debug!(slot = %slot.time, %instant, "Selected slot");
        self.selected_timestamp = Some(instant);
        self.phase = SessionPhase::SlotSelected;
        Ok(self.selected_slot.insert(slot))
    }

    pub fn open_form(&mut self) -> Result<(), BookingError> {
        if self.phase != SessionPhase::SlotSelected {
            return Err(BookingError::MissingContext("No slot selected"));
        }
        self.phase = SessionPhase::Form;
        self.submit_attempts = 0;
        self.last_submit_error = None;
        Ok(())
    }

    /// Fetch the business's custom questions and keep the ones the selected
    /// service asks. Services without questions skip the fetch.
    pub async fn load_questions<B>(&mut self, backend: &B) -> Result<&[CustomQuestion], BookingError>
    where
        B: BookingBackend + ?Sized,
    {
        let (_, service) = self.context()?;
        if service.custom_questions.is_empty() {
            self.questions.clear();
            return Ok(&self.questions);
        }
        let all = backend.list_custom_questions(&self.slug).await?;
        let (_, service) = self.context()?;
        let questions = service.questions_from(&all);
        self.questions = questions;
        debug!(count = self.questions.len(), "Loaded custom questions");
        Ok(&self.questions)
    }

    /// Answer a loaded question, addressed by id or display name
    pub fn answer(&self, question: &str, value: &str) -> Result<QuestionAnswer, BookingError> {
        let question = self
            .questions
            .iter()
            .find(|q| q.id == question || q.display_name.eq_ignore_ascii_case(question.trim()))
            .ok_or_else(|| BookingError::Validation(format!("Unknown question {:?}", question)))?;
        QuestionAnswer::for_question(question, value).map_err(BookingError::Validation)
    }

    fn check_required_answers(&self, details: &CustomerDetails) -> Result<(), BookingError> {
        let (_, service) = self.context()?;
        match service.required_question_ids().find(|id| !details.has_answer(id)) {
            Some(missing) => {
                let label = self
                    .questions
                    .iter()
                    .find(|q| q.id == missing)
                    .map_or(missing, |q| q.display_name.as_str());
                Err(BookingError::Validation(format!("Please answer {:?}", label)))
            }
            None => Ok(()),
        }
    }

    /// Leave the form and go back to picking a time
    pub fn change_appointment(&mut self) -> Result<(), BookingError> {
        if !matches!(self.phase, SessionPhase::Form | SessionPhase::SlotSelected) {
            return Err(BookingError::MissingContext("No appointment in progress"));
        }
        self.clear_slot();
        self.phase = SessionPhase::Browsing;
        Ok(())
    }

    /// Submit the booking once. A failure leaves the form open.
    pub async fn submit<B>(&mut self, backend: &B, details: &CustomerDetails) -> Result<&CreatedAppointment, BookingError>
    where
        B: BookingBackend + ?Sized,
    {
        if self.phase != SessionPhase::Form {
            return Err(BookingError::MissingContext("Booking form is not open"));
        }
        details.validate().map_err(BookingError::Validation)?;
        self.check_required_answers(details)?;
        let payload = self.appointment_payload(details)?;

        self.submit_attempts += 1;
        info!(attempt = self.submit_attempts, service = %payload.service_id, "Submitting booking");
        match backend.create_appointment(&self.slug, &payload).await {
            Ok(created) => {
                info!(id = ?created.id, "Booking confirmed");
                self.last_submit_error = None;
                self.phase = SessionPhase::Confirmed;
                Ok(self.confirmation.insert(created))
            }
            Err(err) => {
                warn!(attempt = self.submit_attempts, error = %err, "Booking failed");
                self.last_submit_error = Some(err.kind());
                Err(err)
            }
        }
    }

    fn appointment_payload(&self, details: &CustomerDetails) -> Result<AppointmentPayload, BookingError> {
        let (_, service) = self.context()?;
        let slot = self
            .selected_slot
            .as_ref()
            .ok_or(BookingError::MissingContext("No slot selected"))?;
        let start = self
            .selected_timestamp
            .ok_or(BookingError::MissingContext("No slot selected"))?;
        let end = start
            .checked_add_signed(service.duration().as_chrono())
            .ok_or_else(|| BookingError::Validation("Service duration is out of range".to_string()))?;
        Ok(AppointmentPayload::new(
            &service.id,
            &slot.staff_ids,
            start,
            end,
            details,
            &customer_time_zone(&self.customer_zone),
        ))
    }

    /// Whether a failed booking may be resubmitted after customer confirmation
    pub fn can_retry_submit(&self) -> bool {
        self.phase == SessionPhase::Form
            && self.submit_attempts >= 1
            && self.submit_attempts <= MAX_SUBMIT_RETRIES
            && matches!(self.last_submit_error, Some(kind) if kind != ErrorKind::ClientInput)
    }

    /// Wait out the backoff delay, then submit again
    pub async fn retry_submit<B>(&mut self, backend: &B, details: &CustomerDetails) -> Result<&CreatedAppointment, BookingError>
    where
        B: BookingBackend + ?Sized,
    {
        if !self.can_retry_submit() {
            return Err(BookingError::RetryLimit(MAX_SUBMIT_RETRIES));
        }
        let delay = self
            .submit_backoff
            .next_delay(self.submit_attempts.saturating_sub(1) as usize);
        info!(delay_ms = delay.as_millis() as u64, "Retrying booking");
        sleep(delay).await;
        self.submit(backend, details).await
    }

    /// Reload after a failure, up to the retry ceiling
    pub async fn retry<B>(&mut self, backend: &B) -> Result<(), BookingError>
    where
        B: BookingBackend + ?Sized,
    {
        if self.phase != SessionPhase::Error {
            return Err(BookingError::MissingContext("Nothing to retry"));
        }
        if self.retry_count >= MAX_SESSION_RETRIES {
            return Err(BookingError::RetryLimit(MAX_SESSION_RETRIES));
        }
        self.retry_count += 1;
        info!(attempt = self.retry_count, max = MAX_SESSION_RETRIES, "Retrying session load");
        self.load(backend).await
    }

    /// Back to a freshly created session
    pub fn reset(&mut self) {
        let mut fresh = BookingSession::new(&self.slug, self.service_name.as_deref(), self.clock_source)
            .with_customer_zone(self.customer_zone.clone())
            .with_submit_backoff(self.submit_backoff.clone());
        if let SchedulingClock::Fixed { .. } = self.clock {
            fresh = fresh.with_clock(self.clock.clone());
        }
        *self = fresh;
    }

    pub fn timezone_note(&self) -> Result<TimezoneNote, BookingError> {
        let business = self
            .business
            .as_ref()
            .ok_or(BookingError::MissingContext("Business information not loaded"))?;
        Ok(resolve_customer_timezone_note(business.time_zone(), &self.customer_zone))
    }

    fn context(&self) -> Result<(&Business, &Service), BookingError> {
        let business = self
            .business
            .as_ref()
            .ok_or(BookingError::MissingContext("Business information not loaded"))?;
        let service = self
            .selected_service
            .as_ref()
            .ok_or(BookingError::MissingContext("No service selected"))?;
        Ok((business, service))
    }

    fn require_browsing(&self) -> Result<(), BookingError> {
        match self.phase {
            SessionPhase::Browsing | SessionPhase::SlotSelected => Ok(()),
            SessionPhase::Loading | SessionPhase::Error => {
                Err(BookingError::MissingContext("Session is not loaded"))
            }
            SessionPhase::Form => Err(BookingError::MissingContext(
                "Booking form is open; change the appointment first",
            )),
            SessionPhase::Confirmed => Err(BookingError::MissingContext(
                "Booking already confirmed; reset to start over",
            )),
        }
    }

    fn clear_slot(&mut self) {
        self.selected_slot = None;
        self.selected_timestamp = None;
        self.submit_attempts = 0;
        self.last_submit_error = None;
    }

    fn fail(&mut self, err: BookingError) -> BookingError {
        warn!(slug = %self.slug, error = %err, "Session failed");
        self.phase = SessionPhase::Error;
        self.failure = Some(SessionFailure::from(&err));
        err
    }
}
