pub mod calendar;
pub mod cli;
pub mod error;
pub mod models;
pub mod retry;
pub mod server;
pub mod session;
pub mod timezone;

pub use error::{BookingError, ErrorKind};
pub use models::*;
pub use session::{BookingSession, SessionPhase};

/// Default booking proxy URL
pub const DEFAULT_API_URL: &str = "http://localhost:8787";

/// API version prefix
pub const API_VERSION: &str = "v1";

/// Application name
pub const APP_NAME: &str = "bookd";
