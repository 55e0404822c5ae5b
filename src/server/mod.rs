mod handlers;
mod routes;

pub use routes::create_router;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::calendar::BookingsClient;
use crate::models::ClockSource;
use crate::session::BookingSession;

/// Shared application state. Sessions are built per request and never shared.
pub struct AppState {
    pub client: BookingsClient,
    pub clock: ClockSource,
}

impl AppState {
    pub fn new(client: BookingsClient, clock: ClockSource) -> Self {
        Self { client, clock }
    }

    pub fn session(&self, slug: &str, service: Option<&str>) -> BookingSession {
        BookingSession::new(slug, service, self.clock)
    }
}

/// Run the API server
pub async fn run_server(addr: SocketAddr, api_url: &str, clock: ClockSource) -> Result<()> {
    let state = Arc::new(AppState::new(BookingsClient::new(api_url), clock));
    let app = create_router(state);

    tracing::info!("Server listening on {} (proxy: {})", addr, api_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
