//! Read-only proxy in front of the Google Analytics Data API.

use std::sync::Arc;

use axum::Router;

pub mod google;
pub mod handlers;
pub mod reports;

pub use google::{GoogleAnalyticsClient, ReportClient, ServiceAccountKey};
pub use reports::DateRange;

#[derive(Clone)]
pub struct AnalyticsState {
    pub reports: Arc<dyn ReportClient>,
}

pub fn router(state: AnalyticsState) -> Router {
    handlers::analytics_routes().with_state(state)
}
