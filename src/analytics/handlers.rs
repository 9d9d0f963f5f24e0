use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{info, instrument};

use super::{reports, AnalyticsState, DateRange};
use crate::error::AppError;

pub fn analytics_routes() -> Router<AnalyticsState> {
    Router::new()
        .route("/realtime", get(realtime))
        .route("/realtime-pages", get(realtime_pages))
        .route("/page-views", get(page_views))
        .route("/page-performance", get(page_performance))
        .route("/dashboard-data", get(dashboard_data))
}

fn checked(range: DateRange) -> Result<DateRange, AppError> {
    if range.is_valid() {
        Ok(range)
    } else {
        Err(AppError::validation(
            "startDate and endDate must be YYYY-MM-DD, today, yesterday or NdaysAgo",
        ))
    }
}

#[instrument(skip(state))]
pub async fn realtime(State(state): State<AnalyticsState>) -> Result<Json<Value>, AppError> {
    let data = state
        .reports
        .run_realtime_report(reports::realtime_by_country())
        .await
        .map_err(AppError::dependency("Failed to fetch realtime data"))?;
    Ok(Json(data))
}

#[instrument(skip(state))]
pub async fn realtime_pages(State(state): State<AnalyticsState>) -> Result<Json<Value>, AppError> {
    let data = state
        .reports
        .run_realtime_report(reports::realtime_by_screen())
        .await
        .map_err(AppError::dependency("Failed to fetch realtime page data"))?;
    Ok(Json(data))
}

#[instrument(skip(state))]
pub async fn page_views(
    State(state): State<AnalyticsState>,
    Query(range): Query<DateRange>,
) -> Result<Json<Value>, AppError> {
    let range = checked(range)?;
    let data = state
        .reports
        .run_report(reports::page_views(&range))
        .await
        .map_err(AppError::dependency("Failed to fetch page views data"))?;
    Ok(Json(data))
}

#[instrument(skip(state))]
pub async fn page_performance(
    State(state): State<AnalyticsState>,
    Query(range): Query<DateRange>,
) -> Result<Json<Value>, AppError> {
    let range = checked(range)?;
    let data = state
        .reports
        .run_report(reports::page_performance(&range))
        .await
        .map_err(AppError::dependency("Failed to fetch page performance data"))?;
    Ok(Json(data))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub realtime_by_country: Value,
    pub realtime_by_pages: Value,
    pub historical_pages: Value,
    pub top_events: Value,
    pub last_updated: String,
}

/// All four dashboard reports, fetched concurrently. One failure fails the lot.
#[instrument(skip(state))]
pub async fn dashboard_data(
    State(state): State<AnalyticsState>,
    Query(range): Query<DateRange>,
) -> Result<Json<DashboardData>, AppError> {
    let range = checked(range)?;
    let client = state.reports.as_ref();

    let (realtime_by_country, realtime_by_pages, historical_pages, top_events) = tokio::try_join!(
        client.run_realtime_report(reports::realtime_by_country()),
        client.run_realtime_report(reports::realtime_by_page()),
        client.run_report(reports::historical_pages(&range)),
        client.run_report(reports::top_events(&range)),
    )
    .map_err(AppError::dependency("Failed to fetch dashboard data"))?;

    let last_updated = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(AppError::dependency("Failed to fetch dashboard data"))?;

    info!(start = %range.start_date, end = %range.end_date, "dashboard data served");
    Ok(Json(DashboardData {
        realtime_by_country,
        realtime_by_pages,
        historical_pages,
        top_events,
        last_updated,
    }))
}
