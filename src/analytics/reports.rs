use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

lazy_static! {
    static ref DATE_RE: Regex =
        Regex::new(r"^(\d{4}-\d{2}-\d{2}|today|yesterday|\d+daysAgo)$").unwrap();
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[serde(default = "default_start")]
    pub start_date: String,
    #[serde(default = "default_end")]
    pub end_date: String,
}

fn default_start() -> String {
    "7daysAgo".into()
}

fn default_end() -> String {
    "today".into()
}

impl Default for DateRange {
    fn default() -> Self {
        Self {
            start_date: default_start(),
            end_date: default_end(),
        }
    }
}

impl DateRange {
    pub fn is_valid(&self) -> bool {
        DATE_RE.is_match(&self.start_date) && DATE_RE.is_match(&self.end_date)
    }

    fn to_json(&self) -> Value {
        json!([{ "startDate": self.start_date, "endDate": self.end_date }])
    }
}

fn dims(names: &[&str]) -> Value {
    names.iter().map(|n| json!({ "name": n })).collect()
}

fn order_by_desc(metric: &str) -> Value {
    json!([{ "metric": { "metricName": metric }, "desc": true }])
}

pub fn realtime_by_country() -> Value {
    json!({
        "dimensions": dims(&["country"]),
        "metrics": dims(&["activeUsers"]),
    })
}

pub fn realtime_by_screen() -> Value {
    json!({
        "dimensions": dims(&["unifiedScreenName"]),
        "metrics": dims(&["activeUsers"]),
    })
}

pub fn realtime_by_page() -> Value {
    json!({
        "dimensions": dims(&["pagePath", "pageTitle"]),
        "metrics": dims(&["activeUsers"]),
    })
}

pub fn page_views(range: &DateRange) -> Value {
    json!({
        "dateRanges": range.to_json(),
        "dimensions": dims(&["pagePath", "pageTitle"]),
        "metrics": dims(&["screenPageViews", "sessions", "activeUsers"]),
        "orderBys": order_by_desc("screenPageViews"),
    })
}

pub fn page_performance(range: &DateRange) -> Value {
    json!({
        "dateRanges": range.to_json(),
        "dimensions": dims(&["pagePath", "pageTitle"]),
        "metrics": dims(&[
            "screenPageViews",
            "sessions",
            "activeUsers",
            "averageSessionDuration",
            "bounceRate",
        ]),
        "orderBys": order_by_desc("screenPageViews"),
    })
}

/// Historical pages as shown on the dashboard: views and sessions only.
pub fn historical_pages(range: &DateRange) -> Value {
    json!({
        "dateRanges": range.to_json(),
        "dimensions": dims(&["pagePath", "pageTitle"]),
        "metrics": dims(&["screenPageViews", "sessions"]),
        "orderBys": order_by_desc("screenPageViews"),
    })
}

pub fn top_events(range: &DateRange) -> Value {
    json!({
        "dateRanges": range.to_json(),
        "dimensions": dims(&["eventName"]),
        "metrics": dims(&["eventCount"]),
        "orderBys": order_by_desc("eventCount"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: &str, end: &str) -> DateRange {
        DateRange {
            start_date: start.into(),
            end_date: end.into(),
        }
    }

    #[test]
    fn accepts_relative_and_absolute_dates() {
        assert!(DateRange::default().is_valid());
        assert!(range("2024-01-01", "yesterday").is_valid());
        assert!(range("30daysAgo", "today").is_valid());
    }

    #[test]
    fn rejects_garbage_dates() {
        assert!(!range("last week", "today").is_valid());
        assert!(!range("7daysAgo", "2024-1-1").is_valid());
        assert!(!range("", "today").is_valid());
    }

    #[test]
    fn page_performance_adds_engagement_metrics() {
        let body = page_performance(&DateRange::default());
        let metrics: Vec<&str> = body["metrics"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            metrics,
            ["screenPageViews", "sessions", "activeUsers", "averageSessionDuration", "bounceRate"]
        );
        assert_eq!(body["dateRanges"][0]["startDate"], "7daysAgo");
        assert_eq!(body["orderBys"][0]["desc"], true);
    }

    #[test]
    fn realtime_reports_have_no_date_range() {
        assert!(realtime_by_country().get("dateRanges").is_none());
        assert_eq!(realtime_by_screen()["dimensions"][0]["name"], "unifiedScreenName");
    }
}
