//! Analytics dashboard: concurrent loads and chart preparation

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use complaint_client::{
    AgencyCount, AnalyticsQuery, ApiClient, ComplaintsByAgency, ComplaintsByStatus, ComplaintsByType,
    PerformanceStats, ResolutionTimeStats, StatusCount, TypeCount,
};

use crate::error::{ConsoleError, Result};

const PERFORMANCE_FAILED: &str = "Failed to load performance statistics";
/// Error slot text for a failed report download
pub const REPORT_FAILED: &str = "Failed to download PDF report";
const FALLBACK_COLOR: &str = "#6b7280";
const TOP_AGENCIES: usize = 10;

/// Optional start/end day filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Days are taken as midnight UTC
    pub fn to_query(&self) -> AnalyticsQuery {
        let midnight = |day: NaiveDate| -> DateTime<Utc> {
            Utc.from_utc_datetime(&day.and_time(NaiveTime::default()))
        };
        AnalyticsQuery {
            start_date: self.start.map(midnight),
            end_date: self.end.map(midnight),
        }
    }

    /// `analytics-report-{start|all}-to-{end|all}.pdf`
    pub fn report_filename(&self) -> String {
        let part = |day: Option<NaiveDate>| {
            day.map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "all".to_string())
        };
        format!("analytics-report-{}-to-{}.pdf", part(self.start), part(self.end))
    }
}

/// One bar of a chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: u64,
    pub color: Option<&'static str>,
}

/// `IN_PROGRESS` / `in_progress` -> `In Progress`
pub fn format_status_label(status: &str) -> String {
    status
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn status_color(status: &str) -> &'static str {
    match status.to_uppercase().as_str() {
        "PENDING" => "#f59e0b",
        "IN_PROGRESS" => "#3b82f6",
        "RESOLVED" => "#10b981",
        "REJECTED" => "#ef4444",
        "CLOSED" => "#6b7280",
        _ => FALLBACK_COLOR,
    }
}

pub fn status_chart(data: &[StatusCount]) -> Vec<ChartPoint> {
    data.iter()
        .map(|item| ChartPoint {
            label: format_status_label(&item.status),
            value: item.count,
            color: Some(status_color(&item.status)),
        })
        .collect()
}

/// Top agencies by complaint count, descending
pub fn agency_chart(data: &[AgencyCount]) -> Vec<ChartPoint> {
    let mut sorted: Vec<&AgencyCount> = data.iter().collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count));
    sorted
        .into_iter()
        .take(TOP_AGENCIES)
        .map(|item| ChartPoint {
            label: item.agency_name.clone(),
            value: item.count,
            color: None,
        })
        .collect()
}

pub fn type_chart(data: &[TypeCount]) -> Vec<ChartPoint> {
    let mut sorted: Vec<&TypeCount> = data.iter().collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count));
    sorted
        .into_iter()
        .map(|item| ChartPoint {
            label: item.complaint_type.clone(),
            value: item.count,
            color: None,
        })
        .collect()
}

pub fn chart_total(points: &[ChartPoint]) -> u64 {
    points.iter().map(|p| p.value).sum()
}

/// Share of `value` in `total`, in percent; zero when the total is zero
pub fn percentage(value: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        value as f64 / total as f64 * 100.0
    }
}

/// Largest value in a chart, for bar scaling
pub fn chart_max(points: &[ChartPoint]) -> u64 {
    points.iter().map(|p| p.value).max().unwrap_or(0)
}

/// Everything the dashboard shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardData {
    pub performance: Option<PerformanceStats>,
    pub by_status: Option<ComplaintsByStatus>,
    pub by_agency: Option<ComplaintsByAgency>,
    pub by_type: Option<ComplaintsByType>,
    pub resolution: Option<ResolutionTimeStats>,
    pub status_chart: Vec<ChartPoint>,
    pub agency_chart: Vec<ChartPoint>,
    pub type_chart: Vec<ChartPoint>,
    /// Only the performance load reports here; the others just log
    pub error: Option<String>,
}

impl DashboardData {
    pub fn status_total(&self) -> u64 {
        chart_total(&self.status_chart)
    }
}

fn logged<T>(what: &str, result: complaint_client::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(error = %err, "Failed to load {}", what);
            None
        }
    }
}

/// Issue all five analytics loads concurrently
pub async fn load_dashboard(client: &ApiClient, range: &DateRange) -> DashboardData {
    let query = range.to_query();
    let (performance, by_status, by_agency, by_type, resolution) = tokio::join!(
        client.performance_stats(&query),
        client.complaints_by_status(&query),
        client.complaints_by_agency(&query),
        client.complaints_by_type(&query),
        client.resolution_time_stats(&query),
    );

    let mut data = DashboardData::default();
    match performance {
        Ok(stats) => data.performance = Some(stats),
        Err(err) => {
            tracing::warn!(error = %err, "Failed to load performance statistics");
            data.error = Some(PERFORMANCE_FAILED.to_string());
        }
    }

    data.by_status = logged("complaints by status", by_status);
    data.by_agency = logged("complaints by agency", by_agency);
    data.by_type = logged("complaints by type", by_type);
    data.resolution = logged("resolution time stats", resolution);

    if let Some(by_status) = &data.by_status {
        data.status_chart = status_chart(&by_status.data);
    }
    if let Some(by_agency) = &data.by_agency {
        data.agency_chart = agency_chart(&by_agency.data);
    }
    if let Some(by_type) = &data.by_type {
        data.type_chart = type_chart(&by_type.data);
    }
    data
}

/// Download the PDF report, returning the suggested filename and bytes
pub async fn download_report(client: &ApiClient, range: &DateRange) -> Result<(String, Vec<u8>)> {
    let bytes = client.pdf_report(&range.to_query()).await.map_err(|err| {
        tracing::warn!(error = %err, "Failed to download PDF report");
        ConsoleError::from(err)
    })?;
    tracing::info!(size = bytes.len(), "PDF report downloaded");
    Ok((range.report_filename(), bytes))
}
