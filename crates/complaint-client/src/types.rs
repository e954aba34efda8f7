//! Types for the complaint management REST API

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for the REST API, including the `/api` prefix
    pub base_url: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout_secs: 30,
        }
    }
}

// ==================== Complaints ====================

/// Lifecycle status of a complaint.
///
/// Closed set: the backend rejects anything else and so does the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Pending,
    InProgress,
    AwaitingInfo,
    Resolved,
    Rejected,
}

impl ComplaintStatus {
    /// Every status, in workflow order
    pub const ALL: [ComplaintStatus; 5] = [
        ComplaintStatus::Pending,
        ComplaintStatus::InProgress,
        ComplaintStatus::AwaitingInfo,
        ComplaintStatus::Resolved,
        ComplaintStatus::Rejected,
    ];

    /// Wire name (e.g. `in_progress`)
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "pending",
            ComplaintStatus::InProgress => "in_progress",
            ComplaintStatus::AwaitingInfo => "awaiting_info",
            ComplaintStatus::Resolved => "resolved",
            ComplaintStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Error returned when parsing a status outside the closed set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown complaint status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for ComplaintStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComplaintStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Built-in complaint categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintCategory {
    Environmental,
    PublicHealth,
    Transportation,
    WaterAndSanitation,
    Other,
}

impl ComplaintCategory {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ComplaintCategory::Environmental => "Environmental",
            ComplaintCategory::PublicHealth => "Public Health",
            ComplaintCategory::Transportation => "Transportation",
            ComplaintCategory::WaterAndSanitation => "Water & Sanitation",
            ComplaintCategory::Other => "Other",
        }
    }
}

/// Complaint type reference as embedded by the agencies endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintTypeRef {
    pub id: String,
    pub name: String,
}

/// Complaint type: either a built-in category or a referenced type object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComplaintType {
    Category(ComplaintCategory),
    Reference(ComplaintTypeRef),
}

impl ComplaintType {
    /// Human-readable label
    pub fn label(&self) -> &str {
        match self {
            ComplaintType::Category(category) => category.label(),
            ComplaintType::Reference(reference) => &reference.name,
        }
    }
}

/// Attachment on a complaint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintFile {
    pub link: String,
    pub mime_type: String,
}

/// Minimal identity of a complaint submitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub email: String,
}

impl UserSummary {
    /// "First Last" when any name part is present, otherwise the email
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            self.email.clone()
        } else {
            parts.join(" ")
        }
    }
}

/// A complaint record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Submitter reference
    pub user_id: String,
    pub agency_id: String,
    #[serde(rename = "type")]
    pub complaint_type: ComplaintType,
    pub location: String,
    #[serde(default)]
    pub files: Vec<ComplaintFile>,
    pub status: ComplaintStatus,
    /// Incremented by exactly one on every accepted mutation
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency: Option<Agency>,
    /// Denormalized submitter summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

/// Body for appending a note
#[derive(Debug, Clone, Serialize)]
pub struct AddNoteRequest {
    pub note: String,
}

/// Body for a status transition
#[derive(Debug, Clone, Serialize)]
pub struct ChangeStatusRequest {
    pub status: ComplaintStatus,
}

// ==================== Pagination ====================

/// Pagination metadata, owned by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub item_count: u64,
    pub total_items: u64,
    pub items_per_page: u64,
    pub total_pages: u64,
    pub current_page: u64,
}

/// Navigation links
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// A page of items from a paginated endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
    #[serde(default)]
    pub links: PageLinks,
}

/// Page selection for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: u64, limit: u64) -> Self {
        Self { page, limit }
    }
}

// ==================== Agencies ====================

/// A government agency complaints are routed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agency {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complaint_types: Option<Vec<ComplaintTypeRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body for creating an agency
#[derive(Debug, Clone, Serialize)]
pub struct CreateAgencyRequest {
    pub name: String,
}

// ==================== Users ====================

/// Role names used by the backend
pub mod roles {
    pub const ADMIN: &str = "admin";
    pub const STAFF_ADMIN: &str = "staff_admin";
    pub const COMPLAINT_STAFF: &str = "complaint_staff";
    pub const USER: &str = "user";
}

/// A user or staff account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub role: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub must_change_password: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Filters for the user listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub role: Option<String>,
    pub is_verified: Option<bool>,
    pub is_active: Option<bool>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub order_by: Option<String>,
}

impl UserQuery {
    /// Query string pairs, skipping unset and empty filters
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(role) = self.role.as_deref().filter(|r| !r.is_empty()) {
            params.push(("role", role.to_string()));
        }
        if let Some(verified) = self.is_verified {
            params.push(("isVerified", verified.to_string()));
        }
        if let Some(active) = self.is_active {
            params.push(("isActive", active.to_string()));
        }
        if let Some(page) = self.page.filter(|p| *p > 0) {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            params.push(("limit", limit.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            params.push(("search", search.to_string()));
        }
        if let Some(order_by) = self.order_by.as_deref().filter(|o| !o.is_empty()) {
            params.push(("orderBy", order_by.to_string()));
        }
        params
    }
}

/// Profile picture upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePicture {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Input for creating a regular user account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl CreateUserInput {
    /// Multipart text fields, skipping unset values
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(first) = &self.first_name {
            fields.push(("firstName", first.clone()));
        }
        if let Some(last) = &self.last_name {
            fields.push(("lastName", last.clone()));
        }
        fields.push(("email", self.email.clone()));
        fields.push(("phone", self.phone.clone()));
        if let Some(password) = &self.password {
            fields.push(("password", password.clone()));
        }
        fields
    }
}

/// Staff roles that can be provisioned from the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    StaffAdmin,
    ComplaintStaff,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::StaffAdmin => roles::STAFF_ADMIN,
            StaffRole::ComplaintStaff => roles::COMPLAINT_STAFF,
        }
    }
}

impl FromStr for StaffRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            roles::STAFF_ADMIN => Ok(StaffRole::StaffAdmin),
            roles::COMPLAINT_STAFF => Ok(StaffRole::ComplaintStaff),
            other => Err(format!("unknown staff role '{}'", other)),
        }
    }
}

/// Input for creating a staff account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStaffInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub email: String,
    pub phone: String,
    pub target_role: StaffRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<String>,
}

/// Input for updating the current user's profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateProfileInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

impl UpdateProfileInput {
    /// Multipart text fields, skipping unset and empty values
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("phone", &self.phone),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_ref()
                .filter(|v| !v.is_empty())
                .map(|v| (name, v.clone()))
        })
        .collect()
    }
}

// ==================== Authentication ====================

/// Body for sign-in
#[derive(Debug, Clone, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Refresh token, either bare or wrapped in an object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefreshToken {
    Plain(String),
    Wrapped { token: String },
}

impl RefreshToken {
    pub fn token(&self) -> &str {
        match self {
            RefreshToken::Plain(token) => token,
            RefreshToken::Wrapped { token } => token,
        }
    }
}

/// User details embedded in the sign-in response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Sign-in response
///
/// Older backends misspell the token field as `accesToken`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    #[serde(default, alias = "accesToken")]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<RefreshToken>,
    #[serde(default)]
    pub user: Option<SessionUser>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body for confirming a password reset
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

// ==================== Analytics ====================

/// Date range filter for analytics endpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyticsQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl AnalyticsQuery {
    /// Query string pairs; dates are ISO-8601 with millisecond precision
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(start) = self.start_date {
            params.push(("startDate", start.to_rfc3339_opts(SecondsFormat::Millis, true)));
        }
        if let Some(end) = self.end_date {
            params.push(("endDate", end.to_rfc3339_opts(SecondsFormat::Millis, true)));
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsPeriod {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceStats {
    pub average_response_time: f64,
    pub total_requests: u64,
    pub total_errors: u64,
    pub success_rate: f64,
    pub period: StatsPeriod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintsByStatus {
    pub data: Vec<StatusCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgencyCount {
    pub agency_id: String,
    pub agency_name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintsByAgency {
    pub data: Vec<AgencyCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub complaint_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintsByType {
    pub data: Vec<TypeCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionTimeStats {
    pub average_time_in_days: f64,
    pub median_time_in_days: f64,
    pub min_time_in_days: f64,
    pub max_time_in_days: f64,
    pub total_resolved: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complaint_json() -> serde_json::Value {
        json!({
            "id": "c1",
            "title": "Broken main",
            "description": "Water everywhere",
            "userId": "u1",
            "agencyId": "a1",
            "type": "water_and_sanitation",
            "location": "5th street",
            "files": [{"link": "https://files/1.png", "mimeType": "image/png"}],
            "status": "in_progress",
            "version": 3,
            "createdAt": "2024-01-01T10:00:00.000Z",
            "updatedAt": "2024-01-02T10:00:00.000Z"
        })
    }

    #[test]
    fn test_complaint_deserializes_category_type() {
        let complaint: Complaint = serde_json::from_value(complaint_json()).unwrap();
        assert_eq!(complaint.status, ComplaintStatus::InProgress);
        assert_eq!(
            complaint.complaint_type,
            ComplaintType::Category(ComplaintCategory::WaterAndSanitation)
        );
        assert_eq!(complaint.complaint_type.label(), "Water & Sanitation");
        assert_eq!(complaint.files[0].mime_type, "image/png");
        assert!(complaint.user.is_none());
    }

    #[test]
    fn test_complaint_deserializes_referenced_type() {
        let mut value = complaint_json();
        value["type"] = json!({"id": "t9", "name": "Noise"});
        let complaint: Complaint = serde_json::from_value(value).unwrap();
        assert_eq!(complaint.complaint_type.label(), "Noise");
    }

    #[test]
    fn test_status_is_a_closed_set() {
        let mut value = complaint_json();
        value["status"] = json!("closed");
        assert!(serde_json::from_value::<Complaint>(value).is_err());

        assert_eq!("awaiting_info".parse::<ComplaintStatus>(), Ok(ComplaintStatus::AwaitingInfo));
        assert!("CLOSED".parse::<ComplaintStatus>().is_err());
    }

    #[test]
    fn test_sign_in_accepts_misspelt_token() {
        let response: SignInResponse = serde_json::from_value(json!({
            "accesToken": "abc",
            "refreshToken": {"token": "r1"},
            "user": {"role": "admin"}
        }))
        .unwrap();
        assert_eq!(response.access_token.as_deref(), Some("abc"));
        assert_eq!(response.refresh_token.unwrap().token(), "r1");

        let response: SignInResponse =
            serde_json::from_value(json!({"accessToken": "xyz", "refreshToken": "r2"})).unwrap();
        assert_eq!(response.access_token.as_deref(), Some("xyz"));
        assert_eq!(response.refresh_token, Some(RefreshToken::Plain("r2".into())));
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut summary = UserSummary {
            id: "u1".into(),
            first_name: Some("Ada".into()),
            last_name: None,
            email: "ada@example.com".into(),
        };
        assert_eq!(summary.display_name(), "Ada");

        summary.last_name = Some("Lovelace".into());
        assert_eq!(summary.display_name(), "Ada Lovelace");

        summary.first_name = Some("  ".into());
        summary.last_name = None;
        assert_eq!(summary.display_name(), "ada@example.com");
    }

    #[test]
    fn test_query_params_skip_empty_filters() {
        let query = UserQuery {
            role: Some(String::new()),
            is_active: Some(false),
            search: Some("ada".into()),
            ..Default::default()
        };
        assert_eq!(
            query.to_params(),
            vec![("isActive", "false".to_string()), ("search", "ada".to_string())]
        );

        let update = UpdateProfileInput {
            first_name: Some(String::new()),
            phone: Some("555".into()),
            ..Default::default()
        };
        assert_eq!(update.form_fields(), vec![("phone", "555".to_string())]);
    }

    #[test]
    fn test_analytics_dates_use_millisecond_iso() {
        let start = DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let query = AnalyticsQuery { start_date: Some(start), end_date: None };
        assert_eq!(
            query.to_params(),
            vec![("startDate", "2024-03-01T00:00:00.000Z".to_string())]
        );
    }
}
