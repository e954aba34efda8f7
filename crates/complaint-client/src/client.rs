//! HTTP client for the complaint management REST API

use crate::error::{extract_message, ClientError, Result};
use crate::session::Session;
use crate::types::*;
use reqwest::{header, multipart, Client, RequestBuilder, StatusCode};
use std::time::Duration;

/// HTTP client for the complaint management REST API
///
/// Every call except sign-in and the password-reset pair attaches the
/// session's bearer token. A 401 answer clears the session.
///
/// # Example
///
/// ```rust,no_run
/// use complaint_client::{ApiClient, ClientConfig, PageRequest, Session};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClient::new(
///     ClientConfig {
///         base_url: "http://localhost:3000/api".into(),
///         ..Default::default()
///     },
///     Session::new(),
/// )?;
///
/// client.sign_in("staff@example.com", "correct horse").await?;
/// let page = client.list_complaints(PageRequest::new(1, 10)).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ClientConfig,
    client: Client,
    session: Session,
}

impl ApiClient {
    /// Create a new client bound to a session
    pub fn new(config: ClientConfig, session: Session) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(ClientError::Config("base_url must not be empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config: ClientConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            client,
            session,
        })
    }

    /// The session this client reads its token from
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ==================== Authentication ====================

    /// Sign in with email and password.
    ///
    /// The response is returned as-is; storing it in the session is the
    /// caller's decision since a 200 without a token is still a failure.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignInResponse> {
        let url = self.url("auth/signin");
        tracing::debug!(%url, "Signing in");

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&SignInRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Drop the local session
    pub fn sign_out(&self) {
        self.session.clear();
    }

    /// Request a password reset email
    pub async fn forgot_password(&self, email: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(self.url("employee/auth/forget-password"))
            .query(&[("email", email)])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Confirm a password reset with the emailed token
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(self.url("employee/auth/confirm-password"))
            .query(&[("token", token)])
            .json(&ResetPasswordRequest {
                new_password: new_password.to_string(),
            })
            .send()
            .await?;

        self.handle_response(response).await
    }

    // ==================== Complaints ====================

    /// List one page of complaints
    pub async fn list_complaints(&self, page: PageRequest) -> Result<Paginated<Complaint>> {
        let request = self
            .authorized(self.client.get(self.url("complaints")))?
            .query(&[("page", page.page), ("limit", page.limit)]);

        self.send(request).await
    }

    /// Get a complaint, optionally taking the advisory edit lock
    pub async fn get_complaint(&self, id: &str, lock: bool) -> Result<Complaint> {
        let mut request = self.authorized(
            self.client
                .get(self.url(&format!("complaints/{}", urlencoding::encode(id)))),
        )?;
        if lock {
            request = request.query(&[("lock", "true")]);
        }

        self.send(request).await
    }

    /// Append a note; returns the updated record
    pub async fn add_note(&self, id: &str, note: &str) -> Result<Complaint> {
        let request = self
            .authorized(
                self.client
                    .patch(self.url(&format!("complaints/{}/note", urlencoding::encode(id)))),
            )?
            .json(&AddNoteRequest {
                note: note.to_string(),
            });

        self.send(request).await
    }

    /// Transition the status; returns the updated record
    pub async fn change_status(&self, id: &str, status: ComplaintStatus) -> Result<Complaint> {
        let request = self
            .authorized(
                self.client
                    .patch(self.url(&format!("complaints/{}/status", urlencoding::encode(id)))),
            )?
            .json(&ChangeStatusRequest { status });

        self.send(request).await
    }

    // ==================== Users ====================

    /// The signed-in user's full record
    pub async fn get_me(&self) -> Result<User> {
        let request = self.authorized(self.client.get(self.url("me")))?;
        self.send(request).await
    }

    /// List users matching the query
    pub async fn list_users(&self, query: &UserQuery) -> Result<Paginated<User>> {
        let request = self
            .authorized(self.client.get(self.url("user")))?
            .query(&query.to_params());

        self.send(request).await
    }

    /// Minimal identity summary for a submitter
    pub async fn get_user_summary(&self, id: &str) -> Result<UserSummary> {
        let request = self.authorized(
            self.client
                .get(self.url(&format!("user/{}", urlencoding::encode(id)))),
        )?;

        self.send(request).await
    }

    /// Create a regular user account (multipart form)
    pub async fn create_user(
        &self,
        input: &CreateUserInput,
        picture: Option<ProfilePicture>,
    ) -> Result<serde_json::Value> {
        let form = Self::build_form(input.form_fields(), picture)?;
        let request = self
            .authorized(self.client.post(self.url("user")))?
            .multipart(form);

        self.send(request).await
    }

    /// Create a staff account
    pub async fn create_staff(&self, input: &CreateStaffInput) -> Result<User> {
        let request = self
            .authorized(self.client.post(self.url("staff")))?
            .json(input);

        self.send(request).await
    }

    /// Update the signed-in user's profile (multipart form)
    pub async fn update_profile(
        &self,
        input: &UpdateProfileInput,
        picture: Option<ProfilePicture>,
    ) -> Result<User> {
        let form = Self::build_form(input.form_fields(), picture)?;
        let request = self
            .authorized(self.client.patch(self.url("user/me")))?
            .multipart(form);

        self.send(request).await
    }

    /// Delete a user by ID
    pub async fn delete_user(&self, id: &str) -> Result<()> {
        let request = self.authorized(
            self.client
                .delete(self.url(&format!("user/{}", urlencoding::encode(id)))),
        )?;

        self.send_empty(request).await
    }

    /// Delete the signed-in user's own account
    pub async fn delete_me(&self) -> Result<()> {
        let request = self.authorized(self.client.delete(self.url("user/me")))?;
        self.send_empty(request).await
    }

    // ==================== Agencies ====================

    pub async fn list_agencies(&self) -> Result<Vec<Agency>> {
        let request = self.authorized(self.client.get(self.url("agencies")))?;
        self.send(request).await
    }

    pub async fn get_agency(&self, id: &str) -> Result<Agency> {
        let request = self.authorized(
            self.client
                .get(self.url(&format!("agencies/{}", urlencoding::encode(id)))),
        )?;
        self.send(request).await
    }

    pub async fn create_agency(&self, name: &str) -> Result<Agency> {
        let request = self
            .authorized(self.client.post(self.url("agencies")))?
            .json(&CreateAgencyRequest {
                name: name.to_string(),
            });
        self.send(request).await
    }

    // ==================== Analytics ====================

    pub async fn performance_stats(&self, query: &AnalyticsQuery) -> Result<PerformanceStats> {
        self.analytics("performance-stats", query).await
    }

    pub async fn complaints_by_status(&self, query: &AnalyticsQuery) -> Result<ComplaintsByStatus> {
        self.analytics("analytics/complaints-by-status", query).await
    }

    pub async fn complaints_by_agency(&self, query: &AnalyticsQuery) -> Result<ComplaintsByAgency> {
        self.analytics("analytics/complaints-by-agency", query).await
    }

    pub async fn complaints_by_type(&self, query: &AnalyticsQuery) -> Result<ComplaintsByType> {
        self.analytics("analytics/complaints-by-type", query).await
    }

    pub async fn resolution_time_stats(&self, query: &AnalyticsQuery) -> Result<ResolutionTimeStats> {
        self.analytics("analytics/resolution-time-stats", query).await
    }

    /// Download the analytics PDF report
    pub async fn pdf_report(&self, query: &AnalyticsQuery) -> Result<Vec<u8>> {
        let request = self
            .authorized(
                self.client
                    .get(self.url("general-managment/analytics/pdf-report")),
            )?
            .query(&query.to_params());

        let response = request.send().await?;
        let response = self.check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // ==================== Helper Methods ====================

    async fn analytics<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &AnalyticsQuery,
    ) -> Result<T> {
        // The backend route really is spelled "managment"
        let request = self
            .authorized(
                self.client
                    .get(self.url(&format!("general-managment/{}", endpoint))),
            )?
            .query(&query.to_params());

        self.send(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    /// Attach the bearer token, or fail without touching the network
    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match self.session.token() {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Err(ClientError::Unauthorized("No active session".to_string())),
        }
    }

    fn build_form(
        fields: Vec<(&'static str, String)>,
        picture: Option<ProfilePicture>,
    ) -> Result<multipart::Form> {
        let mut form = multipart::Form::new();
        for (name, value) in fields {
            form = form.text(name, value);
        }
        if let Some(picture) = picture {
            let part = multipart::Part::bytes(picture.bytes)
                .file_name(picture.file_name)
                .mime_str(&picture.mime_type)?;
            form = form.part("profilePicture", part);
        }
        Ok(form)
    }

    async fn send<T: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        self.handle_response(response).await
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<()> {
        let response = request.send().await?;
        self.check_status(response).await?;
        Ok(())
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let response = self.check_status(response).await?;
        let body = response.json().await?;
        Ok(body)
    }

    /// Map non-success statuses onto the error taxonomy
    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        let message = extract_message(&body);
        tracing::debug!(%url, status = status.as_u16(), %message, "Request failed");

        Err(match status {
            StatusCode::UNAUTHORIZED => {
                tracing::warn!("Bearer token rejected, tearing down session");
                self.session.clear();
                ClientError::Unauthorized(message)
            }
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => ClientError::Conflict {
                status: status.as_u16(),
                message,
            },
            _ => ClientError::Server {
                status: status.as_u16(),
                message,
            },
        })
    }
}
