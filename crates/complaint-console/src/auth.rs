//! Sign-in and password reset flows

use complaint_client::{ApiClient, ClientError, SessionData};
use std::sync::Mutex;

use crate::error::{ConsoleError, Result};

const LOGIN_FAILED: &str = "Login failed";
const NO_TOKEN: &str = "Login failed - invalid response";

/// Minimum password length accepted by the sign-in form
pub const MIN_PASSWORD_LEN: usize = 8;

/// Sign-in form state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    Ready,
    Loading,
    Failed(String),
}

/// Result of a sign-in attempt that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    SignedIn(SessionData),
    /// Another attempt was already in flight
    Ignored,
}

/// Check the sign-in form before contacting the server
pub fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if email.chars().count() < 3 || !email.contains(".com") {
        return Err(ConsoleError::Validation("Invalid Email".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ConsoleError::Validation("Incorrect password".into()));
    }
    Ok(())
}

/// Sign-in flow bound to an API client and its session
pub struct LoginFlow {
    client: ApiClient,
    state: Mutex<LoginState>,
}

impl LoginFlow {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            state: Mutex::new(LoginState::Ready),
        }
    }

    pub fn state(&self) -> LoginState {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_state(&self, state: LoginState) {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = state;
    }

    /// Validate, sign in, and store the token in the session.
    ///
    /// A response without an access token is a failure even on HTTP 200.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        if let Err(err) = validate_credentials(email, password) {
            self.set_state(LoginState::Failed(err.user_message("")));
            return Err(err);
        }

        {
            let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if *state == LoginState::Loading {
                tracing::debug!("Sign-in already in progress, ignoring");
                return Ok(LoginOutcome::Ignored);
            }
            *state = LoginState::Loading;
        }

        let response = match self.client.sign_in(email, password).await {
            Ok(response) => response,
            Err(err) => {
                let message = login_error_message(&err);
                tracing::warn!(error = %err, "Sign-in failed");
                self.set_state(LoginState::Failed(message.clone()));
                return Err(ConsoleError::Rejected {
                    status: err.status().unwrap_or_default(),
                    message,
                });
            }
        };

        let Some(data) = SessionData::from_sign_in(&response) else {
            let message = response
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| NO_TOKEN.to_string());
            tracing::warn!("Sign-in response carried no access token");
            self.set_state(LoginState::Failed(message.clone()));
            return Err(ConsoleError::Rejected { status: 200, message });
        };

        self.client.session().establish(data.clone());
        self.set_state(LoginState::Ready);
        tracing::info!(role = data.role.as_deref().unwrap_or_default(), "Signed in");
        Ok(LoginOutcome::SignedIn(data))
    }

    /// Drop the local session
    pub fn sign_out(&self) {
        self.client.sign_out();
        self.set_state(LoginState::Ready);
    }
}

/// Server message, else transport message, else a generic fallback
fn login_error_message(err: &ClientError) -> String {
    if let Some(message) = err.server_message().filter(|m| !m.is_empty()) {
        return message.to_string();
    }
    match err {
        ClientError::Http(inner) => inner.to_string(),
        _ => LOGIN_FAILED.to_string(),
    }
}

/// Ask the server to email a password reset link
pub async fn request_password_reset(client: &ApiClient, email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ConsoleError::Validation("Email is required".into()));
    }
    client.forgot_password(email).await?;
    tracing::info!("Password reset requested");
    Ok(())
}

/// Set a new password using the emailed reset token
pub async fn confirm_password_reset(client: &ApiClient, token: &str, new_password: &str) -> Result<()> {
    if token.trim().is_empty() {
        return Err(ConsoleError::Validation("Reset token is required".into()));
    }
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ConsoleError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    client.reset_password(token.trim(), new_password).await?;
    tracing::info!("Password reset confirmed");
    Ok(())
}
