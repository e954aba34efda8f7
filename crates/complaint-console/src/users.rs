//! User and staff account management

use complaint_client::{
    roles, ApiClient, CreateStaffInput, CreateUserInput, ProfilePicture, StaffRole, UpdateProfileInput,
    User, UserQuery,
};

use crate::error::{ConsoleError, Result};

/// Filters offered by the users view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilters {
    pub role: Option<String>,
    pub active: Option<bool>,
    pub search: Option<String>,
}

impl UserFilters {
    pub fn to_query(&self) -> UserQuery {
        UserQuery {
            role: self.role.clone().filter(|r| !r.is_empty()),
            is_active: self.active,
            search: self.search.clone().filter(|s| !s.is_empty()),
            ..Default::default()
        }
    }
}

/// Only admins may provision staff admins
pub fn can_add_admins(role: &str) -> bool {
    role == roles::ADMIN
}

/// Admins and staff admins may create accounts
pub fn can_add_users(role: &str) -> bool {
    role == roles::ADMIN || role == roles::STAFF_ADMIN
}

/// Staff roles the given role may create
pub fn available_target_roles(role: &str) -> Vec<StaffRole> {
    match role {
        roles::ADMIN => vec![StaffRole::StaffAdmin, StaffRole::ComplaintStaff],
        roles::STAFF_ADMIN => vec![StaffRole::ComplaintStaff],
        _ => Vec::new(),
    }
}

pub fn role_display_name(role: &str) -> &str {
    match role {
        roles::ADMIN => "Admin",
        roles::STAFF_ADMIN => "Staff Admin",
        roles::COMPLAINT_STAFF => "Complaint Staff",
        roles::USER => "User",
        other => other,
    }
}

pub fn validate_new_user(input: &CreateUserInput) -> Result<()> {
    if input.email.trim().is_empty() || input.phone.trim().is_empty() {
        return Err(ConsoleError::Validation("Email and phone are required".into()));
    }
    Ok(())
}

/// Check a staff request against the creator's role
pub fn validate_new_staff(creator_role: &str, input: &CreateStaffInput) -> Result<()> {
    if input.email.trim().is_empty() || input.phone.trim().is_empty() {
        return Err(ConsoleError::Validation(
            "Email, phone, and target role are required".into(),
        ));
    }
    if creator_role == roles::STAFF_ADMIN && input.target_role == StaffRole::StaffAdmin {
        return Err(ConsoleError::Validation(
            "Staff admins can only create complaint staff".into(),
        ));
    }
    let has_agency = input.agency_id.as_deref().is_some_and(|id| !id.trim().is_empty());
    if input.target_role == StaffRole::ComplaintStaff && !has_agency {
        return Err(ConsoleError::Validation(
            "Agency ID is required for complaint staff".into(),
        ));
    }
    Ok(())
}

/// Users view state
pub struct UserDirectory {
    client: ApiClient,
    users: Vec<User>,
    current_user: Option<User>,
    current_role: String,
    filters: UserFilters,
    error: Option<String>,
}

impl UserDirectory {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            users: Vec::new(),
            current_user: None,
            current_role: String::new(),
            filters: UserFilters::default(),
            error: None,
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn current_role(&self) -> &str {
        &self.current_role
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_filters(&mut self, filters: UserFilters) {
        self.filters = filters;
    }

    pub fn can_add_admins(&self) -> bool {
        can_add_admins(&self.current_role)
    }

    pub fn can_add_users(&self) -> bool {
        can_add_users(&self.current_role)
    }

    /// Load the signed-in user; falls back to the session's role on failure
    pub async fn load_current_user(&mut self) -> Option<&User> {
        match self.client.get_me().await {
            Ok(user) => {
                self.current_role = user.role.clone();
                self.current_user = Some(user);
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to load current user, using session role");
                let session = self.client.session();
                self.current_role = session
                    .user()
                    .and_then(|user| user.role)
                    .or_else(|| session.role())
                    .unwrap_or_default();
            }
        }
        self.current_user.as_ref()
    }

    /// Reload the list with the current filters
    pub async fn load(&mut self) -> Result<&[User]> {
        self.error = None;
        match self.client.list_users(&self.filters.to_query()).await {
            Ok(page) => {
                tracing::debug!(count = page.items.len(), "Users loaded");
                self.users = page.items;
                Ok(&self.users)
            }
            Err(err) => Err(self.fail(err.into(), "Failed to load users")),
        }
    }

    pub async fn create_user(
        &mut self,
        input: &CreateUserInput,
        picture: Option<ProfilePicture>,
    ) -> Result<()> {
        if let Err(err) = validate_new_user(input) {
            return Err(self.fail(err, ""));
        }

        self.error = None;
        if let Err(err) = self.client.create_user(input, picture).await {
            return Err(self.fail(err.into(), "Failed to create user"));
        }
        tracing::info!("User created");
        self.reload_after_change().await;
        Ok(())
    }

    pub async fn create_staff(&mut self, input: &CreateStaffInput) -> Result<User> {
        if let Err(err) = validate_new_staff(&self.current_role, input) {
            return Err(self.fail(err, ""));
        }

        self.error = None;
        let staff = match self.client.create_staff(input).await {
            Ok(staff) => staff,
            Err(err) => return Err(self.fail(err.into(), "Failed to create staff")),
        };
        tracing::info!(user_id = %staff.id, role = input.target_role.as_str(), "Staff created");
        self.reload_after_change().await;
        Ok(staff)
    }

    /// Delete an account; admin accounts are refused locally
    pub async fn delete_user(&mut self, user: &User) -> Result<()> {
        if user.role == roles::ADMIN {
            return Err(self.fail(
                ConsoleError::Validation("Cannot delete admin user".into()),
                "",
            ));
        }

        if let Err(err) = self.client.delete_user(&user.id).await {
            return Err(self.fail(err.into(), "Failed to delete user"));
        }
        tracing::info!(user_id = %user.id, "User deleted");
        self.reload_after_change().await;
        Ok(())
    }

    pub async fn update_profile(
        &mut self,
        input: &UpdateProfileInput,
        picture: Option<ProfilePicture>,
    ) -> Result<User> {
        match self.client.update_profile(input, picture).await {
            Ok(user) => {
                self.current_role = user.role.clone();
                self.current_user = Some(user.clone());
                Ok(user)
            }
            Err(err) => Err(self.fail(err.into(), "Failed to update profile")),
        }
    }

    async fn reload_after_change(&mut self) {
        if let Err(err) = self.load().await {
            tracing::warn!(error = %err, "Failed to reload users after change");
        }
    }

    fn fail(&mut self, err: ConsoleError, fallback: &str) -> ConsoleError {
        tracing::warn!(error = %err, "User operation failed");
        self.error = Some(err.user_message(fallback));
        err
    }
}
