//! Agency list and creation

use complaint_client::{Agency, ApiClient};

use crate::error::{ConsoleError, Result};

const LOAD_FAILED: &str = "Failed to load agencies";
const CREATE_FAILED: &str = "Failed to create agency";

/// Agencies view state
pub struct AgencyDirectory {
    client: ApiClient,
    agencies: Vec<Agency>,
    error: Option<String>,
}

impl AgencyDirectory {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            agencies: Vec::new(),
            error: None,
        }
    }

    pub fn agencies(&self) -> &[Agency] {
        &self.agencies
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replace the list with the server's
    pub async fn load(&mut self) -> Result<&[Agency]> {
        self.error = None;
        match self.client.list_agencies().await {
            Ok(agencies) => {
                tracing::debug!(count = agencies.len(), "Agencies loaded");
                self.agencies = agencies;
                Ok(&self.agencies)
            }
            Err(err) => {
                let err = ConsoleError::from(err);
                tracing::warn!(error = %err, "Failed to load agencies");
                self.error = Some(err.user_message(LOAD_FAILED));
                Err(err)
            }
        }
    }

    pub async fn get(&self, id: &str) -> Result<Agency> {
        Ok(self.client.get_agency(id).await?)
    }

    /// Create an agency and append it locally
    pub async fn create(&mut self, name: &str) -> Result<Agency> {
        let name = name.trim();
        if name.is_empty() {
            let err = ConsoleError::Validation("Agency name is required".into());
            self.error = Some(err.user_message(""));
            return Err(err);
        }

        self.error = None;
        match self.client.create_agency(name).await {
            Ok(agency) => {
                tracing::info!(agency_id = %agency.id, "Agency created");
                self.agencies.push(agency.clone());
                Ok(agency)
            }
            Err(err) => {
                let err = ConsoleError::from(err);
                tracing::warn!(error = %err, "Failed to create agency");
                self.error = Some(err.user_message(CREATE_FAILED));
                Err(err)
            }
        }
    }
}
