//! Wiring for one signed-in console session

use complaint_client::{ApiClient, Complaint, Session};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::agencies::AgencyDirectory;
use crate::auth::LoginFlow;
use crate::config::ConsoleConfig;
use crate::dashboard::{self, DashboardData, DateRange};
use crate::editor::ComplaintEditor;
use crate::error::{ConsoleError, Result};
use crate::feed::{ComplaintFeed, LoadReport};
use crate::gateway::ComplaintGateway;
use crate::lock::LockCoordinator;
use crate::users::UserDirectory;

/// The console's components, sharing one gateway, lock table and feed.
///
/// Must be created inside a tokio runtime; it spawns the lock-expiry watcher.
pub struct Console {
    config: ConsoleConfig,
    client: ApiClient,
    gateway: Arc<dyn ComplaintGateway>,
    locks: Arc<LockCoordinator>,
    feed: Arc<ComplaintFeed>,
    editor: Arc<ComplaintEditor>,
    lock_watcher: JoinHandle<()>,
}

impl Console {
    /// Build a console talking to the configured REST API
    pub fn new(config: ConsoleConfig, session: Session) -> Result<Self> {
        config.validate()?;
        let client = ApiClient::new(config.client_config(), session)?;
        let gateway: Arc<dyn ComplaintGateway> = Arc::new(client.clone());
        Ok(Self::with_gateway(config, client, gateway))
    }

    /// Build a console whose complaint traffic goes through `gateway`
    pub fn with_gateway(config: ConsoleConfig, client: ApiClient, gateway: Arc<dyn ComplaintGateway>) -> Self {
        let locks = Arc::new(LockCoordinator::new(Arc::clone(&gateway), config.lock_ttl()));
        let feed = Arc::new(
            ComplaintFeed::new(Arc::clone(&gateway), config.page_size)
                .with_scroll_threshold(config.scroll_threshold_px),
        );
        let editor = Arc::new(ComplaintEditor::new(
            Arc::clone(&gateway),
            Arc::clone(&locks),
            Arc::clone(&feed),
        ));
        let lock_watcher = editor.watch_lock_events();

        Self {
            config,
            client,
            gateway,
            locks,
            feed,
            editor,
            lock_watcher,
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn session(&self) -> &Session {
        self.client.session()
    }

    pub fn locks(&self) -> &Arc<LockCoordinator> {
        &self.locks
    }

    pub fn feed(&self) -> &Arc<ComplaintFeed> {
        &self.feed
    }

    pub fn editor(&self) -> &Arc<ComplaintEditor> {
        &self.editor
    }

    pub fn login(&self) -> LoginFlow {
        LoginFlow::new(self.client.clone())
    }

    pub fn agencies(&self) -> AgencyDirectory {
        AgencyDirectory::new(self.client.clone())
    }

    pub fn users(&self) -> UserDirectory {
        UserDirectory::new(self.client.clone())
    }

    /// Load complaints, tearing the session down on 401
    pub async fn load_complaints(&self, reset: bool) -> Result<LoadReport> {
        let result = self.feed.load(reset).await;
        self.check(result).await
    }

    /// Fetch one complaint without locking it
    pub async fn complaint(&self, id: &str) -> Result<Complaint> {
        let result = self.gateway.get_complaint(id, false).await;
        self.check(result).await
    }

    pub async fn dashboard(&self, range: &DateRange) -> DashboardData {
        dashboard::load_dashboard(&self.client, range).await
    }

    pub async fn report(&self, range: &DateRange) -> Result<(String, Vec<u8>)> {
        let result = dashboard::download_report(&self.client, range).await;
        self.check(result).await
    }

    /// Close every edit, drop the submitter cache and the session
    pub async fn sign_out(&self) {
        self.teardown().await;
        self.client.sign_out();
    }

    /// Session-ending cleanup after a 401 or sign-out
    pub async fn teardown(&self) {
        self.editor.teardown().await;
        self.feed.directory().invalidate();
        self.session().clear();
    }

    async fn check<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(ConsoleError::Unauthorized(_)) = &result {
            self.teardown().await;
        }
        result
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        self.lock_watcher.abort();
    }
}
