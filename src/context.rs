//! Shared wiring for the one-shot commands and the interactive shell.

use crate::render;
use anyhow::{bail, Context as _, Result};
use std::path::Path;
use std::sync::Arc;
use vitals_core::config::AppConfig;
use vitals_core::types::{Metric, Period, ProfileUpdate, Registration};
use vitals_core::{
    FileStore, MetricsAggregator, RemoteService, SessionBus, SessionManager, SessionStatus,
    StatsState,
};
use vitals_http::HttpRemoteService;

pub struct Context {
    pub config: AppConfig,
    pub session: SessionManager,
    pub metrics: MetricsAggregator,
}

impl Context {
    /// Build the service client, session and aggregator from config, then
    /// resolve any session left in the store by a previous run.
    pub async fn connect(config: AppConfig) -> Result<Self> {
        let ctx = Self::without_restore(config)?;
        let status = ctx.session.restore().await;
        tracing::debug!(?status, endpoint = %ctx.config.api.base_url, "connected");
        Ok(ctx)
    }

    /// Same wiring as [`connect`](Self::connect) but a stored session stays
    /// `Resolving`; no profile request is made.
    pub fn without_restore(config: AppConfig) -> Result<Self> {
        let remote: Arc<dyn RemoteService> = Arc::new(HttpRemoteService::new(&config.api)?);
        Ok(Self::with_remote(config, remote))
    }

    fn with_remote(config: AppConfig, remote: Arc<dyn RemoteService>) -> Self {
        let store = FileStore::new(config.session_path());
        let session = SessionManager::new(remote.clone(), store, SessionBus::new());
        let metrics = MetricsAggregator::new(remote, config.goals);
        Self {
            config,
            session,
            metrics,
        }
    }

    pub fn signed_in(&self) -> bool {
        self.session.status() == SessionStatus::Authenticated
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let outcome = self.session.login(username, password).await;
        match outcome.error {
            None => {
                if let Some(user_id) = self.session.user_id() {
                    println!("Signed in as user {}", user_id);
                }
                Ok(())
            }
            Some(message) => bail!(message),
        }
    }

    pub async fn register(&self, registration: &Registration) -> Result<()> {
        let outcome = self.session.register(registration).await;
        match outcome.error {
            None => Ok(()),
            Some(message) => bail!(message),
        }
    }

    pub async fn logout(&self) {
        self.session.logout().await;
        self.metrics.reset();
        println!("Signed out.");
    }

    pub fn whoami(&self) {
        match self.session.current_user() {
            Some(user) => print!("{}", render::user(&user)),
            None => println!("Not signed in."),
        }
    }

    pub async fn overview(&self) -> Result<()> {
        if !self.signed_in() {
            bail!("Not signed in");
        }
        match self.metrics.refresh_for(&self.session).await {
            StatsState::Success(snapshot) => {
                print!("{}", render::overview(&snapshot.overview));
                Ok(())
            }
            StatsState::Failure(message) => bail!(message),
            StatsState::Idle | StatsState::Loading => Ok(()),
        }
    }

    pub async fn history(&self, metric: Metric, period: Period) -> Result<()> {
        let Some(user_id) = self.session.user_id() else {
            bail!("Not signed in");
        };
        let series = self
            .metrics
            .load_history(&user_id, metric, period)
            .await
            .map_err(anyhow::Error::msg)?;
        print!("{}", render::history(&series, metric, period));
        Ok(())
    }

    pub async fn import(&self, import_type: &str, file: &Path) -> Result<()> {
        let Some(user_id) = self.session.user_id() else {
            bail!("Not signed in");
        };
        let records = read_records(file)?;
        let count = records.len();
        let state = self
            .metrics
            .import_data(&user_id, import_type, records)
            .await
            .map_err(anyhow::Error::msg)?;
        println!("Imported {} {} records.", count, import_type);
        if let StatsState::Success(snapshot) = state {
            print!("{}", render::overview(&snapshot.overview));
        }
        Ok(())
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<()> {
        let response = self.session.update_profile(update).await?;
        if response.message.is_empty() {
            println!("Profile updated.");
        } else {
            println!("{}", response.message);
        }
        if response.credentials_changed {
            println!("Credentials changed; use the new password next time you sign in.");
        }
        Ok(())
    }
}

/// Records from a JSON file: either a bare array or an object with `data`.
pub fn read_records(path: &Path) -> Result<Vec<serde_json::Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", path.display()))?;
    match value {
        serde_json::Value::Array(items) => Ok(items),
        serde_json::Value::Object(mut map) => match map.remove("data") {
            Some(serde_json::Value::Array(items)) => Ok(items),
            _ => bail!("{}: expected an array or an object with a 'data' array", path.display()),
        },
        _ => bail!("{}: expected an array or an object with a 'data' array", path.display()),
    }
}
