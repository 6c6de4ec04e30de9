//! Scripted in-memory remote service for unit tests.

use crate::error::VitalsError;
use crate::remote::RemoteService;
use crate::types::{
    HistorySeries, ImportRequest, LoginRequest, LoginResponse, Metric, Period, ProfileUpdate,
    ProfileUpdateResponse, RawStats, Registration, UserDetails, UserId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Canned answer for one remote operation.
#[derive(Debug, Clone)]
pub(crate) enum Scripted<T> {
    Ok(T),
    Reject(u16, String),
    Offline,
}

impl<T: Clone> Scripted<T> {
    fn answer(&self) -> Result<T, VitalsError> {
        match self {
            Scripted::Ok(value) => Ok(value.clone()),
            Scripted::Reject(status, message) => Err(VitalsError::Remote {
                status: *status,
                message: message.clone(),
            }),
            Scripted::Offline => Err(VitalsError::Transport("connection refused".into())),
        }
    }
}

pub(crate) fn reject<T>(status: u16, message: &str) -> Scripted<T> {
    Scripted::Reject(status, message.to_string())
}

pub(crate) struct FakeRemote {
    pub login: Mutex<Scripted<UserId>>,
    pub register: Mutex<Scripted<()>>,
    pub logout: Mutex<Scripted<()>>,
    pub details: Mutex<HashMap<String, Scripted<UserDetails>>>,
    pub stats: Mutex<HashMap<String, Scripted<RawStats>>>,
    pub history: Mutex<Scripted<HistorySeries>>,
    pub import: Mutex<Scripted<()>>,
    pub profile: Mutex<Scripted<ProfileUpdateResponse>>,
    /// Calls held until the paired sender fires, keyed by `op:user_id`.
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            login: Mutex::new(Scripted::Offline),
            register: Mutex::new(Scripted::Ok(())),
            logout: Mutex::new(Scripted::Ok(())),
            details: Mutex::new(HashMap::new()),
            stats: Mutex::new(HashMap::new()),
            history: Mutex::new(Scripted::Ok(HistorySeries::default())),
            import: Mutex::new(Scripted::Ok(())),
            profile: Mutex::new(Scripted::Ok(ProfileUpdateResponse::default())),
            gates: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_login(&self, answer: Scripted<UserId>) {
        *self.login.lock().unwrap() = answer;
    }

    pub fn set_details(&self, user_id: &str, answer: Scripted<UserDetails>) {
        self.details
            .lock()
            .unwrap()
            .insert(user_id.to_string(), answer);
    }

    pub fn set_stats(&self, user_id: &str, answer: Scripted<RawStats>) {
        self.stats.lock().unwrap().insert(user_id.to_string(), answer);
    }

    /// Hold the next `op` call for `user_id` until the returned sender fires.
    pub fn gate(&self, op: &str, user_id: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .unwrap()
            .insert(format!("{}:{}", op, user_id), rx);
        tx
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn wait_gate(&self, op: &str, user_id: &UserId) {
        let gate = self
            .gates
            .lock()
            .unwrap()
            .remove(&format!("{}:{}", op, user_id));
        if let Some(rx) = gate {
            let _ = rx.await;
        }
    }
}

#[async_trait]
impl RemoteService for FakeRemote {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, VitalsError> {
        self.record(format!("login:{}", request.username));
        let answer = self.login.lock().unwrap().clone();
        answer.answer().map(|user_id| LoginResponse { user_id })
    }

    async fn register(&self, registration: &Registration) -> Result<(), VitalsError> {
        self.record(format!("register:{}", registration.username));
        let answer = self.register.lock().unwrap().clone();
        answer.answer()
    }

    async fn logout(&self) -> Result<(), VitalsError> {
        self.record("logout".into());
        let answer = self.logout.lock().unwrap().clone();
        answer.answer()
    }

    async fn user_details(&self, user_id: &UserId) -> Result<UserDetails, VitalsError> {
        self.record(format!("user_details:{}", user_id));
        self.wait_gate("user_details", user_id).await;
        let answer = self
            .details
            .lock()
            .unwrap()
            .get(user_id.as_str())
            .cloned()
            .unwrap_or_else(|| reject(404, "Error fetching user details"));
        answer.answer()
    }

    async fn current_stats(&self, user_id: &UserId) -> Result<RawStats, VitalsError> {
        self.record(format!("current_stats:{}", user_id));
        self.wait_gate("current_stats", user_id).await;
        let answer = self
            .stats
            .lock()
            .unwrap()
            .get(user_id.as_str())
            .cloned()
            .unwrap_or_else(|| reject(404, "Error fetching current statistics"));
        answer.answer()
    }

    async fn history(
        &self,
        user_id: &UserId,
        metric: Metric,
        period: Period,
    ) -> Result<HistorySeries, VitalsError> {
        self.record(format!("history:{}:{}:{}", user_id, metric, period));
        let answer = self.history.lock().unwrap().clone();
        answer.answer()
    }

    async fn import_data(
        &self,
        user_id: &UserId,
        request: &ImportRequest,
    ) -> Result<(), VitalsError> {
        self.record(format!("import:{}:{}", user_id, request.import_type));
        let answer = self.import.lock().unwrap().clone();
        answer.answer()
    }

    async fn update_profile(
        &self,
        user_id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<ProfileUpdateResponse, VitalsError> {
        self.record(format!("update_profile:{}:{}", user_id, update.username));
        let answer = self.profile.lock().unwrap().clone();
        answer.answer()
    }
}
