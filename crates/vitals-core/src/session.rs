//! Session lifecycle: sign-in state, its persistence, and its side effects.
//!
//! States:
//!
//! ```text
//!   Anonymous ──login ok──▶ Authenticated ◀──restore── Resolving
//!       │                        │                    (stored id at start)
//!   login failed                logout
//!       ▼                        ▼
//!   AuthenticationFailed ──▶ Anonymous
//! ```
//!
//! A failed login never touches the [`Session`] value or the store; the
//! `AuthenticationFailed` status only marks an anonymous session whose last
//! attempt was rejected. Logout always ends in `Anonymous`.

use crate::error::VitalsError;
use crate::event_bus::{Route, SessionBus, SessionEvent, SessionEventKind};
use crate::remote::{messages, RemoteService};
use crate::store::{PersistentStore, USER_ID_KEY};
use crate::types::{
    CurrentUser, LoginRequest, ProfileUpdate, ProfileUpdateResponse, Registration, UserDetails,
    UserId,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Notice carried to the login surface after a successful registration.
pub const REGISTRATION_NOTICE: &str = "Registration successful!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Anonymous,
    /// A stored id exists but its profile has not been fetched yet.
    Resolving,
    Authenticated,
    AuthenticationFailed,
}

/// Resolved identity of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Session {
    pub user_id: Option<UserId>,
    /// Only meaningful while `user_id` is set.
    pub details: Option<UserDetails>,
}

impl Session {
    /// `{id}` merged with the profile; `None` when anonymous.
    pub fn current_user(&self) -> Option<CurrentUser> {
        self.user_id
            .as_ref()
            .map(|id| CurrentUser::merge(id, self.details.as_ref()))
    }
}

/// Result of a login or register call. Failures are values, never errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

struct SessionState {
    session: Session,
    status: SessionStatus,
    last_error: Option<String>,
}

struct Inner {
    remote: Arc<dyn RemoteService>,
    store: Box<dyn PersistentStore>,
    bus: SessionBus,
    state: RwLock<SessionState>,
    /// Bumped on every identity change; a details response carrying an older
    /// value is dropped.
    details_generation: AtomicU64,
}

/// Owns the authentication state. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Build the manager, taking exclusive ownership of the store.
    ///
    /// Starts `Resolving` when the store already holds a user id. Call
    /// [`restore`](Self::restore) to fetch that user's profile.
    pub fn new(
        remote: Arc<dyn RemoteService>,
        store: impl PersistentStore + 'static,
        bus: SessionBus,
    ) -> Self {
        let stored = match store.get(USER_ID_KEY) {
            Ok(value) => value.filter(|id| !id.is_empty()).map(UserId::new),
            Err(e) => {
                warn!("Could not read stored session, starting anonymous: {}", e);
                None
            }
        };
        let status = if stored.is_some() {
            SessionStatus::Resolving
        } else {
            SessionStatus::Anonymous
        };
        debug!(?status, "session manager initialised");

        Self {
            inner: Arc::new(Inner {
                remote,
                store: Box::new(store),
                bus,
                state: RwLock::new(SessionState {
                    session: Session {
                        user_id: stored,
                        details: None,
                    },
                    status,
                    last_error: None,
                }),
                details_generation: AtomicU64::new(0),
            }),
        }
    }

    // ── Snapshots ───────────────────────────────────────────────────────

    pub fn status(&self) -> SessionStatus {
        self.read_state().status
    }

    pub fn session(&self) -> Session {
        self.read_state().session.clone()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.read_state().session.user_id.clone()
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.read_state().session.current_user()
    }

    /// Message of the most recent rejected login, cleared by the next
    /// successful login or logout.
    pub fn last_error(&self) -> Option<String> {
        self.read_state().last_error.clone()
    }

    pub fn bus(&self) -> &SessionBus {
        &self.inner.bus
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.bus.subscribe()
    }

    // ── Operations ──────────────────────────────────────────────────────

    /// Resolve a session restored from the store by fetching its profile.
    ///
    /// A failed fetch still ends `Authenticated`, with the bare id as the
    /// visible user. No-op unless the status is `Resolving`.
    pub async fn restore(&self) -> SessionStatus {
        let user_id = {
            let state = self.read_state();
            match (&state.status, &state.session.user_id) {
                (SessionStatus::Resolving, Some(id)) => id.clone(),
                _ => return state.status,
            }
        };
        let generation = self.next_generation();
        self.resolve_details(user_id, generation).await;
        self.status()
    }

    pub async fn login(&self, username: &str, password: &str) -> AuthOutcome {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = match self.inner.remote.login(&request).await {
            Ok(response) => response,
            Err(e) => return self.reject_login(e.user_message(messages::LOGIN_FAILED)),
        };

        let user_id = response.user_id;
        if let Err(e) = self.inner.store.set(USER_ID_KEY, user_id.as_str()) {
            warn!("Could not persist session for user {}: {}", user_id, e);
            return self.reject_login(e.user_message(messages::LOGIN_FAILED));
        }

        {
            let mut state = self.write_state();
            state.session = Session {
                user_id: Some(user_id.clone()),
                details: None,
            };
            state.status = SessionStatus::Authenticated;
            state.last_error = None;
        }
        info!("Signed in as user {}", user_id);

        self.inner.bus.publish(SessionEventKind::StatusChanged {
            status: SessionStatus::Authenticated,
        });
        self.inner.bus.publish(SessionEventKind::Navigate {
            route: Route::Dashboard,
        });
        self.spawn_details_fetch(user_id);

        AuthOutcome::ok()
    }

    /// Create an account. Session state is never touched; on success the
    /// user is sent to the login surface with a notice.
    pub async fn register(&self, registration: &Registration) -> AuthOutcome {
        match self.inner.remote.register(registration).await {
            Ok(()) => {
                info!("Registered user {}", registration.username);
                self.inner.bus.publish(SessionEventKind::Navigate {
                    route: Route::Login {
                        notice: Some(REGISTRATION_NOTICE.to_string()),
                    },
                });
                AuthOutcome::ok()
            }
            Err(e) => {
                let message = e.user_message(messages::REGISTRATION_FAILED);
                warn!("Registration failed: {}", message);
                AuthOutcome::failed(message)
            }
        }
    }

    /// Sign out. Local cleanup happens whatever the service answers.
    pub async fn logout(&self) {
        if let Err(e) = self.inner.remote.logout().await {
            warn!("Logout failed: {}", e.user_message(messages::LOGOUT_FAILED));
        }

        if let Err(e) = self.inner.store.remove(USER_ID_KEY) {
            warn!("Could not clear stored session: {}", e);
        }
        self.next_generation();
        {
            let mut state = self.write_state();
            state.session = Session::default();
            state.status = SessionStatus::Anonymous;
            state.last_error = None;
        }
        info!("Signed out");

        self.inner.bus.publish(SessionEventKind::StatusChanged {
            status: SessionStatus::Anonymous,
        });
        self.inner.bus.publish(SessionEventKind::Navigate {
            route: Route::Login { notice: None },
        });
    }

    /// Update the signed-in user's profile, then refresh the visible user.
    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> Result<ProfileUpdateResponse, VitalsError> {
        let user_id = self.user_id().ok_or(VitalsError::NotAuthenticated)?;
        let response = self.inner.remote.update_profile(&user_id, update).await?;
        if response.credentials_changed {
            info!("Credentials changed for user {}", user_id);
        }
        self.spawn_details_fetch(user_id);
        Ok(response)
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn reject_login(&self, message: String) -> AuthOutcome {
        warn!("Login failed: {}", message);
        let became_failed = {
            let mut state = self.write_state();
            state.last_error = Some(message.clone());
            if state.session.user_id.is_none() && state.status != SessionStatus::AuthenticationFailed {
                state.status = SessionStatus::AuthenticationFailed;
                true
            } else {
                false
            }
        };
        if became_failed {
            self.inner.bus.publish(SessionEventKind::StatusChanged {
                status: SessionStatus::AuthenticationFailed,
            });
        }
        AuthOutcome::failed(message)
    }

    fn next_generation(&self) -> u64 {
        self.inner.details_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn spawn_details_fetch(&self, user_id: UserId) {
        let generation = self.next_generation();
        let manager = self.clone();
        tokio::spawn(async move {
            manager.resolve_details(user_id, generation).await;
        });
    }

    /// Fetch and merge details for `user_id`. Returns false when the result
    /// was discarded because the identity changed in the meantime.
    async fn resolve_details(&self, user_id: UserId, generation: u64) -> bool {
        let result = self.inner.remote.user_details(&user_id).await;

        let (loaded, resolved) = {
            let mut state = self.write_state();
            let current = self.inner.details_generation.load(Ordering::SeqCst);
            if current != generation || state.session.user_id.as_ref() != Some(&user_id) {
                debug!("Discarding stale details for user {}", user_id);
                return false;
            }
            let loaded = match result {
                Ok(details) => {
                    state.session.details = Some(details);
                    true
                }
                Err(e) => {
                    warn!(
                        "Error loading user details: {}",
                        e.user_message(messages::USER_DETAILS_FAILED)
                    );
                    state.session.details = None;
                    false
                }
            };
            let resolved = state.status == SessionStatus::Resolving;
            if resolved {
                state.status = SessionStatus::Authenticated;
            }
            (loaded, resolved)
        };

        if resolved {
            self.inner.bus.publish(SessionEventKind::StatusChanged {
                status: SessionStatus::Authenticated,
            });
        }
        self.inner
            .bus
            .publish(SessionEventKind::DetailsResolved { user_id, loaded });
        true
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.state.write().unwrap_or_else(|e| e.into_inner())
    }
}
