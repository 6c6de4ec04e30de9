//! Core of the vitals health client: the session lifecycle and the metrics
//! derivation pipeline, independent of any transport or UI.

pub mod config;
pub mod error;
pub mod event_bus;
pub mod metrics;
pub mod overview;
pub mod remote;
pub mod session;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{AppConfig, Goals};
pub use error::VitalsError;
pub use event_bus::{Route, SessionBus, SessionEvent, SessionEventKind};
pub use metrics::{MetricsAggregator, StatsState};
pub use overview::{derive_overview, DerivedActivity, Overview};
pub use remote::RemoteService;
pub use session::{AuthOutcome, Session, SessionManager, SessionStatus};
pub use store::{FileStore, MemoryStore, PersistentStore};
pub use types::{CurrentUser, RawStats, UserId};
