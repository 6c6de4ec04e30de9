//! Current-stats loading for the dashboard.

use crate::config::Goals;
use crate::overview::{derive_overview, Overview};
use crate::remote::{messages, RemoteService};
use crate::session::SessionManager;
use crate::types::{HistorySeries, ImportRequest, Metric, Period, RawStats, UserId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// A successful load: the raw stats and what was derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub user_id: UserId,
    pub stats: RawStats,
    pub overview: Overview,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatsState {
    /// Nothing requested yet, or discarded by [`MetricsAggregator::reset`].
    Idle,
    Loading,
    Success(Box<StatsSnapshot>),
    Failure(String),
}

impl StatsState {
    pub fn snapshot(&self) -> Option<&StatsSnapshot> {
        match self {
            StatsState::Success(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

pub struct MetricsAggregator {
    remote: Arc<dyn RemoteService>,
    goals: Goals,
    state: RwLock<StatsState>,
    /// Tag of the newest load; older responses are dropped.
    generation: AtomicU64,
}

impl MetricsAggregator {
    pub fn new(remote: Arc<dyn RemoteService>, goals: Goals) -> Self {
        Self {
            remote,
            goals,
            state: RwLock::new(StatsState::Idle),
            generation: AtomicU64::new(0),
        }
    }

    pub fn goals(&self) -> &Goals {
        &self.goals
    }

    pub fn state(&self) -> StatsState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Fetch the current stats for `user_id` and derive the overview.
    ///
    /// Returns the state after this call. When a newer load was started
    /// while this one was in flight, this response is dropped and the
    /// returned state is whatever the newer load left.
    pub async fn load_current_stats(&self, user_id: &UserId) -> StatsState {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_state(StatsState::Loading);

        let next = match self.remote.current_stats(user_id).await {
            Ok(stats) => {
                let overview = derive_overview(&stats, &self.goals);
                StatsState::Success(Box::new(StatsSnapshot {
                    user_id: user_id.clone(),
                    stats,
                    overview,
                }))
            }
            Err(e) => {
                let message = e.user_message(messages::CURRENT_STATS_FAILED);
                warn!("Loading stats for user {} failed: {}", user_id, message);
                StatsState::Failure(message)
            }
        };

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Dropping stale stats response for user {}", user_id);
            return state.clone();
        }
        *state = next;
        state.clone()
    }

    /// Load for whoever the session says is signed in; resets when nobody is.
    pub async fn refresh_for(&self, session: &SessionManager) -> StatsState {
        match session.user_id() {
            Some(user_id) => self.load_current_stats(&user_id).await,
            None => {
                self.reset();
                StatsState::Idle
            }
        }
    }

    /// Metric history over a period. Errors come back as display messages.
    pub async fn load_history(
        &self,
        user_id: &UserId,
        metric: Metric,
        period: Period,
    ) -> Result<HistorySeries, String> {
        self.remote
            .history(user_id, metric, period)
            .await
            .map_err(|e| {
                let message = e.user_message(messages::HISTORY_FAILED);
                warn!("Loading {} history failed: {}", metric, message);
                message
            })
    }

    /// Upload records, then reload the current stats so the dashboard
    /// reflects them.
    pub async fn import_data(
        &self,
        user_id: &UserId,
        import_type: &str,
        records: Vec<serde_json::Value>,
    ) -> Result<StatsState, String> {
        let request = ImportRequest {
            import_type: import_type.to_string(),
            data: records,
        };
        if let Err(e) = self.remote.import_data(user_id, &request).await {
            let message = e.user_message(messages::IMPORT_FAILED);
            warn!("Import of {} failed: {}", import_type, message);
            return Err(message);
        }
        debug!(
            "Imported {} {} records for user {}",
            request.data.len(),
            import_type,
            user_id
        );
        Ok(self.load_current_stats(user_id).await)
    }

    /// Forget the current snapshot and invalidate any load in flight.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.set_state(StatsState::Idle);
    }

    fn set_state(&self, next: StatsState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::SessionBus;
    use crate::store::{MemoryStore, USER_ID_KEY};
    use crate::testing::{reject, FakeRemote, Scripted};
    use crate::types::{Exercise, HistoryPoint};
    use serde_json::json;

    fn stats(water: u32, steps: u64, minutes: &[u32]) -> RawStats {
        RawStats {
            weight: Some(68.0),
            water_consumed: water,
            steps,
            exercises: minutes
                .iter()
                .map(|&duration| Exercise {
                    duration,
                    ..Exercise::default()
                })
                .collect(),
            ..RawStats::default()
        }
    }

    fn aggregator() -> (MetricsAggregator, Arc<FakeRemote>) {
        let remote = Arc::new(FakeRemote::new());
        (MetricsAggregator::new(remote.clone(), Goals::default()), remote)
    }

    #[tokio::test]
    async fn test_success_derives_overview() {
        let (agg, remote) = aggregator();
        remote.set_stats("1", Scripted::Ok(stats(4, 7500, &[30, 40])));
        assert_eq!(agg.state(), StatsState::Idle);

        let state = agg.load_current_stats(&UserId::new("1")).await;
        let snapshot = state.snapshot().unwrap();
        assert_eq!(snapshot.user_id, UserId::new("1"));
        assert_eq!(snapshot.overview.water.value, "4/8 vasos");
        assert_eq!(snapshot.overview.steps.value, "7.5k/10k pasos");
        assert_eq!(snapshot.overview.exercise.value, "70 min");
        assert_eq!(agg.state(), state);
    }

    #[tokio::test]
    async fn test_failure_carries_message() {
        let (agg, remote) = aggregator();
        remote.set_stats("1", reject(404, "Error fetching current statistics"));
        assert_eq!(
            agg.load_current_stats(&UserId::new("1")).await,
            StatsState::Failure("Error fetching current statistics".into())
        );

        remote.set_stats("1", Scripted::Offline);
        assert_eq!(
            agg.load_current_stats(&UserId::new("1")).await,
            StatsState::Failure("Error fetching current statistics".into())
        );
    }

    #[tokio::test]
    async fn test_loading_while_in_flight() {
        let (agg, remote) = aggregator();
        remote.set_stats("1", Scripted::Ok(stats(1, 100, &[])));
        let release = remote.gate("current_stats", "1");
        let id = UserId::new("1");

        let (state, observed) = tokio::join!(agg.load_current_stats(&id), async {
            tokio::task::yield_now().await;
            let observed = agg.state();
            release.send(()).unwrap();
            observed
        });
        assert_eq!(observed, StatsState::Loading);
        assert!(state.snapshot().is_some());
    }

    #[tokio::test]
    async fn test_identical_stats_yield_identical_output() {
        let (agg, remote) = aggregator();
        remote.set_stats("1", Scripted::Ok(stats(6, 12_000, &[20, 25])));
        let id = UserId::new("1");

        let first = agg.load_current_stats(&id).await;
        let second = agg.load_current_stats(&id).await;
        assert_eq!(first, second);
        assert_eq!(
            first.snapshot().unwrap().overview.daily_goals,
            second.snapshot().unwrap().overview.daily_goals
        );
    }

    #[tokio::test]
    async fn test_stale_response_does_not_overwrite_newer() {
        let (agg, remote) = aggregator();
        remote.set_stats("old", Scripted::Ok(stats(1, 100, &[])));
        remote.set_stats("new", Scripted::Ok(stats(8, 10_000, &[60])));
        let release_old = remote.gate("current_stats", "old");
        let (old, new) = (UserId::new("old"), UserId::new("new"));

        let (stale, fresh) = tokio::join!(agg.load_current_stats(&old), async {
            let fresh = agg.load_current_stats(&new).await;
            release_old.send(()).unwrap();
            fresh
        });

        assert_eq!(fresh.snapshot().unwrap().user_id, new);
        assert_eq!(stale, fresh);
        assert_eq!(agg.state().snapshot().unwrap().user_id, new);
    }

    #[tokio::test]
    async fn test_reset_discards_snapshot_and_in_flight_load() {
        let (agg, remote) = aggregator();
        remote.set_stats("1", Scripted::Ok(stats(2, 2000, &[])));
        let release = remote.gate("current_stats", "1");
        let id = UserId::new("1");

        let (state, _) = tokio::join!(agg.load_current_stats(&id), async {
            tokio::task::yield_now().await;
            agg.reset();
            release.send(()).unwrap();
        });
        assert_eq!(state, StatsState::Idle);
        assert_eq!(agg.state(), StatsState::Idle);
    }

    #[tokio::test]
    async fn test_refresh_follows_session_identity() {
        let (agg, remote) = aggregator();
        remote.set_stats("42", Scripted::Ok(stats(3, 500, &[])));

        let anonymous = SessionManager::new(remote.clone(), MemoryStore::new(), SessionBus::new());
        assert_eq!(agg.refresh_for(&anonymous).await, StatsState::Idle);
        assert_eq!(remote.count("current_stats"), 0);

        let signed_in = SessionManager::new(
            remote.clone(),
            MemoryStore::with_entry(USER_ID_KEY, "42"),
            SessionBus::new(),
        );
        let state = agg.refresh_for(&signed_in).await;
        assert_eq!(state.snapshot().unwrap().overview.steps.value, "500/10k pasos");
    }

    #[tokio::test]
    async fn test_history_passes_query_and_normalizes_errors() {
        let (agg, remote) = aggregator();
        let series = HistorySeries {
            data: vec![HistoryPoint {
                date: "2024-05-01T00:00:00".into(),
                value: Some(8200.0),
                extra: Default::default(),
            }],
            total: Some(8200.0),
        };
        *remote.history.lock().unwrap() = Scripted::Ok(series.clone());
        let id = UserId::new("4");

        let loaded = agg.load_history(&id, Metric::Steps, Period::Week).await;
        assert_eq!(loaded, Ok(series));
        assert_eq!(remote.count("history:4:steps:1w"), 1);

        *remote.history.lock().unwrap() = Scripted::Offline;
        assert_eq!(
            agg.load_history(&id, Metric::Weight, Period::Year).await,
            Err("Error fetching history".to_string())
        );
    }

    #[tokio::test]
    async fn test_import_reloads_current_stats() {
        let (agg, remote) = aggregator();
        remote.set_stats("4", Scripted::Ok(stats(5, 3000, &[])));
        let id = UserId::new("4");

        let records = vec![json!({"date": "2024-05-01T00:00:00", "steps_amount": 3000})];
        let state = agg.import_data(&id, "steps", records).await.unwrap();
        assert!(state.snapshot().is_some());
        assert_eq!(
            remote.calls(),
            vec!["import:4:steps".to_string(), "current_stats:4".to_string()]
        );

        *remote.import.lock().unwrap() = reject(400, "Tipo de importación inválido");
        assert_eq!(
            agg.import_data(&id, "calories", vec![]).await,
            Err("Tipo de importación inválido".to_string())
        );
    }
}
