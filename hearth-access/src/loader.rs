//! Asynchronous snapshot loading
//!
//! The only suspending step in the engine. A load never fails outright: store
//! errors and timeouts produce a degraded snapshot (role defaults, nothing
//! granted) and a diagnostic event. Loads that are cancelled or superseded
//! install nothing.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    AccessError, AccessResult, DiagnosticEvent, Diagnostics, LoadFailure, MemberSnapshot,
    PermissionStore, SnapshotCache,
};

/// Outcome of a snapshot load
#[derive(Debug, Clone)]
pub enum LoadResult {
    /// Store answered; snapshot installed
    Loaded(Arc<MemberSnapshot>),
    /// Store failed; a fail-closed snapshot was installed
    Degraded {
        snapshot: Arc<MemberSnapshot>,
        reason: LoadFailure,
    },
    /// A newer load for the same member started first; result discarded
    Superseded,
    /// Caller cancelled the load; nothing installed
    Cancelled,
}

impl LoadResult {
    /// Installed snapshot, if any
    pub fn snapshot(&self) -> Option<&Arc<MemberSnapshot>> {
        match self {
            Self::Loaded(snapshot) | Self::Degraded { snapshot, .. } => Some(snapshot),
            Self::Superseded | Self::Cancelled => None,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.snapshot().is_some()
    }
}

/// Loads member snapshots from a store into the cache
pub struct SnapshotLoader<S: PermissionStore> {
    store: Arc<S>,
    cache: Arc<SnapshotCache>,
    diagnostics: Diagnostics,
    timeout: Duration,
}

impl<S: PermissionStore> SnapshotLoader<S> {
    pub fn new(
        store: Arc<S>,
        cache: Arc<SnapshotCache>,
        diagnostics: Diagnostics,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            diagnostics,
            timeout,
        }
    }

    /// Load and install a snapshot for `member_id`
    ///
    /// Starting a load supersedes any load already in flight for the member.
    pub async fn load(&self, member_id: &str, cancel: &CancellationToken) -> LoadResult {
        let ticket = self.cache.begin_load(member_id);
        debug!(
            member_id = %member_id,
            generation = ticket.generation,
            "Loading permission snapshot"
        );

        let (snapshot, failure) = tokio::select! {
            _ = cancel.cancelled() => {
                self.diagnostics.emit(DiagnosticEvent::LoadCancelled {
                    member_id: member_id.to_string(),
                    generation: ticket.generation,
                });
                return LoadResult::Cancelled;
            }
            fetched = self.fetch(member_id) => fetched,
        };

        let snapshot = Arc::new(snapshot);
        if !self.cache.install(&ticket, Arc::clone(&snapshot)) {
            self.diagnostics.emit(DiagnosticEvent::LoadSuperseded {
                member_id: member_id.to_string(),
                generation: ticket.generation,
            });
            return LoadResult::Superseded;
        }

        match failure {
            None => LoadResult::Loaded(snapshot),
            Some(reason) => {
                self.diagnostics.emit(match &reason {
                    LoadFailure::AuthenticationMissing => DiagnosticEvent::AuthenticationMissing {
                        member_id: member_id.to_string(),
                    },
                    LoadFailure::StorageUnavailable(why) => DiagnosticEvent::StorageUnavailable {
                        member_id: member_id.to_string(),
                        reason: why.clone(),
                    },
                });
                LoadResult::Degraded { snapshot, reason }
            }
        }
    }

    /// Read everything for a member, degrading instead of failing
    async fn fetch(&self, member_id: &str) -> (MemberSnapshot, Option<LoadFailure>) {
        let member = match self.bounded(self.store.get_member(member_id)).await {
            Ok(Some(member)) => member,
            Ok(None) => {
                let failure = LoadFailure::AuthenticationMissing;
                return (
                    MemberSnapshot::unresolved(member_id, Some(failure.clone())),
                    Some(failure),
                );
            }
            Err(e) => {
                let failure = LoadFailure::StorageUnavailable(e.to_string());
                return (
                    MemberSnapshot::unresolved(member_id, Some(failure.clone())),
                    Some(failure),
                );
            }
        };

        let (rules, grant) = tokio::join!(
            self.bounded(self.store.list_rules(member_id)),
            self.bounded(self.store.get_grant(member_id)),
        );

        let mut failures = Vec::new();
        let rules = rules.unwrap_or_else(|e| {
            failures.push(format!("rules: {e}"));
            Vec::new()
        });
        let grant = match grant {
            Ok(grant) => grant.unwrap_or_default(),
            Err(e) => {
                failures.push(format!("grant: {e}"));
                Default::default()
            }
        };

        let snapshot = MemberSnapshot::loaded(member, rules, grant);
        if failures.is_empty() {
            (snapshot, None)
        } else {
            let failure = LoadFailure::StorageUnavailable(failures.join("; "));
            (snapshot.with_failure(failure.clone()), Some(failure))
        }
    }

    /// Run a store call under the configured timeout
    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = AccessResult<T>>,
    ) -> AccessResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AccessError::StorageUnavailable(format!(
                "timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

/// Reload a member snapshot every `interval` until `shutdown` is cancelled
pub fn spawn_refresh_loop<S>(
    loader: Arc<SnapshotLoader<S>>,
    member_id: impl Into<String>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    S: PermissionStore + 'static,
{
    let member_id = member_id.into();
    tokio::spawn(async move {
        info!(
            member_id = %member_id,
            interval_secs = interval.as_secs(),
            "Permission refresh started"
        );
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(member_id = %member_id, "Permission refresh received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    let result = loader.load(&member_id, &shutdown).await;
                    debug!(
                        member_id = %member_id,
                        installed = result.is_installed(),
                        "Permission refresh tick"
                    );
                }
            }
        }

        info!(member_id = %member_id, "Permission refresh stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AdditionalAdultGrant, FamilyMember, MemoryPermissionStore, PermissionAction,
        PermissionCategory, PermissionLevel, PermissionRule, Role, defaults_for,
    };
    use chrono::Utc;

    type Fixture = (
        SnapshotLoader<MemoryPermissionStore>,
        Arc<MemoryPermissionStore>,
        Arc<SnapshotCache>,
        Diagnostics,
    );

    fn setup(timeout: Duration) -> Fixture {
        let store = Arc::new(MemoryPermissionStore::new());
        let cache = Arc::new(SnapshotCache::new());
        let diagnostics = Diagnostics::new(16);
        let loader = SnapshotLoader::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            diagnostics.clone(),
            timeout,
        );
        (loader, store, cache, diagnostics)
    }

    #[tokio::test]
    async fn test_load_installs_snapshot() {
        let (loader, store, cache, _) = setup(Duration::from_secs(1));
        store.insert_member(FamilyMember::new("kid", Role::Child)).await;
        let rule = PermissionRule::new(
            "kid",
            "mom",
            PermissionCategory::Archives,
            PermissionLevel::View,
            Utc::now(),
        );
        store.upsert_rule(&rule).await.unwrap();

        let result = loader.load("kid", &CancellationToken::new()).await;
        assert!(matches!(result, LoadResult::Loaded(_)));

        let snapshot = cache.current("kid").unwrap();
        assert_eq!(snapshot.rules.len(), 1);
        assert_eq!(snapshot.resolver(Utc::now()).resolve().archives, PermissionLevel::View);
    }

    #[tokio::test]
    async fn test_unknown_member_installs_all_none() {
        let (loader, _, cache, diagnostics) = setup(Duration::from_secs(1));
        let mut rx = diagnostics.subscribe();

        let result = loader.load("ghost", &CancellationToken::new()).await;
        assert!(matches!(
            result,
            LoadResult::Degraded { reason: LoadFailure::AuthenticationMissing, .. }
        ));
        assert!(cache.current("ghost").unwrap().member.is_none());
        assert!(matches!(
            rx.recv().await.unwrap(),
            DiagnosticEvent::AuthenticationMissing { .. }
        ));
    }

    #[tokio::test]
    async fn test_storage_failure_degrades_to_unresolved() {
        let (loader, store, cache, _) = setup(Duration::from_secs(1));
        store.insert_member(FamilyMember::new("kid", Role::Child)).await;
        store.set_unavailable(true);

        let result = loader.load("kid", &CancellationToken::new()).await;
        assert!(matches!(
            result,
            LoadResult::Degraded { reason: LoadFailure::StorageUnavailable(_), .. }
        ));
        let snapshot = cache.current("kid").unwrap();
        assert!(snapshot.member.is_none());
        assert!(!snapshot.grants().can(PermissionAction::ViewFamilyData, None));
    }

    #[tokio::test]
    async fn test_timeout_degrades_instead_of_blocking() {
        let (loader, store, _, _) = setup(Duration::from_millis(10));
        store.insert_member(FamilyMember::new("kid", Role::Child)).await;
        store.set_latency(Duration::from_millis(200));

        let result = loader.load("kid", &CancellationToken::new()).await;
        match result {
            LoadResult::Degraded { reason: LoadFailure::StorageUnavailable(why), .. } => {
                assert!(why.contains("timed out"));
            }
            other => panic!("expected degraded load, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_load_installs_nothing() {
        let (loader, store, cache, _) = setup(Duration::from_secs(1));
        store.insert_member(FamilyMember::new("kid", Role::Child)).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = loader.load("kid", &cancel).await;
        assert!(matches!(result, LoadResult::Cancelled));
        assert!(cache.current("kid").is_none());
    }

    #[tokio::test]
    async fn test_superseded_load_is_discarded() {
        let (loader, store, cache, _) = setup(Duration::from_secs(1));
        store.insert_member(FamilyMember::new("adult", Role::AdditionalAdult)).await;
        store.set_latency(Duration::from_millis(50));
        let token = CancellationToken::new();

        let slow = loader.load("adult", &token);
        let fast = async {
            // The slow load has already started by the time this runs
            store.set_latency(Duration::ZERO);
            let grant = AdditionalAdultGrant::none().allow(PermissionAction::CreateTasks);
            store.save_grant("adult", &grant).await.unwrap();
            loader.load("adult", &token).await
        };

        let (slow_result, fast_result) = tokio::join!(slow, fast);
        assert!(matches!(slow_result, LoadResult::Superseded));
        assert!(matches!(fast_result, LoadResult::Loaded(_)));

        let snapshot = cache.current("adult").unwrap();
        assert!(snapshot.grants().can(PermissionAction::CreateTasks, None));
    }

    #[tokio::test]
    async fn test_refresh_loop_loads_until_shutdown() {
        let (loader, store, cache, _) = setup(Duration::from_secs(1));
        store.insert_member(FamilyMember::new("teen", Role::Teen)).await;
        let shutdown = CancellationToken::new();

        let handle = spawn_refresh_loop(
            Arc::new(loader),
            "teen",
            Duration::from_millis(10),
            shutdown.clone(),
        );

        // First tick fires immediately
        for _ in 0..50 {
            if cache.current("teen").is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let snapshot = cache.current("teen").unwrap();
        assert_eq!(snapshot.resolver(Utc::now()).resolve(), defaults_for(Role::Teen));

        shutdown.cancel();
        handle.await.unwrap();
    }
}
