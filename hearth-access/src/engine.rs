//! Permission engine
//!
//! Owns the store handle, the snapshot cache and the request workflow. Reads
//! are synchronous views over cached snapshots; writes go to the store and
//! invalidate the affected member so the next read reloads.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::{
    AccessError, AccessRequest, AccessRequestWorkflow, AccessResult, ActionAccess,
    AdditionalAdultGrant, CategoryAccess, DiagnosticEvent, Diagnostics, EngineConfig,
    FamilyMember, Gate, LoadResult, PermissionRule, PermissionStore, RequestDecision,
    RequestStats, Role, RuleUpdate, SnapshotCache, SnapshotLoader, load_config_from_file,
    normalize_items, spawn_refresh_loop,
};

/// Entry point for permission checks and admin writes
pub struct PermissionEngine<S: PermissionStore> {
    store: Arc<S>,
    cache: Arc<SnapshotCache>,
    loader: Arc<SnapshotLoader<S>>,
    workflow: AccessRequestWorkflow<S>,
    diagnostics: Diagnostics,
    config: EngineConfig,
}

impl<S: PermissionStore> PermissionEngine<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        let diagnostics = Diagnostics::new(config.diagnostics.channel_capacity);
        let cache = Arc::new(SnapshotCache::new());
        let loader = Arc::new(SnapshotLoader::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            diagnostics.clone(),
            config.loading.timeout(),
        ));
        let workflow = AccessRequestWorkflow::new(
            Arc::clone(&store),
            config.requests.clone(),
            diagnostics.clone(),
        );

        Self {
            store,
            cache,
            loader,
            workflow,
            diagnostics,
            config,
        }
    }

    /// Build an engine from a TOML config file
    pub fn from_config_file(store: Arc<S>, path: impl AsRef<Path>) -> AccessResult<Self> {
        let config = load_config_from_file(path)?;
        Ok(Self::new(store, config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn subscribe_diagnostics(&self) -> broadcast::Receiver<DiagnosticEvent> {
        self.diagnostics.subscribe()
    }

    // Reads

    pub fn category_access(&self, member_id: &str) -> CategoryAccess {
        self.category_access_at(member_id, Utc::now())
    }

    /// Category view with rule expiry evaluated at `now`
    pub fn category_access_at(&self, member_id: &str, now: DateTime<Utc>) -> CategoryAccess {
        CategoryAccess::new(
            member_id,
            self.cache.current(member_id),
            now,
            self.diagnostics.clone(),
        )
    }

    pub fn action_access(&self, member_id: &str) -> ActionAccess {
        ActionAccess::new(
            member_id,
            self.cache.current(member_id),
            self.diagnostics.clone(),
        )
    }

    /// Gate over one consistent snapshot of the member
    pub fn gate(&self, member_id: &str) -> Gate {
        self.gate_at(member_id, Utc::now())
    }

    pub fn gate_at(&self, member_id: &str, now: DateTime<Utc>) -> Gate {
        let snapshot = self.cache.current(member_id);
        Gate::new(
            CategoryAccess::new(member_id, snapshot.clone(), now, self.diagnostics.clone()),
            ActionAccess::new(member_id, snapshot, self.diagnostics.clone()),
        )
    }

    // Loading

    /// Load the member's snapshot, superseding any load in flight
    pub async fn refresh(&self, member_id: &str) -> LoadResult {
        self.refresh_with(member_id, &CancellationToken::new()).await
    }

    pub async fn refresh_with(&self, member_id: &str, cancel: &CancellationToken) -> LoadResult {
        self.loader.load(member_id, cancel).await
    }

    /// Drop the member's snapshot; views report `loading` until the next refresh
    pub fn invalidate(&self, member_id: &str) {
        self.cache.invalidate(member_id);
        self.diagnostics.emit(DiagnosticEvent::CacheInvalidated {
            member_id: member_id.to_string(),
        });
    }

    // Admin writes

    fn reject(&self, actor_id: &str, operation: &str, error: AccessError) -> AccessError {
        self.diagnostics.emit(DiagnosticEvent::WriteRejected {
            actor_id: actor_id.to_string(),
            operation: operation.to_string(),
            reason: error.to_string(),
        });
        error
    }

    /// Resolve the target of an admin write, checking the actor may perform it
    async fn authorize_admin(
        &self,
        actor_id: &str,
        target_id: &str,
        operation: &str,
    ) -> AccessResult<FamilyMember> {
        let Some(actor) = self.store.get_member(actor_id).await? else {
            return Err(self.reject(actor_id, operation, AccessError::AuthenticationMissing));
        };
        if !actor.role.is_organizer() {
            return Err(self.reject(
                actor_id,
                operation,
                AccessError::Unauthorized {
                    actor: actor.id.clone(),
                    action: operation.to_string(),
                },
            ));
        }
        if actor.id == target_id {
            return Err(self.reject(
                actor_id,
                operation,
                AccessError::Unauthorized {
                    actor: actor.id.clone(),
                    action: format!("{operation} for themselves"),
                },
            ));
        }

        match self.store.get_member(target_id).await? {
            Some(target) => Ok(target),
            None => Err(self.reject(
                actor_id,
                operation,
                AccessError::MemberNotFound(target_id.to_string()),
            )),
        }
    }

    /// Grant or re-grant category overrides for another member
    ///
    /// An update targeting the same category and item scope as an existing
    /// rule re-grants that rule; anything else creates a new one.
    ///
    /// The batch is not atomic. If a write fails partway, the rules before it
    /// stay stored and the target's snapshot is still invalidated. Views for
    /// the target report `loading` until the next `refresh`; use
    /// [`Self::update_permissions_and_refresh`] to reload in the same call.
    pub async fn update_permissions(
        &self,
        actor_id: &str,
        target_id: &str,
        updates: Vec<RuleUpdate>,
    ) -> AccessResult<Vec<PermissionRule>> {
        let target = self
            .authorize_admin(actor_id, target_id, "update_permissions")
            .await?;

        let mut existing = self.store.list_rules(&target.id).await?;
        let mut written = Vec::with_capacity(updates.len());
        let now = Utc::now();

        for update in updates {
            let items = normalize_items(update.specific_items);
            let rule = match existing
                .iter_mut()
                .find(|rule| rule.same_target(update.category, &items))
            {
                Some(rule) => {
                    rule.regrant(actor_id, update.level, update.expires_at, now);
                    rule.clone()
                }
                None => {
                    let mut rule = PermissionRule::new(
                        &target.id,
                        actor_id,
                        update.category,
                        update.level,
                        now,
                    )
                    .with_items(items);
                    rule.expires_at = update.expires_at;
                    existing.push(rule.clone());
                    rule
                }
            };

            // Earlier rules of the batch are already stored; drop the stale snapshot
            if let Err(e) = self.store.upsert_rule(&rule).await {
                if !written.is_empty() {
                    self.invalidate(&target.id);
                }
                return Err(self.reject(actor_id, "update_permissions", e));
            }
            info!(
                actor_id = %actor_id,
                target_id = %target.id,
                category = %rule.category,
                level = %rule.level,
                "Permission rule written"
            );
            written.push(rule);
        }

        self.invalidate(&target.id);
        Ok(written)
    }

    /// Like [`Self::update_permissions`], then reload the target's snapshot
    pub async fn update_permissions_and_refresh(
        &self,
        actor_id: &str,
        target_id: &str,
        updates: Vec<RuleUpdate>,
    ) -> AccessResult<Vec<PermissionRule>> {
        let written = self.update_permissions(actor_id, target_id, updates).await?;
        self.refresh(target_id).await;
        Ok(written)
    }

    /// Replace an additional adult's action grant
    ///
    /// Views for the target report `loading` until the next `refresh`.
    pub async fn update_grant(
        &self,
        actor_id: &str,
        target_id: &str,
        grant: AdditionalAdultGrant,
    ) -> AccessResult<()> {
        let target = self.authorize_admin(actor_id, target_id, "update_grant").await?;
        if target.role != Role::AdditionalAdult {
            return Err(self.reject(
                actor_id,
                "update_grant",
                AccessError::InvalidRequest(format!(
                    "action grants apply to additional adults, {} is {}",
                    target.id, target.role
                )),
            ));
        }

        self.store.save_grant(&target.id, &grant).await?;
        info!(actor_id = %actor_id, target_id = %target.id, "Action grant updated");

        self.invalidate(&target.id);
        Ok(())
    }

    // Access requests

    pub async fn request_permission(
        &self,
        requester_id: &str,
        name: &str,
        reason: Option<&str>,
    ) -> AccessResult<AccessRequest> {
        self.workflow
            .create_request(requester_id, name, reason)
            .await
            .map_err(|e| self.reject(requester_id, "request_permission", e))
    }

    /// Accept or reject a request; invalidates the requester's snapshot
    ///
    /// The requester's views report `loading` until the next `refresh`.
    pub async fn respond_to_request(
        &self,
        request_id: Uuid,
        decision: RequestDecision,
        responder_id: &str,
    ) -> AccessResult<AccessRequest> {
        let request = self
            .workflow
            .respond(request_id, decision, responder_id)
            .await?;
        self.invalidate(&request.requester_id);
        Ok(request)
    }

    pub async fn pending_requests(&self) -> AccessResult<Vec<AccessRequest>> {
        self.workflow.list_pending().await
    }

    pub async fn requests_for(&self, requester_id: &str) -> AccessResult<Vec<AccessRequest>> {
        self.workflow.requests_for(requester_id).await
    }

    pub async fn request_stats(&self) -> AccessResult<RequestStats> {
        self.workflow.stats().await
    }
}

impl<S: PermissionStore + 'static> PermissionEngine<S> {
    /// Keep a member's snapshot fresh until `shutdown` is cancelled
    pub fn spawn_refresh(&self, member_id: &str, shutdown: CancellationToken) -> JoinHandle<()> {
        spawn_refresh_loop(
            Arc::clone(&self.loader),
            member_id,
            self.config.loading.refresh_interval(),
            shutdown,
        )
    }
}
