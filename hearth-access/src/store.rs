//! Persistence collaborator
//!
//! The engine reads members, rules, grants and access requests through
//! [`PermissionStore`]. The canonical records live behind it; the engine only
//! keeps a read cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    AccessError, AccessRequest, AccessResult, AdditionalAdultGrant, FamilyMember, MemberId,
    PermissionRule, RequestStatus,
};

/// Storage operations the permission engine depends on
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Look up a member's identity and role
    async fn get_member(&self, id: &str) -> AccessResult<Option<FamilyMember>>;

    /// All override rules for a member, including expired ones
    async fn list_rules(&self, member_id: &str) -> AccessResult<Vec<PermissionRule>>;

    /// Insert or replace a rule by id
    async fn upsert_rule(&self, rule: &PermissionRule) -> AccessResult<()>;

    /// Current action grant for a member, if one was ever saved
    async fn get_grant(&self, member_id: &str) -> AccessResult<Option<AdditionalAdultGrant>>;

    /// Replace a member's action grant
    async fn save_grant(&self, member_id: &str, grant: &AdditionalAdultGrant) -> AccessResult<()>;

    async fn insert_access_request(&self, request: &AccessRequest) -> AccessResult<()>;

    async fn get_access_request(&self, id: Uuid) -> AccessResult<Option<AccessRequest>>;

    /// Replace a request only if its stored status is still `expected`
    async fn update_access_request(
        &self,
        request: &AccessRequest,
        expected: RequestStatus,
    ) -> AccessResult<()>;

    /// Requests filtered by status, oldest first
    async fn list_access_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> AccessResult<Vec<AccessRequest>>;
}

/// In-memory implementation of PermissionStore
///
/// Supports simulated latency and outages so load degradation can be tested.
pub struct MemoryPermissionStore {
    members: RwLock<HashMap<MemberId, FamilyMember>>,
    rules: RwLock<HashMap<Uuid, PermissionRule>>,
    grants: RwLock<HashMap<MemberId, AdditionalAdultGrant>>,
    requests: RwLock<HashMap<Uuid, AccessRequest>>,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
}

impl MemoryPermissionStore {
    pub fn new() -> Self {
        Self {
            members: RwLock::new(HashMap::new()),
            rules: RwLock::new(HashMap::new()),
            grants: RwLock::new(HashMap::new()),
            requests: RwLock::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
        }
    }

    /// Add or replace a member record
    pub async fn insert_member(&self, member: FamilyMember) {
        self.members.write().await.insert(member.id.clone(), member);
    }

    /// Make every operation fail with `StorageUnavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every operation by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    async fn io(&self) -> AccessResult<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AccessError::StorageUnavailable(
                "memory store marked unavailable".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MemoryPermissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    async fn get_member(&self, id: &str) -> AccessResult<Option<FamilyMember>> {
        self.io().await?;
        Ok(self.members.read().await.get(id).cloned())
    }

    async fn list_rules(&self, member_id: &str) -> AccessResult<Vec<PermissionRule>> {
        self.io().await?;
        let rules = self.rules.read().await;
        let mut found: Vec<_> = rules
            .values()
            .filter(|r| r.family_member_id == member_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn upsert_rule(&self, rule: &PermissionRule) -> AccessResult<()> {
        self.io().await?;
        self.rules.write().await.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn get_grant(&self, member_id: &str) -> AccessResult<Option<AdditionalAdultGrant>> {
        self.io().await?;
        Ok(self.grants.read().await.get(member_id).cloned())
    }

    async fn save_grant(&self, member_id: &str, grant: &AdditionalAdultGrant) -> AccessResult<()> {
        self.io().await?;
        self.grants
            .write()
            .await
            .insert(member_id.to_string(), grant.clone());
        Ok(())
    }

    async fn insert_access_request(&self, request: &AccessRequest) -> AccessResult<()> {
        self.io().await?;
        self.requests.write().await.insert(request.id, request.clone());
        Ok(())
    }

    async fn get_access_request(&self, id: Uuid) -> AccessResult<Option<AccessRequest>> {
        self.io().await?;
        Ok(self.requests.read().await.get(&id).cloned())
    }

    async fn update_access_request(
        &self,
        request: &AccessRequest,
        expected: RequestStatus,
    ) -> AccessResult<()> {
        self.io().await?;
        let mut requests = self.requests.write().await;
        let stored = requests
            .get_mut(&request.id)
            .ok_or(AccessError::RequestNotFound(request.id))?;
        if stored.status != expected {
            return Err(AccessError::InvalidTransition {
                from: stored.status.to_string(),
                to: request.status.to_string(),
            });
        }
        *stored = request.clone();
        Ok(())
    }

    async fn list_access_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> AccessResult<Vec<AccessRequest>> {
        self.io().await?;
        let requests = self.requests.read().await;
        let mut found: Vec<_> = requests
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }
}
