//! Access request workflow
//!
//! Members file requests for elevated access; organizers accept or reject
//! them. Responding is the only transition, and a rejected response leaves
//! the stored record untouched.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
    AccessError, AccessRequest, AccessResult, DiagnosticEvent, Diagnostics, FamilyMember,
    PermissionStore, RequestConfig, RequestDecision, RequestStatus,
};

/// Counts of stored requests by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestStats {
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
}

impl RequestStats {
    pub fn total(&self) -> usize {
        self.pending + self.accepted + self.rejected
    }
}

/// Orchestrates request creation and organizer responses against the store
pub struct AccessRequestWorkflow<S: PermissionStore> {
    store: Arc<S>,
    limits: RequestConfig,
    diagnostics: Diagnostics,
}

impl<S: PermissionStore> AccessRequestWorkflow<S> {
    pub fn new(store: Arc<S>, limits: RequestConfig, diagnostics: Diagnostics) -> Self {
        Self {
            store,
            limits,
            diagnostics,
        }
    }

    async fn member(&self, id: &str) -> AccessResult<FamilyMember> {
        self.store
            .get_member(id)
            .await?
            .ok_or_else(|| AccessError::MemberNotFound(id.to_string()))
    }

    /// File a pending request
    ///
    /// The permission name is free text but must not be blank. A blank
    /// reason is stored as no reason.
    pub async fn create_request(
        &self,
        requester_id: &str,
        requested_permission: &str,
        reason: Option<&str>,
    ) -> AccessResult<AccessRequest> {
        let requester = self.member(requester_id).await?;

        let requested_permission = requested_permission.trim();
        if requested_permission.is_empty() {
            return Err(AccessError::InvalidRequest(
                "requested permission must not be empty".into(),
            ));
        }

        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        if reason.is_some_and(|r| r.chars().count() > self.limits.max_reason_len) {
            return Err(AccessError::InvalidRequest(format!(
                "reason exceeds {} characters",
                self.limits.max_reason_len
            )));
        }

        let pending = self
            .store
            .list_access_requests(Some(RequestStatus::Pending))
            .await?
            .into_iter()
            .filter(|r| r.requester_id == requester.id)
            .count();
        if pending >= self.limits.max_pending_per_member {
            return Err(AccessError::InvalidRequest(format!(
                "{} already has {} pending requests",
                requester.id, pending
            )));
        }

        let request = AccessRequest::new(
            requester.id,
            requested_permission,
            reason.map(str::to_string),
            Utc::now(),
        );
        self.store.insert_access_request(&request).await?;

        info!(
            request_id = %request.id,
            requester_id = %request.requester_id,
            permission = %request.requested_permission,
            "Access request created"
        );
        Ok(request)
    }

    /// Accept or reject a pending request
    ///
    /// Every failure, including an unknown responder or request and a lost
    /// race with another organizer, is published as `WriteRejected`.
    pub async fn respond(
        &self,
        request_id: Uuid,
        decision: RequestDecision,
        responder_id: &str,
    ) -> AccessResult<AccessRequest> {
        match self.apply_response(request_id, decision, responder_id).await {
            Ok(request) => {
                self.diagnostics.emit(DiagnosticEvent::RequestResolved {
                    request_id: request.id,
                    status: request.status.to_string(),
                });
                info!(
                    request_id = %request.id,
                    responder_id = %responder_id,
                    status = %request.status,
                    "Access request resolved"
                );
                Ok(request)
            }
            Err(e) => {
                self.diagnostics.emit(DiagnosticEvent::WriteRejected {
                    actor_id: responder_id.to_string(),
                    operation: "respond_to_request".into(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn apply_response(
        &self,
        request_id: Uuid,
        decision: RequestDecision,
        responder_id: &str,
    ) -> AccessResult<AccessRequest> {
        let responder = self.member(responder_id).await?;
        let mut request = self
            .store
            .get_access_request(request_id)
            .await?
            .ok_or(AccessError::RequestNotFound(request_id))?;

        request.respond(decision, &responder, Utc::now())?;

        // Conditional write: a concurrent responder that got there first wins
        self.store
            .update_access_request(&request, RequestStatus::Pending)
            .await?;
        Ok(request)
    }

    /// Pending requests, oldest first
    pub async fn list_pending(&self) -> AccessResult<Vec<AccessRequest>> {
        self.store
            .list_access_requests(Some(RequestStatus::Pending))
            .await
    }

    /// Every request filed by `requester_id`, oldest first
    pub async fn requests_for(&self, requester_id: &str) -> AccessResult<Vec<AccessRequest>> {
        Ok(self
            .store
            .list_access_requests(None)
            .await?
            .into_iter()
            .filter(|r| r.requester_id == requester_id)
            .collect())
    }

    pub async fn stats(&self) -> AccessResult<RequestStats> {
        let mut stats = RequestStats::default();
        for request in self.store.list_access_requests(None).await? {
            match request.status {
                RequestStatus::Pending => stats.pending += 1,
                RequestStatus::Accepted => stats.accepted += 1,
                RequestStatus::Rejected => stats.rejected += 1,
            }
        }
        Ok(stats)
    }
}
