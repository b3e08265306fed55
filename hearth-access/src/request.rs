//! Access request records and their state machine
//!
//! `pending -> accepted | rejected`, exactly once. Both outcomes are final.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AccessError, AccessResult, FamilyMember, MemberId};

/// Status of an access request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            _ => Err(AccessError::UnrecognizedStatus(s.to_string())),
        }
    }
}

/// An organizer's answer to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestDecision {
    Accept,
    Reject,
}

impl RequestDecision {
    /// Status the request moves to
    pub fn target_status(&self) -> RequestStatus {
        match self {
            Self::Accept => RequestStatus::Accepted,
            Self::Reject => RequestStatus::Rejected,
        }
    }
}

/// A member's request for elevated access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub id: Uuid,
    pub requester_id: MemberId,
    /// Free-text name of what is asked for, e.g. `manage_children`
    pub requested_permission: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_by: Option<MemberId>,
}

impl AccessRequest {
    /// Create a pending request
    pub fn new(
        requester_id: impl Into<MemberId>,
        requested_permission: impl Into<String>,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            requester_id: requester_id.into(),
            requested_permission: requested_permission.into(),
            reason,
            status: RequestStatus::Pending,
            created_at: now,
            responded_at: None,
            responded_by: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    /// Check that `responder` may move this request to `decision`
    ///
    /// Every refusal is an `InvalidTransition`: the request is not pending,
    /// the responder is not an organizer, or the responder filed it. Leaves
    /// the request untouched.
    pub fn check_response(
        &self,
        decision: RequestDecision,
        responder: &FamilyMember,
    ) -> AccessResult<()> {
        let refuse = |why: String| AccessError::InvalidTransition {
            from: self.status.to_string(),
            to: format!("{} ({})", decision.target_status(), why),
        };

        if !responder.role.is_organizer() {
            return Err(refuse(format!(
                "{} is {}, not an organizer",
                responder.id, responder.role
            )));
        }
        if responder.id == self.requester_id {
            return Err(refuse(format!("{} filed this request", responder.id)));
        }
        if !self.is_pending() {
            return Err(AccessError::InvalidTransition {
                from: self.status.to_string(),
                to: decision.target_status().to_string(),
            });
        }
        Ok(())
    }

    /// Apply an organizer's decision
    ///
    /// Nothing is mutated when the check fails.
    pub fn respond(
        &mut self,
        decision: RequestDecision,
        responder: &FamilyMember,
        now: DateTime<Utc>,
    ) -> AccessResult<()> {
        self.check_response(decision, responder)?;
        self.status = decision.target_status();
        self.responded_at = Some(now);
        self.responded_by = Some(responder.id.clone());
        Ok(())
    }
}
