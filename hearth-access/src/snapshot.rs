//! Immutable per-member permission snapshots
//!
//! A snapshot is everything needed to answer checks for one member without
//! touching the store. It is replaced wholesale, never edited in place.

use chrono::{DateTime, Utc};

use crate::{
    AdditionalAdultGrant, CategoryResolver, FamilyMember, GrantEvaluator, MemberId, PermissionRule,
};

/// Why a snapshot is not a faithful copy of the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadFailure {
    /// No member record; everything resolves to none
    AuthenticationMissing,
    /// Store failed or timed out; rules and grants fell back to defaults
    StorageUnavailable(String),
}

impl std::fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationMissing => f.write_str("no authenticated member"),
            Self::StorageUnavailable(reason) => write!(f, "storage unavailable: {reason}"),
        }
    }
}

/// Loaded permission state for one member
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSnapshot {
    pub member_id: MemberId,
    /// `None` when the member could not be resolved
    pub member: Option<FamilyMember>,
    pub rules: Vec<PermissionRule>,
    pub grant: AdditionalAdultGrant,
    pub loaded_at: DateTime<Utc>,
    pub degraded: Option<LoadFailure>,
}

impl MemberSnapshot {
    /// Snapshot that denies everything
    pub fn unresolved(member_id: impl Into<MemberId>, reason: Option<LoadFailure>) -> Self {
        Self {
            member_id: member_id.into(),
            member: None,
            rules: Vec::new(),
            grant: AdditionalAdultGrant::none(),
            loaded_at: Utc::now(),
            degraded: reason,
        }
    }

    /// Snapshot of a known member with loaded rules and grant
    pub fn loaded(
        member: FamilyMember,
        rules: Vec<PermissionRule>,
        grant: AdditionalAdultGrant,
    ) -> Self {
        Self {
            member_id: member.id.clone(),
            member: Some(member),
            rules,
            grant,
            loaded_at: Utc::now(),
            degraded: None,
        }
    }

    /// Mark the snapshot as degraded
    #[must_use]
    pub fn with_failure(mut self, failure: LoadFailure) -> Self {
        self.degraded = Some(failure);
        self
    }

    /// Category resolver at `now`
    pub fn resolver(&self, now: DateTime<Utc>) -> CategoryResolver<'_> {
        CategoryResolver::new(self.member.as_ref(), &self.rules, now)
    }

    pub fn grants(&self) -> GrantEvaluator<'_> {
        GrantEvaluator::new(&self.grant)
    }
}
