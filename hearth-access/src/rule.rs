//! Per-member override rules
//!
//! A rule replaces the role default for one category, optionally only for a
//! set of items, optionally until an expiry time. Expired rules stay in the
//! store but stop contributing to resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{MemberId, PermissionCategory, PermissionLevel};

/// Identifier of an item inside a category (a task, an event, ...)
pub type ItemId = String;

/// Override of a role default for one member and category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub id: Uuid,
    pub family_member_id: MemberId,
    pub granted_by_id: MemberId,
    pub category: PermissionCategory,
    pub level: PermissionLevel,
    /// Items this rule is limited to; empty means the whole category
    #[serde(default)]
    pub specific_items: Vec<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PermissionRule {
    /// Create a new rule granted at `now`
    pub fn new(
        family_member_id: impl Into<MemberId>,
        granted_by_id: impl Into<MemberId>,
        category: PermissionCategory,
        level: PermissionLevel,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            family_member_id: family_member_id.into(),
            granted_by_id: granted_by_id.into(),
            category,
            level,
            specific_items: Vec::new(),
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Limit the rule to specific items
    #[must_use]
    pub fn with_items<I, T>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ItemId>,
    {
        self.specific_items = normalize_items(items);
        self
    }

    /// Make the rule inert after `expires_at`
    #[must_use]
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the rule still contributes at `now`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires| expires > now)
    }

    /// Whether the rule is limited to specific items
    pub fn is_item_scoped(&self) -> bool {
        !self.specific_items.is_empty()
    }

    /// Whether the rule covers `item`. Unscoped rules cover every item.
    pub fn covers(&self, item: &str) -> bool {
        !self.is_item_scoped() || self.specific_items.iter().any(|i| i == item)
    }

    /// Whether this rule and `other` target the same category and item scope
    pub fn same_target(&self, category: PermissionCategory, items: &[ItemId]) -> bool {
        self.category == category && self.specific_items == items
    }

    /// Re-grant the rule with a new level and expiry
    pub fn regrant(
        &mut self,
        granted_by_id: impl Into<MemberId>,
        level: PermissionLevel,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) {
        self.granted_by_id = granted_by_id.into();
        self.level = level;
        self.expires_at = expires_at;
        self.updated_at = now;
    }
}

/// Sort and dedupe an item list so scopes compare by content
pub fn normalize_items<I, T>(items: I) -> Vec<ItemId>
where
    I: IntoIterator<Item = T>,
    T: Into<ItemId>,
{
    let mut items: Vec<ItemId> = items
        .into_iter()
        .map(Into::into)
        .filter(|i: &ItemId| !i.trim().is_empty())
        .collect();
    items.sort();
    items.dedup();
    items
}

/// A requested change to one override, applied by an organizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleUpdate {
    pub category: PermissionCategory,
    pub level: PermissionLevel,
    #[serde(default)]
    pub specific_items: Vec<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl RuleUpdate {
    pub fn new(category: PermissionCategory, level: PermissionLevel) -> Self {
        Self {
            category,
            level,
            specific_items: Vec::new(),
            expires_at: None,
        }
    }

    #[must_use]
    pub fn with_items<I, T>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ItemId>,
    {
        self.specific_items = normalize_items(items);
        self
    }

    #[must_use]
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn rule(now: DateTime<Utc>) -> PermissionRule {
        PermissionRule::new(
            "kid",
            "mom",
            PermissionCategory::Tasks,
            PermissionLevel::Full,
            now,
        )
    }

    #[test]
    fn test_rule_without_expiry_is_active() {
        let now = Utc::now();
        assert!(rule(now).is_active_at(now + Duration::days(365)));
    }

    #[test]
    fn test_expired_rule_is_inert() {
        let now = Utc::now();
        let r = rule(now).with_expiry(now - Duration::minutes(1));
        assert!(!r.is_active_at(now));
    }

    #[test]
    fn test_rule_expiring_exactly_now_is_inert() {
        let now = Utc::now();
        let r = rule(now).with_expiry(now);
        assert!(!r.is_active_at(now));
        assert!(r.is_active_at(now - Duration::seconds(1)));
    }

    #[test]
    fn test_unscoped_rule_covers_every_item() {
        let r = rule(Utc::now());
        assert!(!r.is_item_scoped());
        assert!(r.covers("task-1"));
    }

    #[test]
    fn test_scoped_rule_covers_only_listed_items() {
        let r = rule(Utc::now()).with_items(["task-2", "task-1", "task-2", " "]);
        assert_eq!(r.specific_items, vec!["task-1".to_string(), "task-2".to_string()]);
        assert!(r.covers("task-1"));
        assert!(!r.covers("task-3"));
    }

    #[test]
    fn test_regrant_bumps_updated_at() {
        let now = Utc::now();
        let mut r = rule(now);
        let later = now + Duration::hours(2);
        r.regrant("dad", PermissionLevel::View, None, later);

        assert_eq!(r.level, PermissionLevel::View);
        assert_eq!(r.granted_by_id, "dad");
        assert_eq!(r.created_at, now);
        assert_eq!(r.updated_at, later);
    }

    #[test]
    fn test_rule_deserializes_without_optional_fields() {
        let json = r#"{
            "id": "0191d3c0-0000-7000-8000-000000000001",
            "family_member_id": "kid",
            "granted_by_id": "mom",
            "category": "calendar",
            "level": "edit",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        }"#;
        let r: PermissionRule = serde_json::from_str(json).unwrap();
        assert!(r.specific_items.is_empty());
        assert!(r.expires_at.is_none());
        assert_eq!(r.category, PermissionCategory::Calendar);
    }
}
