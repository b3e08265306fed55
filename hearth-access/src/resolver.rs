//! Category permission resolution
//!
//! Merges role defaults with a member's active override rules. Rules are
//! applied in `updated_at` order so the last-updated rule wins per category.
//! Item-scoped rules only apply to queries for one of their items; for any
//! other item the category falls back to the earlier rule or the role default.

use chrono::{DateTime, Utc};

use crate::{
    CategoryMap, FamilyMember, PermissionCategory, PermissionLevel, PermissionRule, at_least,
    defaults_for,
};

/// Resolution inputs for a single member at a single instant
#[derive(Debug, Clone, Copy)]
pub struct CategoryResolver<'a> {
    member: Option<&'a FamilyMember>,
    rules: &'a [PermissionRule],
    now: DateTime<Utc>,
}

impl<'a> CategoryResolver<'a> {
    /// Create a resolver. `None` means the member is unknown or not loaded.
    pub fn new(
        member: Option<&'a FamilyMember>,
        rules: &'a [PermissionRule],
        now: DateTime<Utc>,
    ) -> Self {
        Self { member, rules, now }
    }

    /// Resolved level for every category, ignoring item-scoped rules
    pub fn resolve(&self) -> CategoryMap {
        let Some(member) = self.member else {
            return CategoryMap::none();
        };

        let mut map = defaults_for(member.role);
        for rule in self.ordered_rules(member) {
            if !rule.is_item_scoped() {
                map.set(rule.category, rule.level);
            }
        }
        map
    }

    /// Resolved level for one item of a category
    pub fn resolve_item(&self, category: PermissionCategory, item: &str) -> PermissionLevel {
        let Some(member) = self.member else {
            return PermissionLevel::None;
        };

        self.ordered_rules(member)
            .into_iter()
            .filter(|rule| rule.category == category && rule.covers(item))
            .last()
            .map_or(defaults_for(member.role).get(category), |rule| rule.level)
    }

    /// Whether the member holds at least `min_level` in `category`
    pub fn has_permission(&self, category: PermissionCategory, min_level: PermissionLevel) -> bool {
        at_least(self.resolve().get(category), min_level)
    }

    pub fn can_view(&self, category: PermissionCategory) -> bool {
        self.has_permission(category, PermissionLevel::View)
    }

    pub fn can_edit(&self, category: PermissionCategory) -> bool {
        self.has_permission(category, PermissionLevel::Edit)
    }

    pub fn can_manage(&self, category: PermissionCategory) -> bool {
        self.has_permission(category, PermissionLevel::Full)
    }

    /// Active rules owned by `member`, oldest update first
    fn ordered_rules(&self, member: &FamilyMember) -> Vec<&'a PermissionRule> {
        let mut active: Vec<&PermissionRule> = self
            .rules
            .iter()
            .filter(|rule| rule.family_member_id == member.id && rule.is_active_at(self.now))
            .collect();
        // Ties on updated_at fall back to creation order; v7 ids are time ordered.
        active.sort_by(|a, b| {
            a.updated_at
                .cmp(&b.updated_at)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        active
    }
}

/// Resolve the category map for a member at `now`
pub fn resolve(
    member: Option<&FamilyMember>,
    rules: &[PermissionRule],
    now: DateTime<Utc>,
) -> CategoryMap {
    CategoryResolver::new(member, rules, now).resolve()
}
