//! Synchronous accessors over a member snapshot
//!
//! Both views are cheap to build and hold one `Arc` to the snapshot they were
//! built from, so every answer they give comes from the same loaded state.
//! Before the first load finishes they report `loading` and deny everything.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    AdditionalAdultGrant, CategoryMap, CategoryResolver, DiagnosticEvent, Diagnostics,
    GrantEvaluator, GrantLevel, LoadFailure, MemberId, MemberSnapshot, PermissionAction,
    PermissionCategory, PermissionLevel,
};

/// Category-oriented view of one member's permissions
#[derive(Debug, Clone)]
pub struct CategoryAccess {
    snapshot: Arc<MemberSnapshot>,
    loading: bool,
    now: DateTime<Utc>,
    diagnostics: Diagnostics,
}

impl CategoryAccess {
    /// Build a view from the cached snapshot, or a loading view if there is none
    pub fn new(
        member_id: &str,
        snapshot: Option<Arc<MemberSnapshot>>,
        now: DateTime<Utc>,
        diagnostics: Diagnostics,
    ) -> Self {
        let loading = snapshot.is_none();
        let snapshot =
            snapshot.unwrap_or_else(|| Arc::new(MemberSnapshot::unresolved(member_id, None)));
        Self {
            snapshot,
            loading,
            now,
            diagnostics,
        }
    }

    pub fn member_id(&self) -> &MemberId {
        &self.snapshot.member_id
    }

    /// True until the first snapshot for this member is installed
    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Why the snapshot fell back to defaults, if it did
    pub fn error(&self) -> Option<&LoadFailure> {
        self.snapshot.degraded.as_ref()
    }

    fn resolver(&self) -> CategoryResolver<'_> {
        self.snapshot.resolver(self.now)
    }

    /// Resolved level for every category
    pub fn resolved(&self) -> CategoryMap {
        self.resolver().resolve()
    }

    pub fn level(&self, category: PermissionCategory) -> PermissionLevel {
        self.resolver().resolve().get(category)
    }

    pub fn item_level(&self, category: PermissionCategory, item: &str) -> PermissionLevel {
        self.resolver().resolve_item(category, item)
    }

    pub fn has_permission(
        &self,
        category: PermissionCategory,
        min_level: PermissionLevel,
    ) -> bool {
        self.resolver().has_permission(category, min_level)
    }

    pub fn has_item_permission(
        &self,
        category: PermissionCategory,
        item: &str,
        min_level: PermissionLevel,
    ) -> bool {
        crate::at_least(self.item_level(category, item), min_level)
    }

    /// Check a category given by name. Unknown names are denied and reported.
    pub fn has_named_permission(&self, name: &str, min_level: PermissionLevel) -> bool {
        match name.parse::<PermissionCategory>() {
            Ok(category) => self.has_permission(category, min_level),
            Err(_) => self.deny_unrecognized(name),
        }
    }

    /// Report a category name outside the known set. Always false.
    pub fn deny_unrecognized(&self, name: &str) -> bool {
        self.diagnostics.emit(DiagnosticEvent::UnrecognizedCategory {
            name: name.to_string(),
        });
        false
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
}

/// Action-oriented view of one member's grant
#[derive(Debug, Clone)]
pub struct ActionAccess {
    snapshot: Arc<MemberSnapshot>,
    loading: bool,
    diagnostics: Diagnostics,
}

impl ActionAccess {
    pub fn new(
        member_id: &str,
        snapshot: Option<Arc<MemberSnapshot>>,
        diagnostics: Diagnostics,
    ) -> Self {
        let loading = snapshot.is_none();
        let snapshot =
            snapshot.unwrap_or_else(|| Arc::new(MemberSnapshot::unresolved(member_id, None)));
        Self {
            snapshot,
            loading,
            diagnostics,
        }
    }

    pub fn member_id(&self) -> &MemberId {
        &self.snapshot.member_id
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&LoadFailure> {
        self.snapshot.degraded.as_ref()
    }

    /// The grant checks are answered from
    pub fn permissions(&self) -> &AdditionalAdultGrant {
        &self.snapshot.grant
    }

    fn evaluator(&self) -> GrantEvaluator<'_> {
        self.snapshot.grants()
    }

    pub fn check_permission(&self, action: PermissionAction, target: Option<&str>) -> bool {
        self.evaluator().can(action, target)
    }

    /// Check an action given by name. Unknown names are denied and reported.
    pub fn check_named(&self, name: &str, target: Option<&str>) -> bool {
        match name.parse::<PermissionAction>() {
            Ok(action) => self.check_permission(action, target),
            Err(_) => self.deny_unrecognized(name),
        }
    }

    /// Report an action name outside the known set. Always false.
    pub fn deny_unrecognized(&self, name: &str) -> bool {
        self.diagnostics.emit(DiagnosticEvent::UnrecognizedAction {
            name: name.to_string(),
        });
        false
    }

    pub fn granted_permissions(&self) -> Vec<&'static str> {
        self.evaluator().granted_permissions()
    }

    pub fn permission_level(&self) -> GrantLevel {
        self.evaluator().permission_level()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FamilyMember, PermissionRule, Role};
    use chrono::Duration;

    fn child_snapshot(rules: Vec<PermissionRule>) -> Arc<MemberSnapshot> {
        Arc::new(MemberSnapshot::loaded(
            FamilyMember::new("kid", Role::Child),
            rules,
            AdditionalAdultGrant::none(),
        ))
    }

    #[test]
    fn test_loading_view_denies_everything() {
        let access = CategoryAccess::new("kid", None, Utc::now(), Diagnostics::default());
        assert!(access.loading());
        assert!(access.error().is_none());
        assert_eq!(access.resolved(), CategoryMap::none());
        assert!(!access.can_view(PermissionCategory::Calendar));

        let actions = ActionAccess::new("kid", None, Diagnostics::default());
        assert!(actions.loading());
        assert!(actions.granted_permissions().is_empty());
        assert_eq!(actions.permission_level(), GrantLevel::None);
    }

    #[test]
    fn test_child_defaults() {
        let access = CategoryAccess::new(
            "kid",
            Some(child_snapshot(vec![])),
            Utc::now(),
            Diagnostics::default(),
        );
        assert!(!access.loading());
        assert!(access.can_edit(PermissionCategory::Tasks));
        assert!(!access.can_manage(PermissionCategory::Tasks));
        assert!(access.can_view(PermissionCategory::Calendar));
        assert!(!access.can_edit(PermissionCategory::Calendar));
        assert!(!access.can_view(PermissionCategory::Archives));
    }

    #[test]
    fn test_item_permission_falls_back_outside_scope() {
        let now = Utc::now();
        let rule = PermissionRule::new(
            "kid",
            "mom",
            PermissionCategory::Archives,
            PermissionLevel::View,
            now - Duration::minutes(1),
        )
        .with_items(["album-1"]);
        let access = CategoryAccess::new(
            "kid",
            Some(child_snapshot(vec![rule])),
            now,
            Diagnostics::default(),
        );

        assert!(access.has_item_permission(
            PermissionCategory::Archives,
            "album-1",
            PermissionLevel::View
        ));
        assert!(!access.has_item_permission(
            PermissionCategory::Archives,
            "album-2",
            PermissionLevel::View
        ));
        assert_eq!(access.level(PermissionCategory::Archives), PermissionLevel::None);
    }

    #[tokio::test]
    async fn test_unknown_category_name_is_denied_and_reported() {
        let diagnostics = Diagnostics::new(4);
        let mut rx = diagnostics.subscribe();
        let access = CategoryAccess::new(
            "kid",
            Some(child_snapshot(vec![])),
            Utc::now(),
            diagnostics,
        );

        assert!(access.has_named_permission("tasks", PermissionLevel::Edit));
        assert!(!access.has_named_permission("chores", PermissionLevel::View));
        assert_eq!(
            rx.recv().await.unwrap(),
            DiagnosticEvent::UnrecognizedCategory { name: "chores".into() }
        );
    }

    #[tokio::test]
    async fn test_unknown_action_name_is_denied_and_reported() {
        let diagnostics = Diagnostics::new(4);
        let mut rx = diagnostics.subscribe();
        let snapshot = Arc::new(MemberSnapshot::loaded(
            FamilyMember::new("nanny", Role::AdditionalAdult),
            vec![],
            AdditionalAdultGrant::none().allow(PermissionAction::CreateTasks),
        ));
        let actions = ActionAccess::new("nanny", Some(snapshot), diagnostics);

        assert!(actions.check_named("create_tasks", None));
        assert!(!actions.check_named("launch_rockets", None));
        assert_eq!(
            rx.recv().await.unwrap(),
            DiagnosticEvent::UnrecognizedAction { name: "launch_rockets".into() }
        );
        assert_eq!(actions.permission_level(), GrantLevel::Limited);
    }

    #[test]
    fn test_degraded_snapshot_reports_error() {
        let snapshot = MemberSnapshot::loaded(
            FamilyMember::new("kid", Role::Child),
            vec![],
            AdditionalAdultGrant::none(),
        )
        .with_failure(LoadFailure::StorageUnavailable("down".into()));
        let actions = ActionAccess::new("kid", Some(Arc::new(snapshot)), Diagnostics::default());

        assert!(!actions.loading());
        assert!(matches!(actions.error(), Some(LoadFailure::StorageUnavailable(_))));
        assert!(!actions.check_permission(PermissionAction::ViewFamilyData, None));
    }
}
