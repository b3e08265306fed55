//! Enforcement checkpoint for feature code
//!
//! A gate answers one question per requirement and picks what to render.
//! It never errors: anything it cannot confirm is denied, and pre-load state
//! is reported as [`GateDecision::Pending`] so the caller can show a spinner
//! instead of a denial.

use crate::{
    ActionAccess, CategoryAccess, PermissionAction, PermissionCategory, PermissionLevel,
};

/// Which model a requirement is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementKind {
    Category,
    Action,
}

/// What a piece of content needs before it is shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Category {
        category: PermissionCategory,
        level: PermissionLevel,
        /// Restrict the check to one item of the category
        item: Option<String>,
    },
    Action {
        action: PermissionAction,
        target: Option<String>,
    },
    /// A category or action name outside the known set; always denied
    Unrecognized { kind: RequirementKind, name: String },
}

impl Requirement {
    pub fn view(category: PermissionCategory) -> Self {
        Self::Category {
            category,
            level: PermissionLevel::View,
            item: None,
        }
    }

    pub fn edit(category: PermissionCategory) -> Self {
        Self::Category {
            category,
            level: PermissionLevel::Edit,
            item: None,
        }
    }

    pub fn manage(category: PermissionCategory) -> Self {
        Self::Category {
            category,
            level: PermissionLevel::Full,
            item: None,
        }
    }

    pub fn action(action: PermissionAction) -> Self {
        Self::Action {
            action,
            target: None,
        }
    }

    /// Requirement from a stored action name
    pub fn parse_action(name: &str, target: Option<&str>) -> Self {
        match name.parse::<PermissionAction>() {
            Ok(action) => Self::Action {
                action,
                target: target.map(str::to_string),
            },
            Err(_) => Self::Unrecognized {
                kind: RequirementKind::Action,
                name: name.to_string(),
            },
        }
    }

    /// Requirement from a stored category name
    pub fn parse_category(name: &str, level: PermissionLevel) -> Self {
        match name.parse::<PermissionCategory>() {
            Ok(category) => Self::Category {
                category,
                level,
                item: None,
            },
            Err(_) => Self::Unrecognized {
                kind: RequirementKind::Category,
                name: name.to_string(),
            },
        }
    }

    pub fn kind(&self) -> RequirementKind {
        match self {
            Self::Category { .. } => RequirementKind::Category,
            Self::Action { .. } => RequirementKind::Action,
            Self::Unrecognized { kind, .. } => *kind,
        }
    }

    /// Narrow a category requirement to one item
    #[must_use]
    pub fn for_item(self, item: impl Into<String>) -> Self {
        match self {
            Self::Category { category, level, .. } => Self::Category {
                category,
                level,
                item: Some(item.into()),
            },
            other => other,
        }
    }

    /// Point an action requirement at a target member
    #[must_use]
    pub fn on_member(self, member_id: impl Into<String>) -> Self {
        match self {
            Self::Action { action, .. } => Self::Action {
                action,
                target: Some(member_id.into()),
            },
            other => other,
        }
    }

    /// Human-readable name of the capability this requires
    pub fn capability(&self) -> String {
        match self {
            Self::Category {
                category,
                level,
                item: None,
            } => format!("{} access to {}", level, category.label()),
            Self::Category {
                category,
                level,
                item: Some(item),
            } => format!("{} access to {} ({})", level, category.label(), item),
            Self::Action { action, .. } => action.label().to_string(),
            Self::Unrecognized { name, .. } => name.clone(),
        }
    }
}

/// Result of checking a requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    /// Permissions are still loading; treated as denied
    Pending,
    Denied { capability: String },
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Standard placeholder shown when content is withheld
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeniedNotice {
    pub capability: String,
    /// Permissions had not loaded yet
    pub pending: bool,
}

impl DeniedNotice {
    pub fn message(&self) -> String {
        if self.pending {
            format!("Checking access for {}...", self.capability)
        } else {
            format!(
                "Access denied: {}. Contact your family organizer to request access.",
                self.capability
            )
        }
    }
}

impl std::fmt::Display for DeniedNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

/// What the caller should render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered<T> {
    Content(T),
    Fallback(T),
    Placeholder(DeniedNotice),
}

impl<T> Rendered<T> {
    pub fn into_content(self) -> Option<T> {
        match self {
            Self::Content(payload) => Some(payload),
            Self::Fallback(_) | Self::Placeholder(_) => None,
        }
    }
}

/// Checks requirements for one member
#[derive(Debug, Clone)]
pub struct Gate {
    categories: CategoryAccess,
    actions: ActionAccess,
}

impl Gate {
    pub fn new(categories: CategoryAccess, actions: ActionAccess) -> Self {
        Self {
            categories,
            actions,
        }
    }

    pub fn check(&self, requirement: &Requirement) -> GateDecision {
        if self.categories.loading() || self.actions.loading() {
            return GateDecision::Pending;
        }

        let allowed = match requirement {
            Requirement::Category {
                category,
                level,
                item: None,
            } => self.categories.has_permission(*category, *level),
            Requirement::Category {
                category,
                level,
                item: Some(item),
            } => self.categories.has_item_permission(*category, item, *level),
            Requirement::Action { action, target } => {
                self.actions.check_permission(*action, target.as_deref())
            }
            Requirement::Unrecognized { kind, name } => match kind {
                RequirementKind::Category => self.categories.deny_unrecognized(name),
                RequirementKind::Action => self.actions.deny_unrecognized(name),
            },
        };

        if allowed {
            GateDecision::Allowed
        } else {
            GateDecision::Denied {
                capability: requirement.capability(),
            }
        }
    }

    pub fn allows(&self, requirement: &Requirement) -> bool {
        self.check(requirement).is_allowed()
    }

    /// Pick `payload` if allowed, otherwise `fallback` or the standard notice
    pub fn render<T>(
        &self,
        requirement: &Requirement,
        payload: T,
        fallback: Option<T>,
    ) -> Rendered<T> {
        let pending = match self.check(requirement) {
            GateDecision::Allowed => return Rendered::Content(payload),
            GateDecision::Pending => true,
            GateDecision::Denied { .. } => false,
        };

        match fallback {
            Some(fallback) => Rendered::Fallback(fallback),
            None => Rendered::Placeholder(DeniedNotice {
                capability: requirement.capability(),
                pending,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AdditionalAdultGrant, DiagnosticEvent, Diagnostics, FamilyMember, MemberSnapshot, Role,
    };
    use chrono::Utc;
    use std::sync::Arc;

    fn gate_for(role: Role, grant: AdditionalAdultGrant) -> Gate {
        gate_with(role, grant, Diagnostics::default())
    }

    fn gate_with(role: Role, grant: AdditionalAdultGrant, diagnostics: Diagnostics) -> Gate {
        let snapshot = Arc::new(MemberSnapshot::loaded(
            FamilyMember::new("m", role),
            vec![],
            grant,
        ));
        Gate::new(
            CategoryAccess::new(
                "m",
                Some(Arc::clone(&snapshot)),
                Utc::now(),
                diagnostics.clone(),
            ),
            ActionAccess::new("m", Some(snapshot), diagnostics),
        )
    }

    fn loading_gate() -> Gate {
        let diagnostics = Diagnostics::default();
        Gate::new(
            CategoryAccess::new("m", None, Utc::now(), diagnostics.clone()),
            ActionAccess::new("m", None, diagnostics),
        )
    }

    #[test]
    fn test_category_requirements() {
        let gate = gate_for(Role::Child, AdditionalAdultGrant::none());
        assert!(gate.allows(&Requirement::edit(PermissionCategory::Tasks)));
        assert_eq!(
            gate.check(&Requirement::edit(PermissionCategory::Calendar)),
            GateDecision::Denied {
                capability: "edit access to Calendar".into()
            }
        );
    }

    #[test]
    fn test_action_requirement_with_target() {
        let grant = AdditionalAdultGrant::none().with_visible_members(["kid"]);
        let gate = gate_for(Role::AdditionalAdult, grant);

        let view = Requirement::action(PermissionAction::ViewMember);
        assert!(gate.allows(&view.clone().on_member("kid")));
        assert!(!gate.allows(&view.clone().on_member("teen")));
        assert!(!gate.allows(&view));
    }

    #[test]
    fn test_unrecognized_action_is_denied() {
        let gate = gate_for(Role::PrimaryOrganizer, AdditionalAdultGrant::none());
        let requirement = Requirement::parse_action("teleport", None);
        assert_eq!(
            requirement,
            Requirement::Unrecognized {
                kind: RequirementKind::Action,
                name: "teleport".into()
            }
        );
        assert!(!gate.allows(&requirement));
    }

    #[tokio::test]
    async fn test_unrecognized_category_is_denied_and_reported() {
        let diagnostics = Diagnostics::new(4);
        let mut rx = diagnostics.subscribe();
        let gate = gate_with(Role::PrimaryOrganizer, AdditionalAdultGrant::none(), diagnostics);

        let known = Requirement::parse_category("calendar", PermissionLevel::Full);
        assert_eq!(known, Requirement::manage(PermissionCategory::Calendar));
        assert!(gate.allows(&known));

        let unknown = Requirement::parse_category("chores", PermissionLevel::View);
        assert_eq!(unknown.kind(), RequirementKind::Category);
        assert_eq!(
            gate.check(&unknown),
            GateDecision::Denied {
                capability: "chores".into()
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            DiagnosticEvent::UnrecognizedCategory {
                name: "chores".into()
            }
        );
    }

    #[test]
    fn test_loading_is_pending_not_allowed() {
        let gate = loading_gate();
        let requirement = Requirement::view(PermissionCategory::Calendar);
        assert_eq!(gate.check(&requirement), GateDecision::Pending);

        match gate.render(&requirement, "calendar", None) {
            Rendered::Placeholder(notice) => assert!(notice.pending),
            other => panic!("expected placeholder, got {other:?}"),
        }
    }

    #[test]
    fn test_render_picks_content_fallback_or_notice() {
        let gate = gate_for(Role::Teen, AdditionalAdultGrant::none());

        let allowed = gate.render(&Requirement::edit(PermissionCategory::Tasks), "tasks", None);
        assert_eq!(allowed, Rendered::Content("tasks"));

        let archives = Requirement::manage(PermissionCategory::Archives);
        assert_eq!(
            gate.render(&archives, "archives", Some("read-only")),
            Rendered::Fallback("read-only")
        );

        match gate.render(&archives, "archives", None) {
            Rendered::Placeholder(notice) => {
                assert!(!notice.pending);
                assert_eq!(notice.capability, "full access to Archives");
                assert!(notice.to_string().contains("family organizer"));
            }
            other => panic!("expected placeholder, got {other:?}"),
        }
    }

    #[test]
    fn test_item_requirement_capability() {
        let requirement = Requirement::view(PermissionCategory::Archives).for_item("album-1");
        assert_eq!(requirement.capability(), "view access to Archives (album-1)");
    }
}
