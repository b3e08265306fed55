//! Action grants for additional adults
//!
//! Independent of the category model: a fixed set of named actions, each
//! backed by one flag on the member's [`AdditionalAdultGrant`].

use serde::{Deserialize, Serialize};

use crate::{AccessError, MemberId};

/// Grouping used when presenting actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionGroup {
    View,
    Tasks,
    Calendar,
    Family,
    Advanced,
}

/// Fine-grained operation gated by an additional-adult grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    ViewFamilyData,
    /// Checked against a target member id
    ViewMember,
    ViewArchives,
    CreateTasks,
    EditTasks,
    AssignTasks,
    CompleteTasks,
    ViewCalendar,
    CreateEvents,
    EditCalendar,
    ManageChildren,
    ManageBestIntentions,
    SendMessages,
    AccessReports,
    ManageWidgets,
    ManageSettings,
}

impl PermissionAction {
    pub const ALL: [PermissionAction; 16] = [
        Self::ViewFamilyData,
        Self::ViewMember,
        Self::ViewArchives,
        Self::CreateTasks,
        Self::EditTasks,
        Self::AssignTasks,
        Self::CompleteTasks,
        Self::ViewCalendar,
        Self::CreateEvents,
        Self::EditCalendar,
        Self::ManageChildren,
        Self::ManageBestIntentions,
        Self::SendMessages,
        Self::AccessReports,
        Self::ManageWidgets,
        Self::ManageSettings,
    ];

    pub fn group(&self) -> ActionGroup {
        match self {
            Self::ViewFamilyData | Self::ViewMember | Self::ViewArchives => ActionGroup::View,
            Self::CreateTasks | Self::EditTasks | Self::AssignTasks | Self::CompleteTasks => {
                ActionGroup::Tasks
            }
            Self::ViewCalendar | Self::CreateEvents | Self::EditCalendar => ActionGroup::Calendar,
            Self::ManageChildren | Self::ManageBestIntentions | Self::SendMessages => {
                ActionGroup::Family
            }
            Self::AccessReports | Self::ManageWidgets | Self::ManageSettings => {
                ActionGroup::Advanced
            }
        }
    }

    /// Get string representation for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewFamilyData => "view_family_data",
            Self::ViewMember => "view_member",
            Self::ViewArchives => "view_archives",
            Self::CreateTasks => "create_tasks",
            Self::EditTasks => "edit_tasks",
            Self::AssignTasks => "assign_tasks",
            Self::CompleteTasks => "complete_tasks",
            Self::ViewCalendar => "view_calendar",
            Self::CreateEvents => "create_events",
            Self::EditCalendar => "edit_calendar",
            Self::ManageChildren => "manage_children",
            Self::ManageBestIntentions => "manage_best_intentions",
            Self::SendMessages => "send_messages",
            Self::AccessReports => "access_reports",
            Self::ManageWidgets => "manage_widgets",
            Self::ManageSettings => "manage_settings",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::ViewFamilyData => "View family data",
            Self::ViewMember => "View specific family members",
            Self::ViewArchives => "View archives",
            Self::CreateTasks => "Create tasks",
            Self::EditTasks => "Edit tasks",
            Self::AssignTasks => "Assign tasks",
            Self::CompleteTasks => "Complete tasks",
            Self::ViewCalendar => "View calendar",
            Self::CreateEvents => "Create events",
            Self::EditCalendar => "Edit calendar",
            Self::ManageChildren => "Manage children",
            Self::ManageBestIntentions => "Manage best intentions",
            Self::SendMessages => "Send messages",
            Self::AccessReports => "Access reports",
            Self::ManageWidgets => "Manage widgets",
            Self::ManageSettings => "Manage settings",
        }
    }
}

impl std::fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PermissionAction {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == key)
            .ok_or_else(|| AccessError::UnrecognizedAction(s.to_string()))
    }
}

/// Action flags for one additional adult. Defaults to nothing granted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdditionalAdultGrant {
    pub can_view_family_data: bool,
    /// Members visible even without `can_view_family_data`
    pub can_view_specific_members: Vec<MemberId>,
    pub can_view_archives: bool,
    pub can_create_tasks: bool,
    pub can_edit_tasks: bool,
    pub can_assign_tasks: bool,
    pub can_complete_tasks: bool,
    pub can_view_calendar: bool,
    pub can_create_events: bool,
    pub can_edit_calendar: bool,
    pub can_manage_children: bool,
    pub can_manage_best_intentions: bool,
    pub can_send_messages: bool,
    pub can_access_reports: bool,
    pub can_manage_widgets: bool,
    pub can_manage_settings: bool,
}

impl AdditionalAdultGrant {
    /// Grant with nothing allowed
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the flag backing `action`. `ViewMember` is list-backed and ignored here.
    pub fn set(&mut self, action: PermissionAction, allowed: bool) {
        let flag = match action {
            PermissionAction::ViewFamilyData => &mut self.can_view_family_data,
            PermissionAction::ViewMember => return,
            PermissionAction::ViewArchives => &mut self.can_view_archives,
            PermissionAction::CreateTasks => &mut self.can_create_tasks,
            PermissionAction::EditTasks => &mut self.can_edit_tasks,
            PermissionAction::AssignTasks => &mut self.can_assign_tasks,
            PermissionAction::CompleteTasks => &mut self.can_complete_tasks,
            PermissionAction::ViewCalendar => &mut self.can_view_calendar,
            PermissionAction::CreateEvents => &mut self.can_create_events,
            PermissionAction::EditCalendar => &mut self.can_edit_calendar,
            PermissionAction::ManageChildren => &mut self.can_manage_children,
            PermissionAction::ManageBestIntentions => &mut self.can_manage_best_intentions,
            PermissionAction::SendMessages => &mut self.can_send_messages,
            PermissionAction::AccessReports => &mut self.can_access_reports,
            PermissionAction::ManageWidgets => &mut self.can_manage_widgets,
            PermissionAction::ManageSettings => &mut self.can_manage_settings,
        };
        *flag = allowed;
    }

    /// Builder form of [`set`](Self::set) that allows `action`
    #[must_use]
    pub fn allow(mut self, action: PermissionAction) -> Self {
        self.set(action, true);
        self
    }

    /// Add members to the visibility list
    #[must_use]
    pub fn with_visible_members<I, T>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<MemberId>,
    {
        for member in members {
            let member = member.into();
            if !self.can_view_specific_members.contains(&member) {
                self.can_view_specific_members.push(member);
            }
        }
        self
    }
}

/// Coarse summary of how much a grant allows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantLevel {
    None,
    Limited,
    Moderate,
    Extensive,
}

impl GrantLevel {
    /// `0` none, `1..=3` limited, `4..=7` moderate, `8+` extensive
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => Self::None,
            1..=3 => Self::Limited,
            4..=7 => Self::Moderate,
            _ => Self::Extensive,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Limited => "limited",
            Self::Moderate => "moderate",
            Self::Extensive => "extensive",
        }
    }
}

/// Read-only evaluator over a grant snapshot
#[derive(Debug, Clone, Copy)]
pub struct GrantEvaluator<'a> {
    grant: &'a AdditionalAdultGrant,
}

impl<'a> GrantEvaluator<'a> {
    pub fn new(grant: &'a AdditionalAdultGrant) -> Self {
        Self { grant }
    }

    /// Whether `action` is allowed, optionally against a target member
    pub fn can(&self, action: PermissionAction, target: Option<&str>) -> bool {
        let g = self.grant;
        match action {
            PermissionAction::ViewFamilyData => g.can_view_family_data,
            PermissionAction::ViewMember => {
                g.can_view_family_data
                    || target.is_some_and(|t| g.can_view_specific_members.iter().any(|m| m == t))
            }
            PermissionAction::ViewArchives => g.can_view_archives,
            PermissionAction::CreateTasks => g.can_create_tasks,
            PermissionAction::EditTasks => g.can_edit_tasks,
            PermissionAction::AssignTasks => g.can_assign_tasks,
            PermissionAction::CompleteTasks => g.can_complete_tasks,
            PermissionAction::ViewCalendar => g.can_view_calendar,
            PermissionAction::CreateEvents => g.can_create_events,
            PermissionAction::EditCalendar => g.can_edit_calendar,
            PermissionAction::ManageChildren => g.can_manage_children,
            PermissionAction::ManageBestIntentions => g.can_manage_best_intentions,
            PermissionAction::SendMessages => g.can_send_messages,
            PermissionAction::AccessReports => g.can_access_reports,
            PermissionAction::ManageWidgets => g.can_manage_widgets,
            PermissionAction::ManageSettings => g.can_manage_settings,
        }
    }

    /// Like [`can`](Self::can) for a stored action name; unknown names are denied
    pub fn can_named(&self, name: &str, target: Option<&str>) -> bool {
        match name.parse::<PermissionAction>() {
            Ok(action) => self.can(action, target),
            Err(_) => false,
        }
    }

    /// Actions whose flag is set, or whose list is non-empty
    pub fn granted_actions(&self) -> Vec<PermissionAction> {
        PermissionAction::ALL
            .into_iter()
            .filter(|action| match action {
                PermissionAction::ViewMember => !self.grant.can_view_specific_members.is_empty(),
                other => self.can(*other, None),
            })
            .collect()
    }

    /// Labels of every granted action
    pub fn granted_permissions(&self) -> Vec<&'static str> {
        self.granted_actions().iter().map(|a| a.label()).collect()
    }

    pub fn permission_level(&self) -> GrantLevel {
        GrantLevel::from_count(self.granted_actions().len())
    }
}
