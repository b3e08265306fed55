//! Permission categories and the per-category level map

use serde::{Deserialize, Serialize};

use crate::{AccessError, PermissionLevel};

/// Resource area a permission level applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCategory {
    Calendar,
    Tasks,
    Victories,
    Archives,
    BestIntentions,
    Widgets,
}

impl PermissionCategory {
    pub const ALL: [PermissionCategory; 6] = [
        Self::Calendar,
        Self::Tasks,
        Self::Victories,
        Self::Archives,
        Self::BestIntentions,
        Self::Widgets,
    ];

    /// Get string representation for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::Tasks => "tasks",
            Self::Victories => "victories",
            Self::Archives => "archives",
            Self::BestIntentions => "best_intentions",
            Self::Widgets => "widgets",
        }
    }

    /// Human-readable name for denial messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Calendar => "Calendar",
            Self::Tasks => "Tasks",
            Self::Victories => "Victories",
            Self::Archives => "Archives",
            Self::BestIntentions => "Best Intentions",
            Self::Widgets => "Widgets",
        }
    }
}

impl std::fmt::Display for PermissionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PermissionCategory {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "calendar" => Ok(Self::Calendar),
            "tasks" => Ok(Self::Tasks),
            "victories" => Ok(Self::Victories),
            "archives" => Ok(Self::Archives),
            "best_intentions" => Ok(Self::BestIntentions),
            "widgets" => Ok(Self::Widgets),
            _ => Err(AccessError::UnrecognizedCategory(s.to_string())),
        }
    }
}

/// A level for every category
///
/// One field per category, so a map can never be missing an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMap {
    pub calendar: PermissionLevel,
    pub tasks: PermissionLevel,
    pub victories: PermissionLevel,
    pub archives: PermissionLevel,
    pub best_intentions: PermissionLevel,
    pub widgets: PermissionLevel,
}

impl CategoryMap {
    /// Every category at `none`
    pub const fn none() -> Self {
        Self::uniform(PermissionLevel::None)
    }

    /// Every category at the same level
    pub const fn uniform(level: PermissionLevel) -> Self {
        Self {
            calendar: level,
            tasks: level,
            victories: level,
            archives: level,
            best_intentions: level,
            widgets: level,
        }
    }

    pub fn get(&self, category: PermissionCategory) -> PermissionLevel {
        match category {
            PermissionCategory::Calendar => self.calendar,
            PermissionCategory::Tasks => self.tasks,
            PermissionCategory::Victories => self.victories,
            PermissionCategory::Archives => self.archives,
            PermissionCategory::BestIntentions => self.best_intentions,
            PermissionCategory::Widgets => self.widgets,
        }
    }

    pub fn set(&mut self, category: PermissionCategory, level: PermissionLevel) {
        let slot = match category {
            PermissionCategory::Calendar => &mut self.calendar,
            PermissionCategory::Tasks => &mut self.tasks,
            PermissionCategory::Victories => &mut self.victories,
            PermissionCategory::Archives => &mut self.archives,
            PermissionCategory::BestIntentions => &mut self.best_intentions,
            PermissionCategory::Widgets => &mut self.widgets,
        };
        *slot = level;
    }

    /// Iterate categories with their levels in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (PermissionCategory, PermissionLevel)> + '_ {
        PermissionCategory::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}
