//! Permission level ordering
//!
//! Levels form a fixed total order `none < view < edit < full`. Every
//! "at least" check in the crate goes through [`at_least`].

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::AccessError;

/// How much a member may do within a category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// No access
    #[default]
    None,
    /// Read-only access
    View,
    /// Can create and modify content
    Edit,
    /// Full control, including management
    Full,
}

impl PermissionLevel {
    /// All levels in ascending order
    pub const ALL: [PermissionLevel; 4] = [Self::None, Self::View, Self::Edit, Self::Full];

    /// Position of this level in the ordering table
    pub const fn index(self) -> u8 {
        match self {
            Self::None => 0,
            Self::View => 1,
            Self::Edit => 2,
            Self::Full => 3,
        }
    }

    /// Get string representation for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::View => "view",
            Self::Edit => "edit",
            Self::Full => "full",
        }
    }
}

/// Returns true when `actual` grants at least `required`.
#[inline]
pub const fn at_least(actual: PermissionLevel, required: PermissionLevel) -> bool {
    actual.index() >= required.index()
}

impl PartialOrd for PermissionLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PermissionLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index().cmp(&other.index())
    }
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PermissionLevel {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "view" => Ok(Self::View),
            "edit" => Ok(Self::Edit),
            "full" => Ok(Self::Full),
            _ => Err(AccessError::UnrecognizedLevel(s.to_string())),
        }
    }
}
