//! Family roles and member identity

use serde::{Deserialize, Serialize};

use crate::AccessError;

/// Identifier of a family member
pub type MemberId = String;

/// Role of a family member. Assigned outside this crate and fixed per member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Owner of the family space
    PrimaryOrganizer,
    Parent,
    /// Guest or co-parent collaborator governed by an action grant
    AdditionalAdult,
    Teen,
    Child,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Self::PrimaryOrganizer,
        Self::Parent,
        Self::AdditionalAdult,
        Self::Teen,
        Self::Child,
    ];

    /// Whether this role may grant permissions and answer access requests
    pub fn is_organizer(&self) -> bool {
        matches!(self, Self::PrimaryOrganizer | Self::Parent)
    }

    /// Get string representation for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryOrganizer => "primary_organizer",
            Self::Parent => "parent",
            Self::AdditionalAdult => "additional_adult",
            Self::Teen => "teen",
            Self::Child => "child",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "primary_organizer" => Ok(Self::PrimaryOrganizer),
            "parent" => Ok(Self::Parent),
            "additional_adult" => Ok(Self::AdditionalAdult),
            "teen" => Ok(Self::Teen),
            "child" => Ok(Self::Child),
            _ => Err(AccessError::UnrecognizedRole(s.to_string())),
        }
    }
}

/// The slice of a member record the engine needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub id: MemberId,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl FamilyMember {
    pub fn new(id: impl Into<MemberId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            display_name: None,
        }
    }

    /// Set a display name
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}
