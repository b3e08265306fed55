//! Role defaults table
//!
//! The floor for every member before overrides are applied. The match is
//! exhaustive over [`Role`] and every arm builds a full [`CategoryMap`].

use crate::PermissionLevel::{Edit, Full, None as NoAccess, View};
use crate::{CategoryMap, Role};

/// Default per-category levels for a role
pub const fn defaults_for(role: Role) -> CategoryMap {
    match role {
        Role::PrimaryOrganizer => CategoryMap::uniform(Full),
        Role::Parent => CategoryMap {
            calendar: Full,
            tasks: Full,
            victories: Full,
            archives: Edit,
            best_intentions: Full,
            widgets: Full,
        },
        Role::AdditionalAdult => CategoryMap {
            calendar: View,
            tasks: View,
            victories: View,
            archives: NoAccess,
            best_intentions: NoAccess,
            widgets: View,
        },
        Role::Teen => CategoryMap {
            calendar: Edit,
            tasks: Edit,
            victories: Edit,
            archives: View,
            best_intentions: Edit,
            widgets: Edit,
        },
        Role::Child => CategoryMap {
            calendar: View,
            tasks: Edit,
            victories: View,
            archives: NoAccess,
            best_intentions: View,
            widgets: View,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PermissionCategory, PermissionLevel, at_least};

    #[test]
    fn test_every_role_defines_every_category() {
        for role in Role::ALL {
            let map = defaults_for(role);
            for category in PermissionCategory::ALL {
                assert!(PermissionLevel::ALL.contains(&map.get(category)));
            }
        }
    }

    #[test]
    fn test_primary_organizer_has_full_access() {
        let map = defaults_for(Role::PrimaryOrganizer);
        assert!(map.iter().all(|(_, level)| level == Full));
    }

    #[test]
    fn test_child_defaults() {
        let map = defaults_for(Role::Child);
        assert_eq!(map.tasks, Edit);
        assert_eq!(map.calendar, View);
        assert!(at_least(map.tasks, Edit));
        assert!(!at_least(map.tasks, Full));
    }

    #[test]
    fn test_additional_adult_cannot_see_archives() {
        let map = defaults_for(Role::AdditionalAdult);
        assert_eq!(map.archives, NoAccess);
        assert_eq!(map.calendar, View);
    }

    #[test]
    fn test_parent_outranks_teen_everywhere() {
        let parent = defaults_for(Role::Parent);
        let teen = defaults_for(Role::Teen);
        for category in PermissionCategory::ALL {
            assert!(at_least(parent.get(category), teen.get(category)));
        }
    }
}
