//! Permission resources and action flags

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bitmask of actions a permission grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionAction(u32);

impl PermissionAction {
    pub const CREATE: Self = Self(1);
    pub const READ: Self = Self(2);
    pub const UPDATE: Self = Self(4);
    pub const DELETE: Self = Self(8);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when every bit of `other` is set in `self`
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for PermissionAction {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl BitOr for PermissionAction {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PermissionAction {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(PermissionAction, &str); 4] = [
            (PermissionAction::CREATE, "CREATE"),
            (PermissionAction::READ, "READ"),
            (PermissionAction::UPDATE, "UPDATE"),
            (PermissionAction::DELETE, "DELETE"),
        ];

        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();

        if names.is_empty() {
            write!(f, "NONE({})", self.0)
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

/// One permission entry of an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(rename = "Resource")]
    pub resource: String,
    #[serde(rename = "Action")]
    pub action: PermissionAction,
}

impl Permission {
    pub fn new(resource: impl Into<String>, action: PermissionAction) -> Self {
        Self {
            resource: resource.into(),
            action,
        }
    }

    /// Whether this entry covers `action` on `resource`
    pub fn grants(&self, resource: &str, action: PermissionAction) -> bool {
        self.action.contains(action) && resource_matches(&self.resource, resource)
    }
}

/// Match a granted resource pattern against a required resource
///
/// Resources are `:`-separated. A `*` segment in the pattern matches any one
/// segment; a trailing `*` also matches any remaining segments.
pub fn resource_matches(pattern: &str, required: &str) -> bool {
    let granted: Vec<&str> = pattern.split(':').collect();
    let wanted: Vec<&str> = required.split(':').collect();

    if granted.len() > wanted.len() {
        return false;
    }
    if granted.len() < wanted.len() && granted.last() != Some(&"*") {
        return false;
    }

    granted
        .iter()
        .zip(wanted.iter())
        .all(|(g, w)| *g == "*" || g == w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_contains() {
        let read_update = PermissionAction::READ | PermissionAction::UPDATE;
        assert_eq!(read_update.bits(), 6);
        assert!(read_update.contains(PermissionAction::READ));
        assert!(!read_update.contains(PermissionAction::DELETE));
        assert!(!PermissionAction::READ.contains(read_update));
    }

    #[test]
    fn test_action_display() {
        assert_eq!(PermissionAction::from_bits(6).to_string(), "READ|UPDATE");
        assert_eq!(PermissionAction::default().to_string(), "NONE(0)");
    }

    #[test]
    fn test_resource_matching() {
        let required = "ADMIN:NAMESPACE:accelbyte:PIRGRPCSERVICE:CONFIG";

        assert!(resource_matches(required, required));
        assert!(resource_matches(
            "ADMIN:NAMESPACE:*:PIRGRPCSERVICE:CONFIG",
            required
        ));
        assert!(resource_matches("ADMIN:NAMESPACE:accelbyte:*", required));
        assert!(!resource_matches(
            "ADMIN:NAMESPACE:other:PIRGRPCSERVICE:CONFIG",
            required
        ));
        assert!(!resource_matches("ADMIN:NAMESPACE:accelbyte", required));
        assert!(!resource_matches(
            "ADMIN:NAMESPACE:accelbyte:PIRGRPCSERVICE:CONFIG:EXTRA",
            required
        ));
    }

    #[test]
    fn test_permission_deserializes_from_claim_shape() {
        let permission: Permission =
            serde_json::from_str(r#"{"Resource":"ADMIN:NAMESPACE:*:ITEM","Action":6}"#).unwrap();
        assert!(permission.grants("ADMIN:NAMESPACE:accelbyte:ITEM", PermissionAction::READ));
        assert!(!permission.grants("ADMIN:NAMESPACE:accelbyte:ITEM", PermissionAction::CREATE));
    }
}
