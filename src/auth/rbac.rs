//! Role to permission mapping.
//!
//! Permissions are `resource:action` strings. A trailing `*` grants every
//! action on the resource and a bare `*` grants everything.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::entities::ProfileRole;

pub mod permissions {
    pub const PROFILES_CREATE: &str = "profiles:create";
    pub const PROFILES_READ: &str = "profiles:read";
    pub const QUOTATIONS_CREATE: &str = "quotations:create";
    pub const QUOTATIONS_READ: &str = "quotations:read";
    pub const QUOTATIONS_UPDATE: &str = "quotations:update";
    pub const QUOTATIONS_DELETE: &str = "quotations:delete";
    pub const JOB_ORDERS_CREATE: &str = "job_orders:create";
    pub const JOB_ORDERS_READ: &str = "job_orders:read";
    pub const JOB_ORDERS_UPDATE: &str = "job_orders:update";
    pub const JOB_ORDERS_DELETE: &str = "job_orders:delete";
    pub const SAMPLING_CREATE: &str = "sampling:create";
    pub const SAMPLING_READ: &str = "sampling:read";
    pub const SAMPLING_UPDATE_STATUS: &str = "sampling:update_status";
    pub const SAMPLING_PHOTOS: &str = "sampling:photos";
    pub const SAMPLING_DELETE: &str = "sampling:delete";
    pub const TRAVEL_ORDERS_CREATE: &str = "travel_orders:create";
    pub const TRAVEL_ORDERS_READ: &str = "travel_orders:read";
    pub const TRAVEL_ORDERS_DELETE: &str = "travel_orders:delete";
    pub const DASHBOARD_READ: &str = "dashboard:read";
}

use permissions::*;

static ROLE_PERMISSIONS: Lazy<HashMap<ProfileRole, Vec<&'static str>>> = Lazy::new(|| {
    let mut roles = HashMap::new();
    roles.insert(ProfileRole::Admin, vec!["*"]);
    roles.insert(
        ProfileRole::Operator,
        vec![
            PROFILES_READ,
            "quotations:*",
            "job_orders:*",
            "sampling:*",
            "travel_orders:*",
            DASHBOARD_READ,
        ],
    );
    roles.insert(
        ProfileRole::FieldOfficer,
        vec![
            SAMPLING_READ,
            SAMPLING_UPDATE_STATUS,
            SAMPLING_PHOTOS,
            TRAVEL_ORDERS_READ,
            DASHBOARD_READ,
        ],
    );
    roles.insert(ProfileRole::Client, vec![QUOTATIONS_READ, DASHBOARD_READ]);
    roles
});

fn grant_matches(grant: &str, permission: &str) -> bool {
    if grant == "*" || grant == permission {
        return true;
    }
    match grant.strip_suffix('*') {
        Some(prefix) => permission.starts_with(prefix),
        None => false,
    }
}

/// Whether `role` is granted `permission`
pub fn role_has_permission(role: ProfileRole, permission: &str) -> bool {
    ROLE_PERMISSIONS
        .get(&role)
        .map(|grants| grants.iter().any(|g| grant_matches(g, permission)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_everything() {
        assert!(role_has_permission(ProfileRole::Admin, PROFILES_CREATE));
        assert!(role_has_permission(ProfileRole::Admin, "anything:at_all"));
    }

    #[test]
    fn operator_wildcards_cover_resource_actions() {
        assert!(role_has_permission(ProfileRole::Operator, QUOTATIONS_DELETE));
        assert!(role_has_permission(ProfileRole::Operator, SAMPLING_CREATE));
        assert!(!role_has_permission(ProfileRole::Operator, PROFILES_CREATE));
    }

    #[test]
    fn field_officer_limited_to_own_work() {
        assert!(role_has_permission(
            ProfileRole::FieldOfficer,
            SAMPLING_UPDATE_STATUS
        ));
        assert!(!role_has_permission(ProfileRole::FieldOfficer, SAMPLING_CREATE));
        assert!(!role_has_permission(
            ProfileRole::FieldOfficer,
            TRAVEL_ORDERS_CREATE
        ));
    }

    #[test]
    fn client_reads_quotations_only() {
        assert!(role_has_permission(ProfileRole::Client, QUOTATIONS_READ));
        assert!(!role_has_permission(ProfileRole::Client, JOB_ORDERS_READ));
    }

    #[test]
    fn wildcard_does_not_leak_across_resources() {
        assert!(!grant_matches("sampling:*", "samplingx"));
        assert!(grant_matches("sampling:*", "sampling:read"));
        assert!(!grant_matches("sampling:*", "travel_orders:read"));
    }
}
