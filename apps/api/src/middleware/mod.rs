pub mod auth;

pub use auth::{
    authenticate, guard, require_roles, CurrentUser, ADMIN_ROLES, CENTRAL_ROLES,
    HEAD_NURSE_ROLES, INSTRUMENTATION_ROLES, SUPPLY_ROLES,
};
