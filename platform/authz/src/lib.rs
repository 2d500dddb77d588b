//! Authorization model for the property console.
//!
//! Admins come in three tiers (`super_admin`, `full_access`, `custom`) and are
//! scoped to the projects they are assigned; guards read users of a single
//! project. Decisions are plain functions over an [`Actor`] snapshot that the
//! caller passes in explicitly.

pub mod actor;
pub mod approval;
pub mod catalog;
pub mod decision;
pub mod grants;

pub use actor::{Actor, AdminAccess, AdminActor, GuardActor, ProjectScoped};
pub use approval::{AccessTerms, AdminProfile, ApprovalError, PendingAdminRequest, RequestStatus};
pub use catalog::{AccountType, Action, EntityKey, ParseError, ProjectId};
pub use decision::{
    AuthzError, authorize, authorize_delegation, can_access, can_delegate, effective_permissions,
    filter_projects_for_actor, has_permission, has_project_access,
};
pub use grants::{
    PermissionGrant, RawGrant, UnknownGrantAction, ValidationError, full_access_actions,
    parse_grant, super_admin_actions, to_raw_grant, validate_permission_grant,
};
