//! Access decisions over an actor snapshot.
//!
//! Every function here is pure: it reads the snapshot handed in and nothing
//! else, so callers may invoke it from any thread without coordination. A
//! `None` actor stands for "no profile found" and is denied everything.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::debug;

use crate::actor::{Actor, AdminAccess, ProjectScoped};
use crate::catalog::{Action, EntityKey, ProjectId};
use crate::grants::{PermissionGrant, full_access_actions, super_admin_actions, table_grant};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("action {action} denied for resource {resource}")]
    Denied { action: String, resource: String },
}

/// Whether `actor` may perform `action` on `entity`, ignoring projects.
pub fn has_permission(actor: Option<&Actor>, entity: EntityKey, action: Action) -> bool {
    let Some(actor) = actor.filter(|a| a.is_active()) else {
        return false;
    };
    match actor {
        Actor::Guard(_) => entity == EntityKey::Users && action == Action::Read,
        Actor::Admin(admin) => match &admin.access {
            AdminAccess::SuperAdmin => true,
            AdminAccess::FullAccess { .. } => full_access_actions(entity).contains(&action),
            AdminAccess::Custom { permissions, .. } => match permissions.get(&entity) {
                Some(actions) => actions.contains(&action),
                // absent entity = no grant
                None => false,
            },
        },
    }
}

/// Whether `actor` may act within `project`.
pub fn has_project_access(actor: Option<&Actor>, project: &ProjectId) -> bool {
    let Some(actor) = actor.filter(|a| a.is_active()) else {
        return false;
    };
    match actor {
        Actor::Guard(guard) => guard.project_id == *project,
        Actor::Admin(admin) => match admin.access.assigned_projects() {
            None => true,
            Some(assigned) => assigned.contains(project),
        },
    }
}

/// `has_permission`, and when a project is given, `has_project_access` too.
pub fn can_access(
    actor: Option<&Actor>,
    entity: EntityKey,
    action: Action,
    project: Option<&ProjectId>,
) -> bool {
    has_permission(actor, entity, action)
        && project.is_none_or(|project| has_project_access(actor, project))
}

/// [`can_access`] as a `Result`, for call sites that bail with `?`.
pub fn authorize(
    actor: Option<&Actor>,
    entity: EntityKey,
    action: Action,
    project: Option<&ProjectId>,
) -> Result<(), AuthzError> {
    if can_access(actor, entity, action, project) {
        return Ok(());
    }
    let resource = match project {
        Some(project) => format!("{entity}@{project}"),
        None => entity.to_string(),
    };
    debug!(
        actor = ?actor.map(Actor::id),
        %action,
        %resource,
        "access denied"
    );
    Err(AuthzError::Denied {
        action: action.to_string(),
        resource,
    })
}

/// Projects the actor may see, in input order.
pub fn filter_projects_for_actor<P: ProjectScoped>(
    actor: Option<&Actor>,
    projects: impl IntoIterator<Item = P>,
) -> Vec<P> {
    match actor {
        Some(Actor::Admin(admin))
            if admin.is_active && admin.access.assigned_projects().is_none() =>
        {
            projects.into_iter().collect()
        }
        _ => projects
            .into_iter()
            .filter(|project| has_project_access(actor, project.project_id()))
            .collect(),
    }
}

/// The matrix the console shows for this actor.
pub fn effective_permissions(actor: Option<&Actor>) -> PermissionGrant {
    let Some(actor) = actor.filter(|a| a.is_active()) else {
        return PermissionGrant::new();
    };
    match actor {
        Actor::Guard(_) => {
            PermissionGrant::from([(EntityKey::Users, BTreeSet::from([Action::Read]))])
        }
        Actor::Admin(admin) => match &admin.access {
            AdminAccess::SuperAdmin => table_grant(super_admin_actions),
            AdminAccess::FullAccess { .. } => table_grant(full_access_actions),
            AdminAccess::Custom { permissions, .. } => permissions.clone(),
        },
    }
}

/// Whether `grantor` may hand `access` to another admin.
///
/// The fixed tiers are granted by super admins only. Any other admin may
/// delegate a custom grant that it holds itself, within its own projects.
pub fn can_delegate(grantor: Option<&Actor>, access: &AdminAccess) -> bool {
    let Some(Actor::Admin(admin)) = grantor.filter(|a| a.is_active()) else {
        return false;
    };
    if matches!(admin.access, AdminAccess::SuperAdmin) {
        return true;
    }
    match access {
        AdminAccess::Custom {
            assigned_projects,
            permissions,
        } => {
            permissions.iter().all(|(entity, actions)| {
                actions
                    .iter()
                    .all(|action| has_permission(grantor, *entity, *action))
            }) && assigned_projects
                .iter()
                .all(|project| has_project_access(grantor, project))
        }
        AdminAccess::SuperAdmin | AdminAccess::FullAccess { .. } => false,
    }
}

/// [`can_delegate`] as a `Result`.
pub fn authorize_delegation(
    grantor: Option<&Actor>,
    access: &AdminAccess,
) -> Result<(), AuthzError> {
    if can_delegate(grantor, access) {
        return Ok(());
    }
    let resource = access.account_type().to_string();
    debug!(actor = ?grantor.map(Actor::id), %resource, "delegation denied");
    Err(AuthzError::Denied {
        action: "delegate".to_string(),
        resource,
    })
}
