use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{AccountType, ProjectId};
use crate::grants::PermissionGrant;

/// The authenticated identity whose access is being evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Actor {
    Admin(AdminActor),
    Guard(GuardActor),
}

impl Actor {
    pub fn id(&self) -> Uuid {
        match self {
            Actor::Admin(admin) => admin.id,
            Actor::Guard(guard) => guard.id,
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Actor::Admin(admin) => admin.is_active,
            Actor::Guard(guard) => guard.is_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminActor {
    pub id: Uuid,
    pub access: AdminAccess,
    pub is_active: bool,
}

/// Tier-specific data of an admin. Super admins carry no project list or
/// grant because neither is consulted for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "account_type", rename_all = "snake_case")]
pub enum AdminAccess {
    SuperAdmin,
    FullAccess {
        assigned_projects: HashSet<ProjectId>,
    },
    Custom {
        assigned_projects: HashSet<ProjectId>,
        permissions: PermissionGrant,
    },
}

impl AdminAccess {
    pub fn account_type(&self) -> AccountType {
        match self {
            AdminAccess::SuperAdmin => AccountType::SuperAdmin,
            AdminAccess::FullAccess { .. } => AccountType::FullAccess,
            AdminAccess::Custom { .. } => AccountType::Custom,
        }
    }

    /// `None` for super admins, who are not scoped.
    pub fn assigned_projects(&self) -> Option<&HashSet<ProjectId>> {
        match self {
            AdminAccess::SuperAdmin => None,
            AdminAccess::FullAccess { assigned_projects }
            | AdminAccess::Custom {
                assigned_projects, ..
            } => Some(assigned_projects),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardActor {
    pub id: Uuid,
    pub project_id: ProjectId,
    pub is_active: bool,
}

/// Anything that belongs to exactly one project.
pub trait ProjectScoped {
    fn project_id(&self) -> &ProjectId;
}

impl ProjectScoped for ProjectId {
    fn project_id(&self) -> &ProjectId {
        self
    }
}

impl<T: ProjectScoped> ProjectScoped for &T {
    fn project_id(&self) -> &ProjectId {
        (*self).project_id()
    }
}
