//! Self-registered admin requests and their one-shot resolution.
//!
//! A request is not an actor. It only yields an [`AdminActor`] when approved,
//! and resolution functions never mutate their input: on error the caller
//! still holds the untouched pending request.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::actor::{AdminAccess, AdminActor};
use crate::catalog::{AccountType, ProjectId};
use crate::grants::{RawGrant, ValidationError, validate_permission_grant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

/// Profile fields carried from the request onto the admin account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminProfile {
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAdminRequest {
    pub id: Uuid,
    /// Identity that registered; becomes the admin's id on approval.
    pub applicant_id: Uuid,
    pub profile: AdminProfile,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

/// What an approver assigns to the new admin.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessTerms {
    pub account_type: Option<AccountType>,
    pub assigned_projects: HashSet<ProjectId>,
    /// Only read for `custom`.
    pub permissions: RawGrant,
}

impl AccessTerms {
    /// Turn the terms into an access tier, validating custom grants.
    pub fn into_access(self) -> Result<AdminAccess, ApprovalError> {
        let account_type = self.account_type.ok_or(ApprovalError::MissingAccountType)?;
        Ok(match account_type {
            AccountType::SuperAdmin => AdminAccess::SuperAdmin,
            AccountType::FullAccess => AdminAccess::FullAccess {
                assigned_projects: self.assigned_projects,
            },
            AccountType::Custom => AdminAccess::Custom {
                permissions: validate_permission_grant(&self.permissions)?,
                assigned_projects: self.assigned_projects,
            },
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("admin request {id} is already {status:?}")]
    AlreadyResolved { id: Uuid, status: RequestStatus },
    #[error("an account type is required")]
    MissingAccountType,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl PendingAdminRequest {
    pub fn new(applicant_id: Uuid, profile: AdminProfile, requested_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            applicant_id,
            profile,
            status: RequestStatus::Pending,
            requested_at,
            resolved_by: None,
            resolved_at: None,
            rejection_reason: None,
        }
    }

    fn ensure_pending(&self) -> Result<(), ApprovalError> {
        if self.status.is_terminal() {
            return Err(ApprovalError::AlreadyResolved {
                id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }

    /// Resolve as approved and build the admin it spawns.
    pub fn approve(
        &self,
        approver: Uuid,
        terms: AccessTerms,
        now: DateTime<Utc>,
    ) -> Result<(PendingAdminRequest, AdminActor), ApprovalError> {
        self.ensure_pending()?;
        let access = terms.into_access()?;
        let resolved = PendingAdminRequest {
            status: RequestStatus::Approved,
            resolved_by: Some(approver),
            resolved_at: Some(now),
            ..self.clone()
        };
        let admin = AdminActor {
            id: self.applicant_id,
            access,
            is_active: true,
        };
        Ok((resolved, admin))
    }

    /// Resolve as rejected. Blank reasons are dropped.
    pub fn reject(
        &self,
        approver: Uuid,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<PendingAdminRequest, ApprovalError> {
        self.ensure_pending()?;
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        Ok(PendingAdminRequest {
            status: RequestStatus::Rejected,
            resolved_by: Some(approver),
            resolved_at: Some(now),
            rejection_reason: reason,
            ..self.clone()
        })
    }
}
