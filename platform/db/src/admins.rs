use std::collections::HashSet;

use chrono::Utc;
use entity::{admin_accounts, admin_requests, guards, projects};
use platform_authz::{
    AccessTerms, AccountType, AdminAccess, AdminActor, AdminProfile, ApprovalError,
    PendingAdminRequest, ProjectId, RequestStatus,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::profiles::{admin_actor_from_model, encode_access};
use crate::{DbError, DbResult};

fn status_to_column(status: RequestStatus) -> admin_requests::Status {
    match status {
        RequestStatus::Pending => admin_requests::Status::Pending,
        RequestStatus::Approved => admin_requests::Status::Approved,
        RequestStatus::Rejected => admin_requests::Status::Rejected,
    }
}

fn status_from_column(status: admin_requests::Status) -> RequestStatus {
    match status {
        admin_requests::Status::Pending => RequestStatus::Pending,
        admin_requests::Status::Approved => RequestStatus::Approved,
        admin_requests::Status::Rejected => RequestStatus::Rejected,
    }
}

fn request_from_model(model: admin_requests::Model) -> PendingAdminRequest {
    PendingAdminRequest {
        id: model.id,
        applicant_id: model.applicant_id,
        profile: AdminProfile {
            email: model.email,
            display_name: model.display_name,
            phone: model.phone,
        },
        status: status_from_column(model.status),
        requested_at: model.requested_at.with_timezone(&Utc),
        resolved_by: model.resolved_by,
        resolved_at: model.resolved_at.map(|at| at.with_timezone(&Utc)),
        rejection_reason: model.rejection_reason,
    }
}

fn normalize_profile(profile: AdminProfile) -> DbResult<AdminProfile> {
    let email = profile.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(DbError::InvalidInput("a valid email is required".into()));
    }
    let display_name = profile.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(DbError::InvalidInput("display name must not be empty".into()));
    }
    let phone = profile
        .phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    Ok(AdminProfile {
        email,
        display_name,
        phone,
    })
}

/// Record a self-registration. The applicant holds no permissions until an
/// approver resolves the request.
#[instrument(skip(db, profile))]
pub async fn submit_admin_request(
    db: &DatabaseConnection,
    applicant_id: Uuid,
    profile: AdminProfile,
) -> DbResult<PendingAdminRequest> {
    let profile = normalize_profile(profile)?;
    if admin_accounts::Entity::find_by_id(applicant_id)
        .one(db)
        .await?
        .is_some()
        || guards::Entity::find_by_id(applicant_id).one(db).await?.is_some()
    {
        return Err(DbError::Conflict("identity already has console access".into()));
    }
    let pending = admin_requests::Entity::find()
        .filter(admin_requests::Column::ApplicantId.eq(applicant_id))
        .filter(admin_requests::Column::Status.eq(admin_requests::Status::Pending))
        .one(db)
        .await?;
    if pending.is_some() {
        return Err(DbError::Conflict("a request is already pending".into()));
    }
    ensure_email_free(db, &profile.email).await?;

    let request = PendingAdminRequest::new(applicant_id, profile, Utc::now());
    admin_requests::ActiveModel {
        id: Set(request.id),
        applicant_id: Set(request.applicant_id),
        email: Set(request.profile.email.clone()),
        display_name: Set(request.profile.display_name.clone()),
        phone: Set(request.profile.phone.clone()),
        status: Set(admin_requests::Status::Pending),
        requested_at: Set(request.requested_at.fixed_offset()),
        resolved_by: Set(None),
        resolved_at: Set(None),
        rejection_reason: Set(None),
    }
    .insert(db)
    .await?;
    info!(request = %request.id, "admin request submitted");
    Ok(request)
}

async fn ensure_email_free<C: ConnectionTrait>(db: &C, email: &str) -> DbResult<()> {
    let taken = admin_accounts::Entity::find()
        .filter(admin_accounts::Column::Email.eq(email))
        .one(db)
        .await?;
    match taken {
        Some(_) => Err(DbError::Conflict(format!("{email} is already an admin"))),
        None => Ok(()),
    }
}

/// Assigned projects must name existing projects.
async fn ensure_projects_exist<C: ConnectionTrait>(db: &C, access: &AdminAccess) -> DbResult<()> {
    let Some(assigned) = access.assigned_projects() else {
        return Ok(());
    };
    if assigned.is_empty() {
        return Ok(());
    }
    let known = projects::Entity::find()
        .filter(projects::Column::Id.is_in(assigned.iter().map(|p| p.as_str().to_string())))
        .all(db)
        .await?
        .into_iter()
        .map(|model| model.id)
        .collect::<HashSet<_>>();
    let mut unknown = assigned
        .iter()
        .map(ProjectId::as_str)
        .filter(|id| !known.contains(*id))
        .collect::<Vec<_>>();
    if unknown.is_empty() {
        return Ok(());
    }
    unknown.sort_unstable();
    Err(DbError::InvalidInput(format!(
        "unknown projects: {}",
        unknown.join(", ")
    )))
}

/// Refuse to take away the last active super admin.
async fn ensure_other_super_admin<C: ConnectionTrait>(db: &C, admin_id: Uuid) -> DbResult<()> {
    let others = admin_accounts::Entity::find()
        .filter(admin_accounts::Column::AccountType.eq(AccountType::SuperAdmin.as_str()))
        .filter(admin_accounts::Column::IsActive.eq(true))
        .filter(admin_accounts::Column::Id.ne(admin_id))
        .count(db)
        .await?;
    if others == 0 {
        return Err(DbError::Conflict("the last active super admin must stay".into()));
    }
    Ok(())
}

pub async fn list_admin_requests(
    db: &DatabaseConnection,
    status: Option<RequestStatus>,
) -> DbResult<Vec<PendingAdminRequest>> {
    let mut query =
        admin_requests::Entity::find().order_by_asc(admin_requests::Column::RequestedAt);
    if let Some(status) = status {
        query = query.filter(admin_requests::Column::Status.eq(status_to_column(status)));
    }
    Ok(query
        .all(db)
        .await?
        .into_iter()
        .map(request_from_model)
        .collect())
}

/// Flip a pending request to its resolved state. Guarded on the stored status
/// so a concurrent resolution makes this a no-op that reports the conflict.
async fn write_resolution<C: ConnectionTrait>(
    db: &C,
    resolved: &PendingAdminRequest,
) -> DbResult<()> {
    let result = admin_requests::Entity::update_many()
        .col_expr(
            admin_requests::Column::Status,
            Expr::value(status_to_column(resolved.status)),
        )
        .col_expr(
            admin_requests::Column::ResolvedBy,
            Expr::value(resolved.resolved_by),
        )
        .col_expr(
            admin_requests::Column::ResolvedAt,
            Expr::value(resolved.resolved_at.map(|at| at.fixed_offset())),
        )
        .col_expr(
            admin_requests::Column::RejectionReason,
            Expr::value(resolved.rejection_reason.clone()),
        )
        .filter(admin_requests::Column::Id.eq(resolved.id))
        .filter(admin_requests::Column::Status.eq(admin_requests::Status::Pending))
        .exec(db)
        .await?;
    if result.rows_affected != 1 {
        return Err(ApprovalError::AlreadyResolved {
            id: resolved.id,
            status: resolved.status,
        }
        .into());
    }
    Ok(())
}

async fn load_request<C: ConnectionTrait>(db: &C, id: Uuid) -> DbResult<PendingAdminRequest> {
    admin_requests::Entity::find_by_id(id)
        .one(db)
        .await?
        .map(request_from_model)
        .ok_or(DbError::NotFound)
}

/// Approve a request and create its admin account in one transaction.
///
/// Either both the status flip and the new account are committed, or neither
/// is: validation failures and `AlreadyResolved` abort before any write, and a
/// failing write rolls the transaction back when it is dropped.
#[instrument(skip(db, terms))]
pub async fn approve_admin_request(
    db: &DatabaseConnection,
    request_id: Uuid,
    approver: Uuid,
    terms: AccessTerms,
) -> DbResult<AdminActor> {
    let txn = db.begin().await?;
    let request = load_request(&txn, request_id).await?;
    let now = Utc::now();
    let (resolved, admin) = request.approve(approver, terms, now)?;
    ensure_projects_exist(&txn, &admin.access).await?;
    ensure_email_free(&txn, &resolved.profile.email).await?;
    if guards::Entity::find_by_id(admin.id).one(&txn).await?.is_some() {
        return Err(DbError::Conflict("identity already has console access".into()));
    }

    write_resolution(&txn, &resolved).await?;
    let (account_type, assigned_projects, permissions) = encode_access(&admin.access);
    admin_accounts::ActiveModel {
        id: Set(admin.id),
        email: Set(resolved.profile.email.clone()),
        display_name: Set(resolved.profile.display_name.clone()),
        phone: Set(resolved.profile.phone.clone()),
        account_type: Set(account_type),
        assigned_projects: Set(assigned_projects),
        permissions: Set(permissions),
        is_active: Set(admin.is_active),
        approved_by: Set(Some(approver)),
        created_at: Set(now.fixed_offset()),
        updated_at: Set(now.fixed_offset()),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(
        request = %request_id,
        admin = %admin.id,
        account_type = %admin.access.account_type(),
        "admin request approved"
    );
    Ok(admin)
}

#[instrument(skip(db, reason))]
pub async fn reject_admin_request(
    db: &DatabaseConnection,
    request_id: Uuid,
    approver: Uuid,
    reason: Option<&str>,
) -> DbResult<PendingAdminRequest> {
    let txn = db.begin().await?;
    let request = load_request(&txn, request_id).await?;
    let resolved = request.reject(approver, reason, Utc::now())?;
    write_resolution(&txn, &resolved).await?;
    txn.commit().await?;
    info!(request = %request_id, "admin request rejected");
    Ok(resolved)
}

pub async fn list_admins(db: &DatabaseConnection) -> DbResult<Vec<admin_accounts::Model>> {
    Ok(admin_accounts::Entity::find()
        .order_by_asc(admin_accounts::Column::Email)
        .all(db)
        .await?)
}

/// Toggle an admin. Takes effect on the next snapshot load.
#[instrument(skip(db))]
pub async fn set_admin_active(
    db: &DatabaseConnection,
    admin_id: Uuid,
    active: bool,
) -> DbResult<admin_accounts::Model> {
    let txn = db.begin().await?;
    let model = admin_accounts::Entity::find_by_id(admin_id)
        .one(&txn)
        .await?
        .ok_or(DbError::NotFound)?;
    if !active && model.is_active && model.account_type == AccountType::SuperAdmin.as_str() {
        ensure_other_super_admin(&txn, admin_id).await?;
    }
    let mut record: admin_accounts::ActiveModel = model.into();
    record.is_active = Set(active);
    record.updated_at = Set(Utc::now().fixed_offset());
    let updated = record.update(&txn).await?;
    txn.commit().await?;
    info!(admin = %admin_id, active, "admin activation changed");
    Ok(updated)
}

/// Current access of an admin, for callers that gate on who they are
/// changing.
pub async fn find_admin<C: ConnectionTrait>(db: &C, admin_id: Uuid) -> DbResult<AdminActor> {
    let model = admin_accounts::Entity::find_by_id(admin_id)
        .one(db)
        .await?
        .ok_or(DbError::NotFound)?;
    admin_actor_from_model(&model)
}

/// Replace an admin's tier, projects and grant. Same rules as approval.
#[instrument(skip(db, terms))]
pub async fn update_admin_access(
    db: &DatabaseConnection,
    admin_id: Uuid,
    terms: AccessTerms,
) -> DbResult<AdminActor> {
    let access = terms.into_access()?;
    let txn = db.begin().await?;
    let model = admin_accounts::Entity::find_by_id(admin_id)
        .one(&txn)
        .await?
        .ok_or(DbError::NotFound)?;
    ensure_projects_exist(&txn, &access).await?;
    if model.is_active
        && model.account_type == AccountType::SuperAdmin.as_str()
        && !matches!(access, AdminAccess::SuperAdmin)
    {
        ensure_other_super_admin(&txn, admin_id).await?;
    }
    let (account_type, assigned_projects, permissions) = encode_access(&access);
    let mut record: admin_accounts::ActiveModel = model.into();
    record.account_type = Set(account_type);
    record.assigned_projects = Set(assigned_projects);
    record.permissions = Set(permissions);
    record.updated_at = Set(Utc::now().fixed_offset());
    let updated = record.update(&txn).await?;
    txn.commit().await?;
    info!(admin = %admin_id, account_type = %access.account_type(), "admin access updated");
    admin_actor_from_model(&updated)
}

/// Create a super admin without a request. Used to seed the first approver of
/// an empty console.
#[instrument(skip(db, profile))]
pub async fn bootstrap_super_admin(
    db: &DatabaseConnection,
    admin_id: Uuid,
    profile: AdminProfile,
) -> DbResult<AdminActor> {
    let profile = normalize_profile(profile)?;
    let txn = db.begin().await?;
    if admin_accounts::Entity::find_by_id(admin_id)
        .one(&txn)
        .await?
        .is_some()
        || guards::Entity::find_by_id(admin_id).one(&txn).await?.is_some()
    {
        return Err(DbError::Conflict("identity already has console access".into()));
    }
    ensure_email_free(&txn, &profile.email).await?;
    let admin = AdminActor {
        id: admin_id,
        access: AdminAccess::SuperAdmin,
        is_active: true,
    };
    let (account_type, assigned_projects, permissions) = encode_access(&admin.access);
    let now = Utc::now().fixed_offset();
    admin_accounts::ActiveModel {
        id: Set(admin.id),
        email: Set(profile.email),
        display_name: Set(profile.display_name),
        phone: Set(profile.phone),
        account_type: Set(account_type),
        assigned_projects: Set(assigned_projects),
        permissions: Set(permissions),
        is_active: Set(true),
        approved_by: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;
    info!(admin = %admin_id, "super admin bootstrapped");
    Ok(admin)
}
