use chrono::Utc;
use entity::{admin_accounts, admin_requests, guards, projects};
use platform_authz::ProjectId;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{DbError, DbResult};

/// A guard account to create. `id` is the identity issued for the guard by
/// the identity provider.
#[derive(Clone, Debug)]
pub struct NewGuard {
    pub id: Uuid,
    pub project_id: ProjectId,
    pub display_name: String,
}

#[instrument(skip(db, guard), fields(guard = %guard.id, project = %guard.project_id))]
pub async fn create_guard<C: ConnectionTrait>(
    db: &C,
    guard: NewGuard,
    created_by: Uuid,
) -> DbResult<guards::Model> {
    let display_name = guard.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(DbError::InvalidInput("guard name must not be empty".into()));
    }
    if projects::Entity::find_by_id(guard.project_id.as_str().to_string())
        .one(db)
        .await?
        .is_none()
    {
        return Err(DbError::NotFound);
    }
    if guards::Entity::find_by_id(guard.id).one(db).await?.is_some()
        || admin_accounts::Entity::find_by_id(guard.id)
            .one(db)
            .await?
            .is_some()
    {
        return Err(DbError::Conflict("identity already has console access".into()));
    }
    let pending = admin_requests::Entity::find()
        .filter(admin_requests::Column::ApplicantId.eq(guard.id))
        .filter(admin_requests::Column::Status.eq(admin_requests::Status::Pending))
        .one(db)
        .await?;
    if pending.is_some() {
        return Err(DbError::Conflict("identity has a pending admin request".into()));
    }
    let model = guards::ActiveModel {
        id: Set(guard.id),
        project_id: Set(guard.project_id.as_str().to_string()),
        display_name: Set(display_name),
        created_by: Set(created_by),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(db)
    .await?;
    info!("guard created");
    Ok(model)
}

pub async fn find_guard<C: ConnectionTrait>(db: &C, id: Uuid) -> DbResult<Option<guards::Model>> {
    Ok(guards::Entity::find_by_id(id).one(db).await?)
}

/// Remove a guard entirely; its identity resolves to no actor afterwards.
#[instrument(skip(db))]
pub async fn delete_guard<C: ConnectionTrait>(db: &C, id: Uuid) -> DbResult<()> {
    let result = guards::Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(DbError::NotFound);
    }
    info!(guard = %id, "guard deleted");
    Ok(())
}

pub async fn list_guards<C: ConnectionTrait>(
    db: &C,
    project: &ProjectId,
) -> DbResult<Vec<guards::Model>> {
    Ok(guards::Entity::find()
        .filter(guards::Column::ProjectId.eq(project.as_str()))
        .order_by_asc(guards::Column::DisplayName)
        .all(db)
        .await?)
}
