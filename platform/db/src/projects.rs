use chrono::Utc;
use entity::projects;
use platform_authz::{ProjectId, ProjectScoped};
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QueryOrder, Set};
use serde::Serialize;
use tracing::{info, warn};

use crate::{DbError, DbResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
}

impl ProjectScoped for Project {
    fn project_id(&self) -> &ProjectId {
        &self.id
    }
}

pub async fn create_project<C: ConnectionTrait>(
    db: &C,
    id: &ProjectId,
    name: &str,
) -> DbResult<Project> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DbError::InvalidInput("project name must not be empty".into()));
    }
    if projects::Entity::find_by_id(id.as_str().to_string())
        .one(db)
        .await?
        .is_some()
    {
        return Err(DbError::Conflict(format!("project {id} already exists")));
    }
    projects::ActiveModel {
        id: Set(id.as_str().to_string()),
        name: Set(name.to_string()),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(db)
    .await?;
    info!(project = %id, "project created");
    Ok(Project {
        id: id.clone(),
        name: name.to_string(),
    })
}

/// All projects ordered by name.
pub async fn list_projects<C: ConnectionTrait>(db: &C) -> DbResult<Vec<Project>> {
    let rows = projects::Entity::find()
        .order_by_asc(projects::Column::Name)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| match ProjectId::parse(&row.id) {
            Ok(id) => Some(Project { id, name: row.name }),
            Err(_) => {
                warn!(project = %row.id, "skipping project with blank id");
                None
            }
        })
        .collect())
}
