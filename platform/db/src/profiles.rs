use std::collections::HashSet;

use entity::{admin_accounts, guards};
use platform_authz::{
    AccountType, Actor, AdminAccess, AdminActor, GuardActor, ProjectId, RawGrant, parse_grant,
};
use sea_orm::{ConnectionTrait, EntityTrait};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{DbError, DbResult};

/// Load the actor snapshot for an authenticated identity.
///
/// Admin records win over guard records. A record that cannot be parsed is
/// treated like a missing one: the caller gets `None` and every check fails.
#[instrument(skip(db))]
pub async fn load_actor<C: ConnectionTrait>(db: &C, identity: Uuid) -> DbResult<Option<Actor>> {
    if let Some(model) = admin_accounts::Entity::find_by_id(identity).one(db).await? {
        return match admin_actor_from_model(&model) {
            Ok(admin) => Ok(Some(Actor::Admin(admin))),
            Err(err) => {
                warn!(%identity, error = %err, "ignoring malformed admin record");
                Ok(None)
            }
        };
    }
    if let Some(model) = guards::Entity::find_by_id(identity).one(db).await? {
        return match guard_actor_from_model(&model) {
            Ok(guard) => Ok(Some(Actor::Guard(guard))),
            Err(err) => {
                warn!(%identity, error = %err, "ignoring malformed guard record");
                Ok(None)
            }
        };
    }
    Ok(None)
}

pub fn admin_actor_from_model(model: &admin_accounts::Model) -> DbResult<AdminActor> {
    let corrupt = |reason: String| DbError::Corrupt {
        id: model.id,
        reason,
    };
    let account_type = model
        .account_type
        .parse::<AccountType>()
        .map_err(|err| corrupt(err.to_string()))?;
    let access = match account_type {
        AccountType::SuperAdmin => AdminAccess::SuperAdmin,
        AccountType::FullAccess => AdminAccess::FullAccess {
            assigned_projects: decode_projects(&model.assigned_projects).map_err(corrupt)?,
        },
        AccountType::Custom => {
            let raw: RawGrant = serde_json::from_value(model.permissions.clone())
                .map_err(|err| corrupt(err.to_string()))?;
            AdminAccess::Custom {
                assigned_projects: decode_projects(&model.assigned_projects).map_err(corrupt)?,
                permissions: parse_grant(&raw).map_err(|err| corrupt(err.to_string()))?,
            }
        }
    };
    Ok(AdminActor {
        id: model.id,
        access,
        is_active: model.is_active,
    })
}

fn guard_actor_from_model(model: &guards::Model) -> DbResult<GuardActor> {
    let project_id = ProjectId::parse(&model.project_id).map_err(|err| DbError::Corrupt {
        id: model.id,
        reason: err.to_string(),
    })?;
    Ok(GuardActor {
        id: model.id,
        project_id,
        is_active: true,
    })
}

fn decode_projects(value: &serde_json::Value) -> Result<HashSet<ProjectId>, String> {
    let ids: Vec<String> = serde_json::from_value(value.clone()).map_err(|err| err.to_string())?;
    ids.iter()
        .map(|id| ProjectId::parse(id).map_err(|err| err.to_string()))
        .collect()
}

/// Stored form of an access tier: account type, sorted project list, grant.
pub(crate) fn encode_access(
    access: &AdminAccess,
) -> (String, serde_json::Value, serde_json::Value) {
    let mut projects = access
        .assigned_projects()
        .map(|set| set.iter().map(|p| p.as_str().to_string()).collect::<Vec<_>>())
        .unwrap_or_default();
    projects.sort();
    let permissions = match access {
        AdminAccess::Custom { permissions, .. } => platform_authz::to_raw_grant(permissions),
        _ => RawGrant::new(),
    };
    (
        access.account_type().as_str().to_string(),
        serde_json::json!(projects),
        serde_json::json!(permissions),
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use platform_authz::{Action, EntityKey, has_permission};
    use sea_orm::{ActiveModelTrait, Set};
    use serde_json::json;

    use super::*;
    use crate::testing::memory_pool;

    async fn insert_admin(
        db: &crate::DbPool,
        account_type: &str,
        projects: serde_json::Value,
        permissions: serde_json::Value,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now().fixed_offset();
        admin_accounts::ActiveModel {
            id: Set(id),
            email: Set(format!("{id}@example.com")),
            display_name: Set("Admin".into()),
            phone: Set(None),
            account_type: Set(account_type.into()),
            assigned_projects: Set(projects),
            permissions: Set(permissions),
            is_active: Set(true),
            approved_by: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn unknown_identity_has_no_actor() {
        let db = memory_pool().await;
        assert_eq!(load_actor(&db, Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn custom_admin_round_trips_through_storage() {
        let db = memory_pool().await;
        let id = insert_admin(&db, "custom", json!(["A"]), json!({"news": ["read"]})).await;
        let actor = load_actor(&db, id).await.unwrap().expect("actor");
        assert!(has_permission(Some(&actor), EntityKey::News, Action::Read));
        assert!(!has_permission(Some(&actor), EntityKey::Units, Action::Read));
    }

    #[tokio::test]
    async fn malformed_records_resolve_to_no_actor() {
        let db = memory_pool().await;
        let bad_tier = insert_admin(&db, "owner", json!([]), json!({})).await;
        let bad_grant =
            insert_admin(&db, "custom", json!(["A"]), json!({"bogus_entity": ["read"]})).await;
        let bad_project = insert_admin(&db, "full_access", json!([""]), json!({})).await;
        for id in [bad_tier, bad_grant, bad_project] {
            assert_eq!(load_actor(&db, id).await.unwrap(), None);
        }
    }

    #[test]
    fn super_admin_is_stored_with_empty_scope() {
        let (tier, projects, permissions) = encode_access(&AdminAccess::SuperAdmin);
        assert_eq!(tier, "super_admin");
        assert_eq!(projects, json!([]));
        assert_eq!(permissions, json!({}));
    }
}
