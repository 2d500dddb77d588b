use async_graphql::{Context, ErrorExtensions, Object, Result, SimpleObject};
use chrono::{DateTime, Utc};
use entity::guards;
use platform_api::{ApiError, ApiResultExt};
use platform_authz::{Action, EntityKey, ProjectId};
use platform_db::{NewGuard, create_guard, delete_guard, find_guard, list_guards};
use tracing::instrument;
use uuid::Uuid;

use crate::graphql::{authenticated, pool, require};

#[derive(Clone, Debug, SimpleObject)]
pub struct GuardNode {
    pub id: Uuid,
    pub project_id: String,
    pub display_name: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<guards::Model> for GuardNode {
    fn from(value: guards::Model) -> Self {
        Self {
            id: value.id,
            project_id: value.project_id,
            display_name: value.display_name,
            created_by: value.created_by,
            created_at: value.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Default)]
pub struct GuardQuery;

#[Object]
impl GuardQuery {
    #[instrument(name = "graphql.guards", skip_all, fields(project = %project_id))]
    async fn guards(&self, ctx: &Context<'_>, project_id: String) -> Result<Vec<GuardNode>> {
        authenticated(ctx)?;
        let project = ProjectId::parse(&project_id).api()?;
        require(ctx, EntityKey::Guards, Action::Read, Some(&project))?;
        let guards = list_guards(pool(ctx)?, &project).await.api()?;
        Ok(guards.into_iter().map(Into::into).collect())
    }
}

#[derive(Default)]
pub struct GuardMutation;

#[Object]
impl GuardMutation {
    /// Give an identity guard access to one project.
    #[instrument(name = "graphql.create_guard", skip_all, fields(project = %project_id))]
    async fn create_guard(
        &self,
        ctx: &Context<'_>,
        project_id: String,
        identity: Uuid,
        display_name: String,
    ) -> Result<GuardNode> {
        authenticated(ctx)?;
        let project = ProjectId::parse(&project_id).api()?;
        let creator = require(ctx, EntityKey::Guards, Action::Write, Some(&project))?.id();
        let guard = NewGuard {
            id: identity,
            project_id: project,
            display_name,
        };
        let model = create_guard(pool(ctx)?, guard, creator).await.api()?;
        Ok(model.into())
    }

    #[instrument(name = "graphql.delete_guard", skip_all, fields(guard = %id))]
    async fn delete_guard(&self, ctx: &Context<'_>, id: Uuid) -> Result<bool> {
        require(ctx, EntityKey::Guards, Action::Delete, None)?;
        let db = pool(ctx)?;
        let guard = find_guard(db, id)
            .await
            .api()?
            .ok_or_else(|| ApiError::NotFound.extend())?;
        let project = ProjectId::parse(&guard.project_id).api()?;
        require(ctx, EntityKey::Guards, Action::Delete, Some(&project))?;
        delete_guard(db, id).await.api()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use platform_authz::{AccessTerms, AccountType, ProjectId, RawGrant};
    use serde_json::json;
    use uuid::Uuid;

    use crate::graphql::testing::{Harness, error_code};

    fn create(project: &str, identity: Uuid) -> String {
        format!(
            "mutation {{ createGuard(projectId: \"{project}\", identity: \"{identity}\", \
             displayName: \"Gate B\") {{ projectId displayName }} }}"
        )
    }

    async fn custom_guard_admin(harness: &Harness) -> Uuid {
        harness
            .admin(
                "gates@example.com",
                AccessTerms {
                    account_type: Some(AccountType::Custom),
                    assigned_projects: HashSet::from([ProjectId::parse("P1").unwrap()]),
                    permissions: RawGrant::from([(
                        "guards".to_string(),
                        vec!["read".to_string(), "write".to_string()],
                    )]),
                },
            )
            .await
    }

    #[tokio::test]
    async fn custom_admin_manages_guards_in_assigned_projects_only() {
        let harness = Harness::new().await;
        let admin = custom_guard_admin(&harness).await;

        let response = harness.exec(Some(admin), &create("P1", Uuid::new_v4())).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({"createGuard": {"projectId": "P1", "displayName": "Gate B"}})
        );

        let response = harness.exec(Some(admin), &create("P2", Uuid::new_v4())).await;
        assert_eq!(error_code(&response).as_deref(), Some("FORBIDDEN"));

        let response = harness
            .exec(Some(admin), "{ guards(projectId: \"P1\") { displayName } }")
            .await;
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({"guards": [{"displayName": "Gate B"}]})
        );
    }

    #[tokio::test]
    async fn delete_needs_the_delete_action_in_the_guards_project() {
        let harness = Harness::new().await;
        let admin = custom_guard_admin(&harness).await;
        let guard = harness.guard("P1").await;
        let delete = format!("mutation {{ deleteGuard(id: \"{guard}\") }}");

        let response = harness.exec(Some(admin), &delete).await;
        assert_eq!(error_code(&response).as_deref(), Some("FORBIDDEN"));

        let response = harness.exec(Some(harness.root), &delete).await;
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({"deleteGuard": true})
        );
        let response = harness.exec(Some(harness.root), &delete).await;
        assert_eq!(error_code(&response).as_deref(), Some("NOT_FOUND"));

        let me = harness.exec(Some(guard), "{ me { kind } }").await;
        assert_eq!(me.data.into_json().unwrap(), json!({"me": null}));
    }

    #[tokio::test]
    async fn guards_cannot_manage_guards() {
        let harness = Harness::new().await;
        let guard = harness.guard("P1").await;
        let response = harness
            .exec(Some(guard), "{ guards(projectId: \"P1\") { id } }")
            .await;
        assert_eq!(error_code(&response).as_deref(), Some("FORBIDDEN"));

        let response = harness.exec(Some(harness.root), &create("P1", guard)).await;
        assert_eq!(error_code(&response).as_deref(), Some("CONFLICT"));
    }

    #[tokio::test]
    async fn anonymous_callers_are_unauthenticated_before_input_checks() {
        let harness = Harness::new().await;
        let response = harness.exec(None, "{ guards(projectId: \"  \") { id } }").await;
        assert_eq!(error_code(&response).as_deref(), Some("UNAUTHENTICATED"));

        let response = harness.exec(None, &create(" ", Uuid::new_v4())).await;
        assert_eq!(error_code(&response).as_deref(), Some("UNAUTHENTICATED"));

        let response = harness
            .exec(Some(harness.root), "{ guards(projectId: \"  \") { id } }")
            .await;
        assert_eq!(error_code(&response).as_deref(), Some("INVALID_INPUT"));
    }
}
