use async_graphql::{Context, Enum, Object, Result, SimpleObject};
use platform_api::ApiResultExt;
use platform_authz::{Actor, effective_permissions, filter_projects_for_actor};
use platform_db::list_projects;
use tracing::instrument;
use uuid::Uuid;

use crate::graphql::{
    AccountType, PermissionEntry, authenticated, permission_entries, pool, project::ProjectNode,
};

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum ActorKind {
    Admin,
    Guard,
}

/// What the console needs to render for the signed-in actor.
#[derive(Clone, Debug, SimpleObject)]
pub struct MePayload {
    pub id: Uuid,
    pub kind: ActorKind,
    /// Set for admins only.
    pub account_type: Option<AccountType>,
    pub is_active: bool,
    pub projects: Vec<ProjectNode>,
    pub permissions: Vec<PermissionEntry>,
}

impl MePayload {
    fn from_actor(actor: &Actor, projects: Vec<ProjectNode>) -> Self {
        let (kind, account_type): (ActorKind, Option<AccountType>) = match actor {
            Actor::Admin(admin) => (ActorKind::Admin, Some(admin.access.account_type().into())),
            Actor::Guard(_) => (ActorKind::Guard, None),
        };
        Self {
            id: actor.id(),
            kind,
            account_type,
            is_active: actor.is_active(),
            projects,
            permissions: permission_entries(&effective_permissions(Some(actor))),
        }
    }
}

#[derive(Default)]
pub struct MeQuery;

#[Object]
impl MeQuery {
    /// Null when the identity has no console access yet.
    #[instrument(name = "graphql.me", skip_all)]
    async fn me(&self, ctx: &Context<'_>) -> Result<Option<MePayload>> {
        let requester = authenticated(ctx)?;
        let Some(actor) = requester.actor.as_ref() else {
            return Ok(None);
        };
        let all = list_projects(pool(ctx)?).await.api()?;
        let projects = filter_projects_for_actor(Some(actor), all)
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(Some(MePayload::from_actor(actor, projects)))
    }

    #[instrument(name = "graphql.version", skip_all)]
    async fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }
}
