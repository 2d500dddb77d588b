mod admin;
mod guard;
mod me;
mod project;

use anyhow::anyhow;
use async_graphql::{
    Context, EmptySubscription, Enum, ErrorExtensions, MergedObject, Result, Schema, SimpleObject,
};
use platform_api::{ApiError, ApiResultExt};
use platform_authz::{Action, Actor, EntityKey, PermissionGrant, ProjectId, authorize};
use platform_db::DbPool;
use uuid::Uuid;

use self::{
    admin::{AdminMutation, AdminQuery},
    guard::{GuardMutation, GuardQuery},
    me::MeQuery,
    project::ProjectQuery,
};

pub type SchemaType = Schema<QueryRoot, MutationRoot, EmptySubscription>;

#[derive(MergedObject, Default)]
pub struct QueryRoot(MeQuery, ProjectQuery, AdminQuery, GuardQuery);

#[derive(MergedObject, Default)]
pub struct MutationRoot(AdminMutation, GuardMutation);

#[derive(Clone)]
pub struct GraphqlData {
    pub pool: DbPool,
}

/// Who is calling: the forwarded identity, and the actor it resolved to.
/// An identity without an actor is a signed-in user with no console access.
#[derive(Clone, Debug, Default)]
pub struct RequestActor {
    pub identity: Option<Uuid>,
    pub actor: Option<Actor>,
}

static ANONYMOUS: RequestActor = RequestActor {
    identity: None,
    actor: None,
};

pub fn build_schema(data: GraphqlData) -> SchemaType {
    Schema::build(QueryRoot::default(), MutationRoot::default(), EmptySubscription)
        .data(data)
        .finish()
}

/// SDL of the schema; no database needed.
pub fn sdl() -> String {
    Schema::build(QueryRoot::default(), MutationRoot::default(), EmptySubscription)
        .finish()
        .sdl()
}

pub(crate) fn pool<'a>(ctx: &Context<'a>) -> Result<&'a DbPool> {
    ctx.data::<GraphqlData>()
        .map(|data| &data.pool)
        .map_err(|_| ApiError::internal(anyhow!("graphql data missing from schema")).extend())
}

pub(crate) fn request_actor<'a>(ctx: &Context<'a>) -> &'a RequestActor {
    ctx.data_opt::<RequestActor>().unwrap_or(&ANONYMOUS)
}

/// The caller must have presented an identity.
pub(crate) fn authenticated<'a>(ctx: &Context<'a>) -> Result<&'a RequestActor> {
    let requester = request_actor(ctx);
    match requester.identity {
        Some(_) => Ok(requester),
        None => Err(ApiError::Unauthenticated.extend()),
    }
}

/// Gate a resolver on `entity:action`, optionally within a project, and hand
/// back the allowed actor.
pub(crate) fn require<'a>(
    ctx: &Context<'a>,
    entity: EntityKey,
    action: Action,
    project: Option<&ProjectId>,
) -> Result<&'a Actor> {
    let requester = authenticated(ctx)?;
    authorize(requester.actor.as_ref(), entity, action, project).api()?;
    requester
        .actor
        .as_ref()
        .ok_or_else(|| ApiError::Forbidden("no console access".into()).extend())
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[graphql(remote = "platform_authz::AccountType")]
pub enum AccountType {
    SuperAdmin,
    FullAccess,
    Custom,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[graphql(remote = "platform_authz::RequestStatus")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// One row of a permission matrix.
#[derive(Clone, Debug, SimpleObject)]
pub struct PermissionEntry {
    pub entity: String,
    pub actions: Vec<String>,
}

pub(crate) fn permission_entries(grant: &PermissionGrant) -> Vec<PermissionEntry> {
    grant
        .iter()
        .map(|(entity, actions)| PermissionEntry {
            entity: entity.to_string(),
            actions: actions.iter().map(ToString::to_string).collect(),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use async_graphql::{Request, Response, Value};
    use migration::{Migrator, MigratorTrait};
    use platform_authz::{AccessTerms, AdminProfile, ProjectId};
    use platform_db::{
        NewGuard, approve_admin_request, bootstrap_super_admin, connect_url, create_guard,
        create_project, load_actor, submit_admin_request,
    };

    use super::*;

    pub struct Harness {
        pub pool: DbPool,
        pub schema: SchemaType,
        pub root: Uuid,
    }

    impl Harness {
        /// Migrated in-memory database with one super admin and projects
        /// `P1` and `P2`.
        pub async fn new() -> Self {
            let pool = connect_url("sqlite::memory:", 1).await.unwrap();
            Migrator::up(&pool, None).await.unwrap();
            let root = Uuid::new_v4();
            bootstrap_super_admin(
                &pool,
                root,
                AdminProfile {
                    email: "root@example.com".into(),
                    display_name: "Root".into(),
                    phone: None,
                },
            )
            .await
            .unwrap();
            for (id, name) in [("P1", "Palm Residences"), ("P2", "Cedar Court")] {
                create_project(&pool, &ProjectId::parse(id).unwrap(), name)
                    .await
                    .unwrap();
            }
            let schema = build_schema(GraphqlData { pool: pool.clone() });
            Self { pool, schema, root }
        }

        /// Register and approve an admin through the store.
        pub async fn admin(&self, email: &str, terms: AccessTerms) -> Uuid {
            let applicant = Uuid::new_v4();
            let request = submit_admin_request(
                &self.pool,
                applicant,
                AdminProfile {
                    email: email.into(),
                    display_name: "Site Manager".into(),
                    phone: None,
                },
            )
            .await
            .unwrap();
            approve_admin_request(&self.pool, request.id, self.root, terms)
                .await
                .unwrap();
            applicant
        }

        pub async fn guard(&self, project: &str) -> Uuid {
            let id = Uuid::new_v4();
            create_guard(
                &self.pool,
                NewGuard {
                    id,
                    project_id: ProjectId::parse(project).unwrap(),
                    display_name: "Gate A".into(),
                },
                self.root,
            )
            .await
            .unwrap();
            id
        }

        pub async fn exec(&self, identity: Option<Uuid>, query: &str) -> Response {
            let actor = match identity {
                Some(id) => load_actor(&self.pool, id).await.unwrap(),
                None => None,
            };
            self.schema
                .execute(Request::new(query).data(RequestActor { identity, actor }))
                .await
        }
    }

    pub fn error_code(response: &Response) -> Option<String> {
        response.errors.first().and_then(|err| {
            err.extensions
                .as_ref()
                .and_then(|ext| ext.get("code"))
                .and_then(|code| match code {
                    Value::String(code) => Some(code.clone()),
                    _ => None,
                })
        })
    }
}
