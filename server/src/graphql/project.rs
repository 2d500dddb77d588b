use async_graphql::{Context, Object, Result, SimpleObject};
use platform_api::ApiResultExt;
use platform_authz::filter_projects_for_actor;
use platform_db::{Project, list_projects};
use tracing::instrument;

use crate::graphql::{authenticated, pool};

#[derive(Clone, Debug, SimpleObject)]
pub struct ProjectNode {
    pub id: String,
    pub name: String,
}

impl From<Project> for ProjectNode {
    fn from(value: Project) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
        }
    }
}

#[derive(Default)]
pub struct ProjectQuery;

#[Object]
impl ProjectQuery {
    /// Projects visible to the caller, by name.
    #[instrument(name = "graphql.projects", skip_all)]
    async fn projects(&self, ctx: &Context<'_>) -> Result<Vec<ProjectNode>> {
        let requester = authenticated(ctx)?;
        let all = list_projects(pool(ctx)?).await.api()?;
        Ok(filter_projects_for_actor(requester.actor.as_ref(), all)
            .into_iter()
            .map(Into::into)
            .collect())
    }
}
