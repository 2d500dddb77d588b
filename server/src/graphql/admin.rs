use std::collections::HashSet;

use async_graphql::{Context, ErrorExtensions, InputObject, Object, Result, SimpleObject};
use chrono::{DateTime, Utc};
use entity::admin_accounts;
use platform_api::{ApiError, ApiResultExt};
use platform_authz::{
    AccessTerms, Action, Actor, AdminAccess, AdminActor, AdminProfile, EntityKey, ParseError,
    PendingAdminRequest, ProjectId, RawGrant, authorize_delegation,
};
use platform_db::{
    DbError, admin_actor_from_model, approve_admin_request, find_admin, list_admin_requests,
    list_admins, reject_admin_request, set_admin_active, submit_admin_request,
    update_admin_access,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::graphql::{
    AccountType, PermissionEntry, RequestStatus, authenticated, permission_entries, pool, require,
};

#[derive(Clone, Debug, SimpleObject)]
pub struct AdminRequestNode {
    pub id: Uuid,
    pub applicant_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl From<PendingAdminRequest> for AdminRequestNode {
    fn from(value: PendingAdminRequest) -> Self {
        Self {
            id: value.id,
            applicant_id: value.applicant_id,
            email: value.profile.email,
            display_name: value.profile.display_name,
            phone: value.profile.phone,
            status: value.status.into(),
            requested_at: value.requested_at,
            resolved_by: value.resolved_by,
            resolved_at: value.resolved_at,
            rejection_reason: value.rejection_reason,
        }
    }
}

/// Access tier of an admin. `permissions` is the custom grant and stays empty
/// for the fixed tiers.
#[derive(Clone, Debug, SimpleObject)]
pub struct AccessNode {
    pub id: Uuid,
    pub account_type: AccountType,
    pub assigned_projects: Vec<String>,
    pub permissions: Vec<PermissionEntry>,
    pub is_active: bool,
}

impl From<&AdminActor> for AccessNode {
    fn from(admin: &AdminActor) -> Self {
        let mut assigned_projects = admin
            .access
            .assigned_projects()
            .map(|projects| projects.iter().map(ToString::to_string).collect::<Vec<_>>())
            .unwrap_or_default();
        assigned_projects.sort();
        let permissions = match &admin.access {
            AdminAccess::Custom { permissions, .. } => permission_entries(permissions),
            _ => Vec::new(),
        };
        Self {
            id: admin.id,
            account_type: admin.access.account_type().into(),
            assigned_projects,
            permissions,
            is_active: admin.is_active,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AdminNode {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub access: AccessNode,
}

impl AdminNode {
    fn from_model(model: admin_accounts::Model) -> Result<Self, DbError> {
        let admin = admin_actor_from_model(&model)?;
        Ok(Self {
            id: model.id,
            email: model.email,
            display_name: model.display_name,
            phone: model.phone,
            approved_by: model.approved_by,
            created_at: model.created_at.with_timezone(&Utc),
            access: AccessNode::from(&admin),
        })
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct AdminRequestInput {
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct PermissionInput {
    pub entity: String,
    pub actions: Vec<String>,
}

/// Tier, projects and grant an approver assigns. Literals are checked
/// server side so unknown ones come back as `INVALID_INPUT`.
#[derive(Clone, Debug, InputObject)]
pub struct AccessInput {
    pub account_type: Option<AccountType>,
    #[graphql(default)]
    pub assigned_projects: Vec<String>,
    #[graphql(default)]
    pub permissions: Vec<PermissionInput>,
}

impl AccessInput {
    fn into_terms(self) -> Result<AccessTerms, ParseError> {
        let assigned_projects = self
            .assigned_projects
            .iter()
            .map(|id| ProjectId::parse(id))
            .collect::<Result<HashSet<_>, _>>()?;
        let mut permissions = RawGrant::new();
        for entry in self.permissions {
            permissions
                .entry(entry.entity)
                .or_default()
                .extend(entry.actions);
        }
        Ok(AccessTerms {
            account_type: self.account_type.map(Into::into),
            assigned_projects,
            permissions,
        })
    }
}

fn is_super_admin(actor: &Actor) -> bool {
    matches!(
        actor,
        Actor::Admin(AdminActor {
            access: AdminAccess::SuperAdmin,
            ..
        })
    )
}

/// Admins never change their own activation or tier.
fn other_admin(caller: &Actor, target: Uuid) -> Result<()> {
    if caller.id() == target {
        return Err(ApiError::Forbidden("admins cannot change their own account".into()).extend());
    }
    Ok(())
}

#[derive(Default)]
pub struct AdminQuery;

#[Object]
impl AdminQuery {
    /// Self-registrations, oldest first.
    #[instrument(name = "graphql.admin_requests", skip_all)]
    async fn admin_requests(
        &self,
        ctx: &Context<'_>,
        status: Option<RequestStatus>,
    ) -> Result<Vec<AdminRequestNode>> {
        require(ctx, EntityKey::AdminAccounts, Action::Read, None)?;
        let requests = list_admin_requests(pool(ctx)?, status.map(Into::into))
            .await
            .api()?;
        Ok(requests.into_iter().map(Into::into).collect())
    }

    #[instrument(name = "graphql.admins", skip_all)]
    async fn admins(&self, ctx: &Context<'_>) -> Result<Vec<AdminNode>> {
        require(ctx, EntityKey::AdminAccounts, Action::Read, None)?;
        let models = list_admins(pool(ctx)?).await.api()?;
        Ok(models
            .into_iter()
            .filter_map(|model| {
                let id = model.id;
                AdminNode::from_model(model)
                    .inspect_err(|err| warn!(admin = %id, error = %err, "skipping admin"))
                    .ok()
            })
            .collect())
    }
}

#[derive(Default)]
pub struct AdminMutation;

#[Object]
impl AdminMutation {
    /// Register the calling identity as an admin applicant.
    #[instrument(name = "graphql.submit_admin_request", skip_all)]
    async fn submit_admin_request(
        &self,
        ctx: &Context<'_>,
        input: AdminRequestInput,
    ) -> Result<AdminRequestNode> {
        let requester = authenticated(ctx)?;
        let Some(identity) = requester.identity else {
            return Err(ApiError::Unauthenticated.extend());
        };
        if requester.actor.is_some() {
            return Err(ApiError::Conflict("identity already has console access".into()).extend());
        }
        let profile = AdminProfile {
            email: input.email,
            display_name: input.display_name,
            phone: input.phone,
        };
        let request = submit_admin_request(pool(ctx)?, identity, profile)
            .await
            .api()?;
        Ok(request.into())
    }

    #[instrument(name = "graphql.approve_admin_request", skip_all, fields(request = %id))]
    async fn approve_admin_request(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: AccessInput,
    ) -> Result<AccessNode> {
        let approver = require(ctx, EntityKey::AdminAccounts, Action::Create, None)?;
        let terms = input.into_terms().api()?;
        let access = terms.clone().into_access().api()?;
        authorize_delegation(Some(approver), &access).api()?;
        let admin = approve_admin_request(pool(ctx)?, id, approver.id(), terms)
            .await
            .api()?;
        Ok(AccessNode::from(&admin))
    }

    #[instrument(name = "graphql.reject_admin_request", skip_all, fields(request = %id))]
    async fn reject_admin_request(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<AdminRequestNode> {
        let approver = require(ctx, EntityKey::AdminAccounts, Action::Create, None)?.id();
        let request = reject_admin_request(pool(ctx)?, id, approver, reason.as_deref())
            .await
            .api()?;
        Ok(request.into())
    }

    #[instrument(name = "graphql.set_admin_active", skip_all, fields(admin = %id))]
    async fn set_admin_active(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        active: bool,
    ) -> Result<AdminNode> {
        let caller = require(ctx, EntityKey::AdminAccounts, Action::Write, None)?;
        if !is_super_admin(caller) {
            return Err(ApiError::Forbidden("only super admins toggle admins".into()).extend());
        }
        other_admin(caller, id)?;
        let model = set_admin_active(pool(ctx)?, id, active).await.api()?;
        AdminNode::from_model(model).api()
    }

    #[instrument(name = "graphql.update_admin_access", skip_all, fields(admin = %id))]
    async fn update_admin_access(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: AccessInput,
    ) -> Result<AccessNode> {
        let caller = require(ctx, EntityKey::AdminAccounts, Action::Write, None)?;
        other_admin(caller, id)?;
        let terms = input.into_terms().api()?;
        let access = terms.clone().into_access().api()?;
        let db = pool(ctx)?;
        if !is_super_admin(caller) {
            let current = find_admin(db, id).await.api()?;
            authorize_delegation(Some(caller), &current.access).api()?;
        }
        authorize_delegation(Some(caller), &access).api()?;
        let admin = update_admin_access(db, id, terms).await.api()?;
        Ok(AccessNode::from(&admin))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use platform_authz::{AccessTerms, AccountType, ProjectId, RawGrant};
    use serde_json::json;
    use uuid::Uuid;

    use crate::graphql::testing::{Harness, error_code};

    const SUBMIT: &str = r#"mutation {
        submitAdminRequest(input: { email: "Ops@Example.com", displayName: "Ops" }) { id status email }
    }"#;

    async fn submit(harness: &Harness, applicant: Uuid) -> String {
        let response = harness.exec(Some(applicant), SUBMIT).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let body = response.data.into_json().unwrap();
        assert_eq!(body["submitAdminRequest"]["status"], json!("PENDING"));
        assert_eq!(body["submitAdminRequest"]["email"], json!("ops@example.com"));
        body["submitAdminRequest"]["id"].as_str().unwrap().to_string()
    }

    fn approve(id: &str, access: &str) -> String {
        format!(
            "mutation {{ approveAdminRequest(id: \"{id}\", input: {access}) {{ accountType assignedProjects permissions {{ entity actions }} }} }}"
        )
    }

    #[tokio::test]
    async fn approval_spawns_the_admin_once() {
        let harness = Harness::new().await;
        let applicant = Uuid::new_v4();
        let request = submit(&harness, applicant).await;

        let pending = harness
            .exec(
                Some(harness.root),
                "{ adminRequests(status: PENDING) { applicantId } }",
            )
            .await;
        assert_eq!(
            pending.data.into_json().unwrap(),
            json!({"adminRequests": [{"applicantId": applicant.to_string()}]})
        );

        let access = r#"{ accountType: CUSTOM, assignedProjects: ["P1"], permissions: [{ entity: "news", actions: ["read", "write"] }] }"#;
        let response = harness.exec(Some(harness.root), &approve(&request, access)).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({"approveAdminRequest": {
                "accountType": "CUSTOM",
                "assignedProjects": ["P1"],
                "permissions": [{"entity": "news", "actions": ["read", "write"]}],
            }})
        );

        let again = harness
            .exec(
                Some(harness.root),
                &approve(&request, "{ accountType: SUPER_ADMIN }"),
            )
            .await;
        assert_eq!(error_code(&again).as_deref(), Some("CONFLICT"));

        let me = harness.exec(Some(applicant), "{ me { accountType } }").await;
        assert_eq!(
            me.data.into_json().unwrap(),
            json!({"me": {"accountType": "CUSTOM"}})
        );
    }

    #[tokio::test]
    async fn invalid_grants_are_reported_and_leave_the_request_pending() {
        let harness = Harness::new().await;
        let request = submit(&harness, Uuid::new_v4()).await;

        let access = r#"{ accountType: CUSTOM, permissions: [{ entity: "wallets", actions: ["read"] }, { entity: "rockets", actions: ["read"] }] }"#;
        let response = harness.exec(Some(harness.root), &approve(&request, access)).await;
        assert_eq!(error_code(&response).as_deref(), Some("INVALID_INPUT"));
        assert_eq!(
            response.errors[0].message,
            "bad request: unknown entities in grant: rockets, wallets"
        );

        let response = harness
            .exec(Some(harness.root), &approve(&request, "{ assignedProjects: [\"P1\"] }"))
            .await;
        assert_eq!(error_code(&response).as_deref(), Some("INVALID_INPUT"));

        let pending = harness
            .exec(Some(harness.root), "{ adminRequests(status: PENDING) { id } }")
            .await;
        assert_eq!(
            pending.data.into_json().unwrap(),
            json!({"adminRequests": [{"id": request}]})
        );
    }

    #[tokio::test]
    async fn full_access_admins_can_read_but_not_approve() {
        let harness = Harness::new().await;
        let manager = harness
            .admin(
                "manager@example.com",
                AccessTerms {
                    account_type: Some(AccountType::FullAccess),
                    assigned_projects: HashSet::from([ProjectId::parse("P1").unwrap()]),
                    ..AccessTerms::default()
                },
            )
            .await;
        let request = submit(&harness, Uuid::new_v4()).await;

        let listed = harness.exec(Some(manager), "{ admins { email } }").await;
        assert!(listed.errors.is_empty(), "{:?}", listed.errors);
        assert_eq!(
            listed.data.into_json().unwrap(),
            json!({"admins": [{"email": "manager@example.com"}, {"email": "root@example.com"}]})
        );

        let response = harness
            .exec(Some(manager), &approve(&request, "{ accountType: SUPER_ADMIN }"))
            .await;
        assert_eq!(error_code(&response).as_deref(), Some("FORBIDDEN"));

        let reject = format!("mutation {{ rejectAdminRequest(id: \"{request}\") {{ status }} }}");
        let response = harness.exec(Some(manager), &reject).await;
        assert_eq!(error_code(&response).as_deref(), Some("FORBIDDEN"));
    }

    #[tokio::test]
    async fn rejection_records_the_reason() {
        let harness = Harness::new().await;
        let request = submit(&harness, Uuid::new_v4()).await;
        let reject = format!(
            "mutation {{ rejectAdminRequest(id: \"{request}\", reason: \"  not staff \") {{ status rejectionReason }} }}"
        );
        let response = harness.exec(Some(harness.root), &reject).await;
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({"rejectAdminRequest": {"status": "REJECTED", "rejectionReason": "not staff"}})
        );
        let again = harness.exec(Some(harness.root), &reject).await;
        assert_eq!(error_code(&again).as_deref(), Some("CONFLICT"));
    }

    #[tokio::test]
    async fn only_identities_without_access_may_register() {
        let harness = Harness::new().await;
        let response = harness.exec(None, SUBMIT).await;
        assert_eq!(error_code(&response).as_deref(), Some("UNAUTHENTICATED"));

        let response = harness.exec(Some(harness.root), SUBMIT).await;
        assert_eq!(error_code(&response).as_deref(), Some("CONFLICT"));
    }

    #[tokio::test]
    async fn deactivated_admins_are_denied_on_the_next_request() {
        let harness = Harness::new().await;
        let manager = harness
            .admin(
                "manager@example.com",
                AccessTerms {
                    account_type: Some(AccountType::FullAccess),
                    assigned_projects: HashSet::from([ProjectId::parse("P1").unwrap()]),
                    ..AccessTerms::default()
                },
            )
            .await;
        let deactivate = format!(
            "mutation {{ setAdminActive(id: \"{manager}\", active: false) {{ access {{ isActive }} }} }}"
        );
        let response = harness.exec(Some(harness.root), &deactivate).await;
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({"setAdminActive": {"access": {"isActive": false}}})
        );

        let response = harness.exec(Some(manager), "{ admins { email } }").await;
        assert_eq!(error_code(&response).as_deref(), Some("FORBIDDEN"));
    }

    #[tokio::test]
    async fn access_updates_replace_the_tier() {
        let harness = Harness::new().await;
        let manager = harness
            .admin(
                "manager@example.com",
                AccessTerms {
                    account_type: Some(AccountType::FullAccess),
                    assigned_projects: HashSet::from([ProjectId::parse("P1").unwrap()]),
                    ..AccessTerms::default()
                },
            )
            .await;
        let update = format!(
            r#"mutation {{ updateAdminAccess(id: "{manager}", input: {{ accountType: CUSTOM, assignedProjects: ["P2", "P1"], permissions: [{{ entity: "complaints", actions: ["read"] }}] }}) {{ accountType assignedProjects }} }}"#
        );
        let response = harness.exec(Some(harness.root), &update).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({"updateAdminAccess": {
                "accountType": "CUSTOM",
                "assignedProjects": ["P1", "P2"],
            }})
        );

        let response = harness.exec(Some(manager), "{ admins { email } }").await;
        assert_eq!(error_code(&response).as_deref(), Some("FORBIDDEN"));
    }

    fn set_active(id: Uuid, active: bool) -> String {
        format!("mutation {{ setAdminActive(id: \"{id}\", active: {active}) {{ id }} }}")
    }

    fn update_access(id: Uuid, access: &str) -> String {
        format!(
            "mutation {{ updateAdminAccess(id: \"{id}\", input: {access}) {{ accountType }} }}"
        )
    }

    /// Custom admin holding every `admin_accounts` action plus `news:read`
    /// in `P1`.
    async fn delegate(harness: &Harness) -> Uuid {
        harness
            .admin(
                "delegate@example.com",
                AccessTerms {
                    account_type: Some(AccountType::Custom),
                    assigned_projects: HashSet::from([ProjectId::parse("P1").unwrap()]),
                    permissions: RawGrant::from([
                        (
                            "admin_accounts".to_string(),
                            vec![
                                "create".to_string(),
                                "read".to_string(),
                                "write".to_string(),
                            ],
                        ),
                        ("news".to_string(), vec!["read".to_string()]),
                    ]),
                },
            )
            .await
    }

    #[tokio::test]
    async fn custom_admins_cannot_promote_themselves() {
        let harness = Harness::new().await;
        let delegate = delegate(&harness).await;

        let response = harness
            .exec(
                Some(delegate),
                &update_access(delegate, "{ accountType: SUPER_ADMIN }"),
            )
            .await;
        assert_eq!(error_code(&response).as_deref(), Some("FORBIDDEN"));

        let demote = r#"{ accountType: CUSTOM, permissions: [{ entity: "news", actions: ["read"] }] }"#;
        let response = harness
            .exec(Some(delegate), &update_access(harness.root, demote))
            .await;
        assert_eq!(error_code(&response).as_deref(), Some("FORBIDDEN"));

        let me = harness.exec(Some(delegate), "{ me { accountType } }").await;
        assert_eq!(
            me.data.into_json().unwrap(),
            json!({"me": {"accountType": "CUSTOM"}})
        );
    }

    #[tokio::test]
    async fn custom_admins_only_hand_out_what_they_hold() {
        let harness = Harness::new().await;
        let delegate = delegate(&harness).await;
        let request = submit(&harness, Uuid::new_v4()).await;

        for access in [
            "{ accountType: SUPER_ADMIN }",
            r#"{ accountType: FULL_ACCESS, assignedProjects: ["P1"] }"#,
            r#"{ accountType: CUSTOM, assignedProjects: ["P1"], permissions: [{ entity: "news", actions: ["write"] }] }"#,
            r#"{ accountType: CUSTOM, assignedProjects: ["P2"], permissions: [{ entity: "news", actions: ["read"] }] }"#,
        ] {
            let response = harness.exec(Some(delegate), &approve(&request, access)).await;
            assert_eq!(error_code(&response).as_deref(), Some("FORBIDDEN"), "{access}");
        }

        let access = r#"{ accountType: CUSTOM, assignedProjects: ["P1"], permissions: [{ entity: "news", actions: ["read"] }] }"#;
        let response = harness.exec(Some(delegate), &approve(&request, access)).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let body = response.data.into_json().unwrap();
        assert_eq!(body["approveAdminRequest"]["accountType"], json!("CUSTOM"));

        let manager = harness
            .admin(
                "manager@example.com",
                AccessTerms {
                    account_type: Some(AccountType::FullAccess),
                    assigned_projects: HashSet::from([ProjectId::parse("P1").unwrap()]),
                    ..AccessTerms::default()
                },
            )
            .await;
        let response = harness
            .exec(
                Some(delegate),
                &update_access(manager, "{ accountType: SUPER_ADMIN }"),
            )
            .await;
        assert_eq!(error_code(&response).as_deref(), Some("FORBIDDEN"));
    }

    #[tokio::test]
    async fn only_super_admins_toggle_other_admins() {
        let harness = Harness::new().await;
        let delegate = delegate(&harness).await;

        let response = harness
            .exec(Some(delegate), &set_active(harness.root, false))
            .await;
        assert_eq!(error_code(&response).as_deref(), Some("FORBIDDEN"));

        let response = harness
            .exec(Some(harness.root), &set_active(harness.root, false))
            .await;
        assert_eq!(error_code(&response).as_deref(), Some("FORBIDDEN"));
        let response = harness
            .exec(
                Some(harness.root),
                &update_access(harness.root, "{ accountType: FULL_ACCESS }"),
            )
            .await;
        assert_eq!(error_code(&response).as_deref(), Some("FORBIDDEN"));

        let me = harness
            .exec(Some(harness.root), "{ me { accountType isActive } }")
            .await;
        assert_eq!(
            me.data.into_json().unwrap(),
            json!({"me": {"accountType": "SUPER_ADMIN", "isActive": true}})
        );

        let response = harness
            .exec(Some(harness.root), &set_active(delegate, false))
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
    }

    #[tokio::test]
    async fn unknown_projects_are_rejected_on_approval() {
        let harness = Harness::new().await;
        let request = submit(&harness, Uuid::new_v4()).await;
        let access = r#"{ accountType: FULL_ACCESS, assignedProjects: ["P9"] }"#;
        let response = harness
            .exec(Some(harness.root), &approve(&request, access))
            .await;
        assert_eq!(error_code(&response).as_deref(), Some("INVALID_INPUT"));
        assert_eq!(
            response.errors[0].message,
            "bad request: unknown projects: P9"
        );
    }
}
