//! Static grant tables and validation of custom grants.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use thiserror::Error;

use crate::catalog::{Action, EntityKey, ParseError};

/// Validated entity -> actions grant. A missing entity means no actions.
pub type PermissionGrant = BTreeMap<EntityKey, BTreeSet<Action>>;

/// Grant as it arrives from a form or a stored document, before validation.
pub type RawGrant = BTreeMap<String, Vec<String>>;

const READ_WRITE_DELETE: &[Action] = &[Action::Read, Action::Write, Action::Delete];
const NOTIFICATIONS: &[Action] = &[Action::Read, Action::Write, Action::Delete, Action::Send];
const READ_ONLY: &[Action] = &[Action::Read];
const MANAGE_ADMINS: &[Action] = &[Action::Create, Action::Read, Action::Write, Action::Delete];

/// Actions a `full_access` admin holds on `entity`.
pub fn full_access_actions(entity: EntityKey) -> &'static [Action] {
    match entity {
        EntityKey::Notifications => NOTIFICATIONS,
        EntityKey::Logs | EntityKey::AdminAccounts => READ_ONLY,
        _ => READ_WRITE_DELETE,
    }
}

/// The super-admin table. Decisions for super admins never consult it; it is
/// what the console lists as their matrix.
pub fn super_admin_actions(entity: EntityKey) -> &'static [Action] {
    match entity {
        EntityKey::AdminAccounts => MANAGE_ADMINS,
        other => full_access_actions(other),
    }
}

pub(crate) fn table_grant(actions: fn(EntityKey) -> &'static [Action]) -> PermissionGrant {
    EntityKey::ALL
        .into_iter()
        .map(|entity| (entity, actions(entity).iter().copied().collect()))
        .collect()
}

/// An action literal that is not part of the action vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownGrantAction {
    pub entity: String,
    pub action: String,
}

impl fmt::Display for UnknownGrantAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity, self.action)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("a custom admin needs at least one permission")]
    EmptyGrant,
    #[error("unknown entities in grant: {}", .0.join(", "))]
    UnknownEntity(Vec<String>),
    #[error("unknown actions in grant: {}", join_pairs(.0))]
    UnknownAction(Vec<UnknownGrantAction>),
}

fn join_pairs(pairs: &[UnknownGrantAction]) -> String {
    pairs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check a custom grant and return its typed form.
///
/// Rules run in order and the first failing rule is reported: an all-empty
/// grant, then unknown entity keys, then unknown action literals (every
/// offending pair is listed). Entities left with no actions are dropped.
pub fn validate_permission_grant(raw: &RawGrant) -> Result<PermissionGrant, ValidationError> {
    if raw.values().all(Vec::is_empty) {
        return Err(ValidationError::EmptyGrant);
    }

    let unknown_entities = raw
        .keys()
        .filter(|key| key.parse::<EntityKey>().is_err())
        .cloned()
        .collect::<Vec<_>>();
    if !unknown_entities.is_empty() {
        return Err(ValidationError::UnknownEntity(unknown_entities));
    }

    let mut grant = PermissionGrant::new();
    let mut unknown_actions = Vec::new();
    for (key, actions) in raw {
        let entity = key
            .parse::<EntityKey>()
            .map_err(|_| ValidationError::UnknownEntity(vec![key.clone()]))?;
        for literal in actions {
            match literal.parse::<Action>() {
                Ok(action) => {
                    grant.entry(entity).or_default().insert(action);
                }
                Err(_) => unknown_actions.push(UnknownGrantAction {
                    entity: key.clone(),
                    action: literal.clone(),
                }),
            }
        }
    }
    if !unknown_actions.is_empty() {
        return Err(ValidationError::UnknownAction(unknown_actions));
    }
    Ok(grant)
}

/// Parse a grant loaded from storage. Any unknown literal fails the whole
/// grant; an empty grant is accepted and simply allows nothing.
pub fn parse_grant(raw: &RawGrant) -> Result<PermissionGrant, ParseError> {
    let mut grant = PermissionGrant::new();
    for (key, actions) in raw {
        let entity = key.parse::<EntityKey>()?;
        let parsed = actions
            .iter()
            .map(|literal| literal.parse::<Action>())
            .collect::<Result<BTreeSet<_>, _>>()?;
        if !parsed.is_empty() {
            grant.insert(entity, parsed);
        }
    }
    Ok(grant)
}

/// Render a typed grant back into its stored form.
pub fn to_raw_grant(grant: &PermissionGrant) -> RawGrant {
    grant
        .iter()
        .map(|(entity, actions)| {
            (
                entity.as_str().to_string(),
                actions.iter().map(|a| a.as_str().to_string()).collect(),
            )
        })
        .collect()
}
