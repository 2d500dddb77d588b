//! Closed vocabularies the permission matrix is keyed on.
//!
//! Stored and user-supplied literals are parsed into these types once, at the
//! boundary. Past that point an unknown entity or action cannot be expressed.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed literal handed to the model by calling code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown entity `{0}`")]
    UnknownEntity(String),
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("unknown account type `{0}`")]
    UnknownAccountType(String),
    #[error("project id must not be empty")]
    EmptyProjectId,
}

/// Resource category subject to access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKey {
    Users,
    Units,
    Logs,
    Services,
    Academies,
    Courts,
    Bookings,
    Complaints,
    News,
    Notifications,
    Store,
    Orders,
    GatePass,
    Guidelines,
    Ads,
    Fines,
    Support,
    Guards,
    DeviceKeys,
    AdminAccounts,
}

impl EntityKey {
    pub const ALL: [EntityKey; 20] = [
        EntityKey::Users,
        EntityKey::Units,
        EntityKey::Logs,
        EntityKey::Services,
        EntityKey::Academies,
        EntityKey::Courts,
        EntityKey::Bookings,
        EntityKey::Complaints,
        EntityKey::News,
        EntityKey::Notifications,
        EntityKey::Store,
        EntityKey::Orders,
        EntityKey::GatePass,
        EntityKey::Guidelines,
        EntityKey::Ads,
        EntityKey::Fines,
        EntityKey::Support,
        EntityKey::Guards,
        EntityKey::DeviceKeys,
        EntityKey::AdminAccounts,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKey::Users => "users",
            EntityKey::Units => "units",
            EntityKey::Logs => "logs",
            EntityKey::Services => "services",
            EntityKey::Academies => "academies",
            EntityKey::Courts => "courts",
            EntityKey::Bookings => "bookings",
            EntityKey::Complaints => "complaints",
            EntityKey::News => "news",
            EntityKey::Notifications => "notifications",
            EntityKey::Store => "store",
            EntityKey::Orders => "orders",
            EntityKey::GatePass => "gate_pass",
            EntityKey::Guidelines => "guidelines",
            EntityKey::Ads => "ads",
            EntityKey::Fines => "fines",
            EntityKey::Support => "support",
            EntityKey::Guards => "guards",
            EntityKey::DeviceKeys => "device_keys",
            EntityKey::AdminAccounts => "admin_accounts",
        }
    }
}

impl FromStr for EntityKey {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        EntityKey::ALL
            .into_iter()
            .find(|entity| entity.as_str() == value)
            .ok_or_else(|| ParseError::UnknownEntity(value.to_string()))
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation kind applied to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Write,
    Delete,
    Create,
    Send,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Read,
        Action::Write,
        Action::Delete,
        Action::Create,
        Action::Send,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Delete => "delete",
            Action::Create => "create",
            Action::Send => "send",
        }
    }
}

impl FromStr for Action {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "read" => Ok(Action::Read),
            "write" => Ok(Action::Write),
            "delete" => Ok(Action::Delete),
            "create" => Ok(Action::Create),
            "send" => Ok(Action::Send),
            other => Err(ParseError::UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission tier of an admin account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    SuperAdmin,
    FullAccess,
    Custom,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::SuperAdmin => "super_admin",
            AccountType::FullAccess => "full_access",
            AccountType::Custom => "custom",
        }
    }
}

impl FromStr for AccountType {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "super_admin" => Ok(AccountType::SuperAdmin),
            "full_access" => Ok(AccountType::FullAccess),
            "custom" => Ok(AccountType::Custom),
            other => Err(ParseError::UnknownAccountType(other.to_string())),
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a project (property). Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    pub fn parse(value: &str) -> Result<Self, ParseError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ParseError::EmptyProjectId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProjectId {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ProjectId::parse(&value)
    }
}

impl From<ProjectId> for String {
    fn from(value: ProjectId) -> Self {
        value.0
    }
}

impl FromStr for ProjectId {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ProjectId::parse(value)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
