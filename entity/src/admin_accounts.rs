use sea_orm::prelude::{DateTimeWithTimeZone, *};
use uuid::Uuid;

/// Approved admin. `account_type`, `assigned_projects` and `permissions` are
/// kept as stored literals; they are parsed when an actor snapshot is loaded.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "admin_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub account_type: String,
    pub assigned_projects: Json,
    pub permissions: Json,
    pub is_active: bool,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
