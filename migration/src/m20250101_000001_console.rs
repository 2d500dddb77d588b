use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AdminAccounts {
    Table,
    Id,
    Email,
    DisplayName,
    Phone,
    AccountType,
    AssignedProjects,
    Permissions,
    IsActive,
    ApprovedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AdminRequests {
    Table,
    Id,
    ApplicantId,
    Email,
    DisplayName,
    Phone,
    Status,
    RequestedAt,
    ResolvedBy,
    ResolvedAt,
    RejectionReason,
}

#[derive(DeriveIden)]
enum Guards {
    Table,
    Id,
    ProjectId,
    DisplayName,
    CreatedBy,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Projects::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Projects::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Projects::Name).string().not_null())
                    .col(
                        ColumnDef::new(Projects::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdminAccounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AdminAccounts::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(AdminAccounts::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(AdminAccounts::DisplayName).string().not_null())
                    .col(ColumnDef::new(AdminAccounts::Phone).string())
                    .col(
                        ColumnDef::new(AdminAccounts::AccountType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AdminAccounts::AssignedProjects).json().not_null())
                    .col(ColumnDef::new(AdminAccounts::Permissions).json().not_null())
                    .col(
                        ColumnDef::new(AdminAccounts::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(AdminAccounts::ApprovedBy).uuid())
                    .col(
                        ColumnDef::new(AdminAccounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AdminAccounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdminRequests::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AdminRequests::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(AdminRequests::ApplicantId).uuid().not_null())
                    .col(ColumnDef::new(AdminRequests::Email).string().not_null())
                    .col(ColumnDef::new(AdminRequests::DisplayName).string().not_null())
                    .col(ColumnDef::new(AdminRequests::Phone).string())
                    .col(
                        ColumnDef::new(AdminRequests::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(AdminRequests::RequestedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AdminRequests::ResolvedBy).uuid())
                    .col(ColumnDef::new(AdminRequests::ResolvedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(AdminRequests::RejectionReason).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_admin_requests_applicant_status")
                    .table(AdminRequests::Table)
                    .col(AdminRequests::ApplicantId)
                    .col(AdminRequests::Status)
                    .to_owned(),
            )
            .await?;

        // FK declared inline: SQLite cannot add constraints after creation.
        manager
            .create_table(
                Table::create()
                    .table(Guards::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Guards::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Guards::ProjectId).string().not_null())
                    .col(ColumnDef::new(Guards::DisplayName).string().not_null())
                    .col(ColumnDef::new(Guards::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Guards::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_guards_project")
                            .from(Guards::Table, Guards::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_guards_project")
                    .table(Guards::Table)
                    .col(Guards::ProjectId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Guards::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdminRequests::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdminAccounts::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).if_exists().to_owned())
            .await
    }
}
