use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VersionFiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(VersionFiles::VersionId).integer().not_null())
                    .col(ColumnDef::new(VersionFiles::FileId).integer().not_null())
                    .col(ColumnDef::new(VersionFiles::CreatedAt).timestamp().not_null())
                    .primary_key(
                        Index::create()
                            .col(VersionFiles::VersionId)
                            .col(VersionFiles::FileId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_version_files_version_id")
                            .from(VersionFiles::Table, VersionFiles::VersionId)
                            .to(Versions::Table, Versions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_version_files_file_id")
                            .from(VersionFiles::Table, VersionFiles::FileId)
                            .to(Files::Table, Files::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VersionFiles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VersionFiles {
    Table,
    VersionId,
    FileId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Versions {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Files {
    Table,
    Id,
}
