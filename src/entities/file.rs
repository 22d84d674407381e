use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A file record. `size`, `path` and `mime_type` are only set once the
/// upload has completed, together with `is_complete`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub size: Option<i64>,
    #[sea_orm(unique)]
    pub path: Option<String>,
    pub mime_type: Option<String>,
    pub is_complete: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::version_file::Entity")]
    VersionFile,
}

impl Related<super::version_file::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VersionFile.def()
    }
}

impl Related<super::version::Entity> for Entity {
    fn to() -> RelationDef {
        super::version_file::Relation::Version.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::version_file::Relation::File.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
