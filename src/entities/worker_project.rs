//! Worker-project link - who worked on which project, in what role, and who
//! referred them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Worker-project link database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "worker_projects")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Linked worker
    pub worker_id: i64,
    /// Linked project
    pub project_id: i64,
    /// Role held on this project
    pub role_id: i64,
    /// Revenue credited to this worker on this project
    pub revenue_generated: f64,
    /// Worker who brought this worker onto the project
    pub referred_by_worker_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::worker::Entity",
        from = "Column::WorkerId",
        to = "super::worker::Column::Id"
    )]
    Worker,
    #[sea_orm(
        belongs_to = "super::worker::Entity",
        from = "Column::ReferredByWorkerId",
        to = "super::worker::Column::Id"
    )]
    ReferredBy,
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
    #[sea_orm(
        belongs_to = "super::worker_role::Entity",
        from = "Column::RoleId",
        to = "super::worker_role::Column::Id"
    )]
    Role,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
