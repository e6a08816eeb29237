//! Project revenue transaction entity - an invoiced amount against one stage.
//!
//! Rows are append-only. Creating one always increments the matching
//! project stage's captured revenue in the same database transaction.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Revenue transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_revenue_transactions")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Project invoiced
    pub project_id: i64,
    /// Construction stage the invoice covers
    pub stage_id: i64,
    /// Worker credited with the revenue, if any
    pub worker_id: Option<i64>,
    /// Invoice reference
    pub invoice_number: String,
    /// Invoiced amount
    pub revenue_amount: f64,
    /// Cost of delivering the work
    pub cost_amount: f64,
    /// Margin on the invoice
    pub margin_amount: f64,
    /// Business date of the transaction
    pub transaction_date: Date,
    /// When the row was written
    pub created_at: DateTimeUtc,
}

/// Defines relationships between revenue transactions and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one project
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
    /// Stage invoiced
    #[sea_orm(
        belongs_to = "super::construction_stage::Entity",
        from = "Column::StageId",
        to = "super::construction_stage::Column::Id"
    )]
    Stage,
    /// Credited worker
    #[sea_orm(
        belongs_to = "super::worker::Entity",
        from = "Column::WorkerId",
        to = "super::worker::Column::Id"
    )]
    Worker,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
