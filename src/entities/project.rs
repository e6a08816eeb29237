//! Project entity - a construction lead that may become an active site.
//!
//! A project carries its client and location details, the total estimate that
//! is split across construction stages, and references to where it currently
//! sits in both the construction sequence and the sales pipeline.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Project database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-facing unique code, e.g. `"PRJ-00042"`
    #[sea_orm(unique)]
    pub project_code: String,
    /// Project name
    pub name: String,
    /// Client's name
    pub client_name: String,
    /// Client's phone number
    pub phone: Option<String>,
    /// Site address
    pub full_address: String,
    /// Site postal code, used for worker location matching
    pub pincode: String,
    /// Site city
    pub city: String,
    /// Site latitude
    pub latitude: Option<f64>,
    /// Site longitude
    pub longitude: Option<f64>,
    /// Total estimated contract value
    pub estimated_total_value: f64,
    /// Construction stage the site is currently in
    pub current_stage_id: i64,
    /// Position in the sales pipeline
    pub lead_status_id: i64,
    /// Expected handover date
    pub expected_completion_date: Option<Date>,
    /// Inactive projects are excluded from dashboards
    pub is_active: bool,
    /// When the project was entered
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Project and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Current construction stage
    #[sea_orm(
        belongs_to = "super::construction_stage::Entity",
        from = "Column::CurrentStageId",
        to = "super::construction_stage::Column::Id"
    )]
    CurrentStage,
    /// Current lead status
    #[sea_orm(
        belongs_to = "super::lead_status::Entity",
        from = "Column::LeadStatusId",
        to = "super::lead_status::Column::Id"
    )]
    LeadStatus,
    /// Per-stage breakdown rows
    #[sea_orm(has_many = "super::project_stage::Entity")]
    Stages,
    /// Revenue recorded against the project
    #[sea_orm(has_many = "super::project_revenue_transaction::Entity")]
    RevenueTransactions,
}

impl Related<super::project_stage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stages.def()
    }
}

impl Related<super::project_revenue_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RevenueTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
