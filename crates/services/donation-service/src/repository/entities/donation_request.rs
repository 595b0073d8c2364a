//! Donation request database entity for SeaORM.

use sea_orm::entity::prelude::*;

use common::{AppError, AppResult};
use domain::{DonationRequest, RequestStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "donation_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub requester_id: i32,
    pub status: String,
    /// Set only together with status = fulfilled
    pub donation_id: Option<i32>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::RequesterId",
        to = "super::user::Column::Id"
    )]
    Requester,
    #[sea_orm(
        belongs_to = "super::donation::Entity",
        from = "Column::DonationId",
        to = "super::donation::Column::Id"
    )]
    Donation,
    #[sea_orm(has_many = "super::donation_request_meal::Entity")]
    Preferences,
}

impl Related<super::donation_request_meal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Preferences.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for DonationRequest {
    type Error = AppError;

    fn try_from(model: Model) -> AppResult<Self> {
        Ok(DonationRequest {
            id: model.id,
            requester_id: model.requester_id,
            status: RequestStatus::try_from(model.status.as_str())?,
            donation_id: model.donation_id,
            created_at: model.created_at,
        })
    }
}
