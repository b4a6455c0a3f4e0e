//! The module contains the `Offer` type, a single contribution toward a
//! wish's raised total.
//!
//! Offers are immutable once created; the raised total they feed lives on
//! the wish row and is maintained incrementally by the funding ledger. An
//! offer marked `hidden` keeps its amount and contributor identity away from
//! everyone except the contributor and the wish owner (see
//! [`crate::visibility`]).

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A contribution made by a user against a wish.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    pub amount_minor: i64,
    pub hidden: bool,
    pub user_id: String,
    pub item_id: String,
    pub created_at: DateTime<Utc>,
}

impl Offer {
    pub fn new(amount_minor: i64, hidden: bool, user_id: &str, item_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            amount_minor,
            hidden,
            user_id: user_id.to_string(),
            item_id: item_id.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "offers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub amount_minor: i64,
    pub hidden: bool,
    pub user_id: String,
    pub item_id: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::wishes::Entity",
        from = "Column::ItemId",
        to = "super::wishes::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Wishes,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::wishes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wishes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Offer {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            amount_minor: model.amount_minor,
            hidden: model.hidden,
            user_id: model.user_id,
            item_id: model.item_id,
            created_at: model.created_at,
        }
    }
}

impl From<&Offer> for ActiveModel {
    fn from(offer: &Offer) -> Self {
        Self {
            id: ActiveValue::Set(offer.id.clone()),
            amount_minor: ActiveValue::Set(offer.amount_minor),
            hidden: ActiveValue::Set(offer.hidden),
            user_id: ActiveValue::Set(offer.user_id.clone()),
            item_id: ActiveValue::Set(offer.item_id.clone()),
            created_at: ActiveValue::Set(offer.created_at),
        }
    }
}
