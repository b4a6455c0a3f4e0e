//! The module contains the representation of a wish.
//!
//! A wish is a desired item with a funding target (`price_minor`) and an
//! accumulated funding total (`raised_minor`). The funding ledger lives here:
//! [`Wish::apply_contribution`] is the only way `raised_minor` moves, and it
//! keeps the invariant $0 <= raised <= price$ at all times.
//!
//! Amounts are stored as integer cents (`i64`).
//!
//! A contribution is all-or-nothing: with a price of 100.00€ (10000 cents)
//! and 60.00€ already raised, a contribution of 41.00€ is rejected outright
//! rather than partially accepted, while 40.00€ fills the wish exactly.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{MoneyCents, ResultEngine, error::EngineError};

pub(crate) const NAME_MAX_CHARS: usize = 250;
pub(crate) const DESCRIPTION_MAX_CHARS: usize = 1024;

/// A wish with its funding state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Wish {
    pub id: String,
    pub name: String,
    pub link: String,
    pub image: String,
    pub price_minor: i64,
    pub raised_minor: i64,
    pub description: String,
    pub copied: i64,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

impl Wish {
    pub fn new(
        name: String,
        link: String,
        image: String,
        price_minor: i64,
        description: String,
        owner_id: &str,
    ) -> ResultEngine<Self> {
        validate_name(&name)?;
        validate_description(&description)?;
        validate_link(&link, "link")?;
        validate_link(&image, "image")?;
        validate_price(price_minor)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name,
            link,
            image,
            price_minor,
            raised_minor: 0,
            description,
            copied: 0,
            owner_id: owner_id.to_string(),
            created_at: Utc::now(),
        })
    }

    /// Amount still missing to reach the target price.
    pub fn remaining(&self) -> MoneyCents {
        MoneyCents::new(self.price_minor)
            .checked_sub(MoneyCents::new(self.raised_minor))
            .unwrap_or_default()
    }

    /// Apply a contribution to the raised total.
    ///
    /// The contribution is all-or-nothing: it fails when the amount is not
    /// strictly positive or when it would push `raised_minor` past
    /// `price_minor`, and in that case the wish is left untouched.
    pub fn apply_contribution(&mut self, amount_minor: i64) -> ResultEngine<()> {
        let amount = MoneyCents::new(amount_minor);
        if !amount.is_positive() {
            return Err(EngineError::Validation(
                "contribution amount must be positive".to_string(),
            ));
        }
        if amount > self.remaining() {
            return Err(EngineError::Validation(
                "contribution exceeds remaining amount".to_string(),
            ));
        }
        let raised = MoneyCents::new(self.raised_minor)
            .checked_add(amount)
            .ok_or_else(|| EngineError::Validation("raised amount overflow".to_string()))?;
        self.raised_minor = raised.cents();
        Ok(())
    }

    /// Whether the price may be changed to `new_price_minor`.
    ///
    /// A wish with at least one offer keeps its price: contributors funded a
    /// specific target. Re-stating the current price is always allowed.
    pub fn can_change_price(&self, new_price_minor: i64, offer_count: u64) -> bool {
        offer_count == 0 || new_price_minor == self.price_minor
    }

    /// Duplicate the descriptive fields into a brand-new wish owned by
    /// `new_owner_id`.
    ///
    /// The duplicate starts unfunded and uncopied, detached from the
    /// original's offers and wishlist memberships.
    pub fn copy_for(&self, new_owner_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: self.name.clone(),
            link: self.link.clone(),
            image: self.image.clone(),
            price_minor: self.price_minor,
            raised_minor: 0,
            description: self.description.clone(),
            copied: 0,
            owner_id: new_owner_id.to_string(),
            created_at: Utc::now(),
        }
    }
}

pub(crate) fn validate_name(name: &str) -> ResultEngine<()> {
    let len = name.chars().count();
    if len == 0 || len > NAME_MAX_CHARS {
        return Err(EngineError::Validation(format!(
            "name must be between 1 and {NAME_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_description(description: &str) -> ResultEngine<()> {
    let len = description.chars().count();
    if len == 0 || len > DESCRIPTION_MAX_CHARS {
        return Err(EngineError::Validation(format!(
            "description must be between 1 and {DESCRIPTION_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_link(value: &str, label: &str) -> ResultEngine<()> {
    if value.trim().is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} must not be empty"
        )));
    }
    Ok(())
}

pub(crate) fn validate_price(price_minor: i64) -> ResultEngine<()> {
    if price_minor <= 0 {
        return Err(EngineError::Validation(
            "price must be positive".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wishes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub link: String,
    pub image: String,
    pub price_minor: i64,
    pub raised_minor: i64,
    pub description: String,
    pub copied: i64,
    pub owner_id: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::offers::Entity")]
    Offers,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwnerId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
}

impl Related<super::offers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Offers.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Wish {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            link: model.link,
            image: model.image,
            price_minor: model.price_minor,
            raised_minor: model.raised_minor,
            description: model.description,
            copied: model.copied,
            owner_id: model.owner_id,
            created_at: model.created_at,
        }
    }
}

impl From<&Wish> for ActiveModel {
    fn from(wish: &Wish) -> Self {
        Self {
            id: ActiveValue::Set(wish.id.clone()),
            name: ActiveValue::Set(wish.name.clone()),
            link: ActiveValue::Set(wish.link.clone()),
            image: ActiveValue::Set(wish.image.clone()),
            price_minor: ActiveValue::Set(wish.price_minor),
            raised_minor: ActiveValue::Set(wish.raised_minor),
            description: ActiveValue::Set(wish.description.clone()),
            copied: ActiveValue::Set(wish.copied),
            owner_id: ActiveValue::Set(wish.owner_id.clone()),
            created_at: ActiveValue::Set(wish.created_at),
        }
    }
}
