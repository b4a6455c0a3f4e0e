//! Wishlist membership rows.
//!
//! `position` keeps the curated order stable across reads; the pair
//! `(wishlist_id, wish_id)` is the primary key, so a wish appears in a given
//! wishlist at most once.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wishlist_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub wishlist_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub wish_id: String,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wishlists::Entity",
        from = "Column::WishlistId",
        to = "super::wishlists::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Wishlists,
    #[sea_orm(
        belongs_to = "super::wishes::Entity",
        from = "Column::WishId",
        to = "super::wishes::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Wishes,
}

impl Related<super::wishlists::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wishlists.def()
    }
}

impl Related<super::wishes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wishes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
