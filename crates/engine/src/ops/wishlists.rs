use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, users,
    visibility::{Viewer, WishlistView, redact_wishlist},
    wishes, wishlist_items, wishlists,
};

use super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

#[derive(Clone, Debug)]
pub struct NewWishlist {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    /// Wish ids to reference. Unknown ids are silently dropped.
    pub items_id: Vec<String>,
}

/// Partial update; when `items_id` is present (even empty) the membership
/// set is re-resolved and fully replaced.
#[derive(Clone, Debug, Default)]
pub struct WishlistPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub items_id: Option<Vec<String>>,
}

impl Engine {
    /// Create a wishlist referencing existing wishes. Referencing grants no
    /// rights over the wishes themselves.
    pub async fn new_wishlist(
        &self,
        wishlist: NewWishlist,
        owner_id: &str,
    ) -> ResultEngine<String> {
        let name = normalize_required_text(&wishlist.name, "name")?;
        let id = Uuid::new_v4().to_string();

        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, owner_id).await?;

            let model = wishlists::ActiveModel {
                id: ActiveValue::Set(id.clone()),
                name: ActiveValue::Set(name.clone()),
                description: ActiveValue::Set(normalize_optional_text(
                    wishlist.description.as_deref(),
                )),
                image: ActiveValue::Set(normalize_optional_text(wishlist.image.as_deref())),
                owner_id: ActiveValue::Set(owner_id.to_string()),
                created_at: ActiveValue::Set(Utc::now()),
            };
            model.insert(&db_tx).await?;

            let items = self.resolve_items(&db_tx, &wishlist.items_id).await?;
            self.replace_items(&db_tx, &id, &items).await?;

            Ok(id)
        })
    }

    /// Return a wishlist with owner and items (each with its own owner)
    /// attached, redacted for the viewer.
    pub async fn wishlist(
        &self,
        wishlist_id: &str,
        viewer: Viewer<'_>,
    ) -> ResultEngine<WishlistView> {
        with_tx!(self, |db_tx| {
            let model = self.require_wishlist(&db_tx, wishlist_id).await?;
            let owner = self.require_user(&db_tx, &model.owner_id).await?;
            let items = self.load_items(&db_tx, wishlist_id).await?;
            Ok(redact_wishlist(&model, &owner, &items, viewer))
        })
    }

    /// List all wishlists with owners and items attached.
    pub async fn wishlists(&self, viewer: Viewer<'_>) -> ResultEngine<Vec<WishlistView>> {
        with_tx!(self, |db_tx| {
            let models = wishlists::Entity::find()
                .order_by_asc(wishlists::Column::CreatedAt)
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(models.len());
            for model in models {
                let owner = self.require_user(&db_tx, &model.owner_id).await?;
                let items = self.load_items(&db_tx, &model.id).await?;
                out.push(redact_wishlist(&model, &owner, &items, viewer));
            }
            Ok(out)
        })
    }

    /// Update a wishlist. Only the owner may update.
    pub async fn update_wishlist(
        &self,
        wishlist_id: &str,
        patch: WishlistPatch,
        user_id: &str,
    ) -> ResultEngine<WishlistView> {
        with_tx!(self, |db_tx| {
            let model = self.require_wishlist(&db_tx, wishlist_id).await?;
            if model.owner_id != user_id {
                return Err(EngineError::Forbidden(
                    "you can only update your own wishlists".to_string(),
                ));
            }

            let mut update = wishlists::ActiveModel {
                id: ActiveValue::Set(wishlist_id.to_string()),
                ..Default::default()
            };
            let mut changed = false;
            if let Some(name) = patch.name {
                let name = normalize_required_text(&name, "name")?;
                update.name = ActiveValue::Set(name);
                changed = true;
            }
            if let Some(description) = patch.description {
                update.description =
                    ActiveValue::Set(normalize_optional_text(Some(description.as_str())));
                changed = true;
            }
            if let Some(image) = patch.image {
                update.image = ActiveValue::Set(normalize_optional_text(Some(image.as_str())));
                changed = true;
            }
            if changed {
                update.update(&db_tx).await?;
            }

            // A present id list replaces the whole membership set, it is
            // never merged.
            if let Some(items_id) = patch.items_id {
                let items = self.resolve_items(&db_tx, &items_id).await?;
                self.replace_items(&db_tx, wishlist_id, &items).await?;
            }

            let refreshed = self.require_wishlist(&db_tx, wishlist_id).await?;
            let owner = self.require_user(&db_tx, &refreshed.owner_id).await?;
            let items = self.load_items(&db_tx, wishlist_id).await?;
            Ok(redact_wishlist(&refreshed, &owner, &items, Viewer::user(user_id)))
        })
    }

    /// Delete a wishlist and its membership rows. Member wishes are
    /// unaffected. Returns the pre-deletion snapshot.
    pub async fn delete_wishlist(
        &self,
        wishlist_id: &str,
        user_id: &str,
    ) -> ResultEngine<WishlistView> {
        with_tx!(self, |db_tx| {
            let model = self.require_wishlist(&db_tx, wishlist_id).await?;
            if model.owner_id != user_id {
                return Err(EngineError::Forbidden(
                    "you can only remove your own wishlists".to_string(),
                ));
            }

            let owner = self.require_user(&db_tx, &model.owner_id).await?;
            let items = self.load_items(&db_tx, wishlist_id).await?;
            let snapshot = redact_wishlist(&model, &owner, &items, Viewer::user(user_id));

            wishlist_items::Entity::delete_many()
                .filter(wishlist_items::Column::WishlistId.eq(wishlist_id.to_string()))
                .exec(&db_tx)
                .await?;
            wishlists::Entity::delete_by_id(wishlist_id.to_string())
                .exec(&db_tx)
                .await?;

            Ok(snapshot)
        })
    }

    /// Resolve wish ids to existing rows, preserving input order, dropping
    /// duplicates and ids that do not resolve. No error for unknown ids.
    async fn resolve_items(
        &self,
        db: &sea_orm::DatabaseTransaction,
        items_id: &[String],
    ) -> ResultEngine<Vec<wishes::Model>> {
        if items_id.is_empty() {
            return Ok(Vec::new());
        }
        let found = wishes::Entity::find()
            .filter(wishes::Column::Id.is_in(items_id.to_vec()))
            .all(db)
            .await?;
        let mut by_id: HashMap<String, wishes::Model> =
            found.into_iter().map(|w| (w.id.clone(), w)).collect();

        let mut out = Vec::new();
        for id in items_id {
            // `remove` also drops later duplicates of the same id.
            if let Some(wish) = by_id.remove(id) {
                out.push(wish);
            }
        }
        Ok(out)
    }

    async fn replace_items(
        &self,
        db: &sea_orm::DatabaseTransaction,
        wishlist_id: &str,
        items: &[wishes::Model],
    ) -> ResultEngine<()> {
        wishlist_items::Entity::delete_many()
            .filter(wishlist_items::Column::WishlistId.eq(wishlist_id.to_string()))
            .exec(db)
            .await?;

        if items.is_empty() {
            return Ok(());
        }
        let rows = items.iter().enumerate().map(|(position, wish)| {
            wishlist_items::ActiveModel {
                wishlist_id: ActiveValue::Set(wishlist_id.to_string()),
                wish_id: ActiveValue::Set(wish.id.clone()),
                position: ActiveValue::Set(position as i32),
            }
        });
        wishlist_items::Entity::insert_many(rows).exec(db).await?;
        Ok(())
    }

    /// Load a wishlist's items in curated order, each with its owner row.
    async fn load_items(
        &self,
        db: &sea_orm::DatabaseTransaction,
        wishlist_id: &str,
    ) -> ResultEngine<Vec<(wishes::Model, users::Model)>> {
        let rows = wishlist_items::Entity::find()
            .filter(wishlist_items::Column::WishlistId.eq(wishlist_id.to_string()))
            .order_by_asc(wishlist_items::Column::Position)
            .all(db)
            .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = rows.iter().map(|r| r.wish_id.clone()).collect();
        let found = wishes::Entity::find()
            .filter(wishes::Column::Id.is_in(ids.clone()))
            .all(db)
            .await?;
        let mut by_id: HashMap<String, wishes::Model> =
            found.into_iter().map(|w| (w.id.clone(), w)).collect();

        let mut ordered = Vec::with_capacity(rows.len());
        for id in &ids {
            if let Some(wish) = by_id.remove(id) {
                ordered.push(wish);
            }
        }
        self.attach_owners(db, ordered).await
    }
}
