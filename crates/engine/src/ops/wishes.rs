use sea_orm::{ActiveValue, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};

use crate::{
    EngineError, ResultEngine, Wish, offers,
    visibility::{Viewer, WishView, redact_wish},
    wishes, wishlist_items,
};

use super::{Engine, with_tx};

/// Default page size for the "most recent" listing.
const LAST_PAGE_SIZE: u64 = 40;
/// Default page size for the "most copied" listing.
const TOP_PAGE_SIZE: u64 = 20;

#[derive(Clone, Debug)]
pub struct NewWish {
    pub name: String,
    pub link: String,
    pub image: String,
    pub price_minor: i64,
    pub description: String,
}

/// Partial update; absent fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct WishPatch {
    pub name: Option<String>,
    pub link: Option<String>,
    pub image: Option<String>,
    pub price_minor: Option<i64>,
    pub description: Option<String>,
}

impl Engine {
    /// Publish a new wish owned by `owner_id`. Starts unfunded and uncopied.
    pub async fn new_wish(&self, wish: NewWish, owner_id: &str) -> ResultEngine<String> {
        let wish = Wish::new(
            wish.name,
            wish.link,
            wish.image,
            wish.price_minor,
            wish.description,
            owner_id,
        )?;
        let model: wishes::ActiveModel = (&wish).into();

        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, owner_id).await?;
            model.insert(&db_tx).await?;
            Ok(wish.id.clone())
        })
    }

    /// Return a wish with its owner and offers attached, redacted for the
    /// viewer.
    pub async fn wish(&self, wish_id: &str, viewer: Viewer<'_>) -> ResultEngine<WishView> {
        with_tx!(self, |db_tx| {
            let (wish, owner) = self.require_wish_with_owner(&db_tx, wish_id).await?;
            let offers = self.load_wish_offers(&db_tx, wish_id).await?;
            Ok(redact_wish(&wish, &owner, &offers, viewer))
        })
    }

    /// The most recently created wishes, newest first. Owners attached,
    /// offers not loaded.
    pub async fn last_wishes(
        &self,
        limit: Option<u64>,
        viewer: Viewer<'_>,
    ) -> ResultEngine<Vec<WishView>> {
        self.list_wishes(
            wishes::Column::CreatedAt,
            limit.unwrap_or(LAST_PAGE_SIZE),
            viewer,
        )
        .await
    }

    /// The most copied wishes. Owners attached, offers not loaded.
    pub async fn top_wishes(
        &self,
        limit: Option<u64>,
        viewer: Viewer<'_>,
    ) -> ResultEngine<Vec<WishView>> {
        self.list_wishes(
            wishes::Column::Copied,
            limit.unwrap_or(TOP_PAGE_SIZE),
            viewer,
        )
        .await
    }

    async fn list_wishes(
        &self,
        order_by: wishes::Column,
        limit: u64,
        viewer: Viewer<'_>,
    ) -> ResultEngine<Vec<WishView>> {
        with_tx!(self, |db_tx| {
            let models = wishes::Entity::find()
                .order_by_desc(order_by)
                .limit(limit)
                .all(&db_tx)
                .await?;
            let with_owners = self.attach_owners(&db_tx, models).await?;
            Ok(with_owners
                .iter()
                .map(|(wish, owner)| redact_wish(wish, owner, &[], viewer))
                .collect())
        })
    }

    /// Update a wish. Only the owner may update, and the price is frozen as
    /// soon as the wish has offers.
    pub async fn update_wish(
        &self,
        wish_id: &str,
        patch: WishPatch,
        user_id: &str,
    ) -> ResultEngine<WishView> {
        with_tx!(self, |db_tx| {
            let (model, _owner) = self.require_wish_with_owner(&db_tx, wish_id).await?;
            if model.owner_id != user_id {
                return Err(EngineError::Forbidden(
                    "you can only update your own wishes".to_string(),
                ));
            }

            if let Some(new_price) = patch.price_minor {
                wishes::validate_price(new_price)?;
                let offer_count = self.count_offers(&db_tx, wish_id).await?;
                let wish = Wish::from(model.clone());
                if !wish.can_change_price(new_price, offer_count) {
                    return Err(EngineError::Validation(
                        "cannot change price after contributions".to_string(),
                    ));
                }
            }

            let mut update = wishes::ActiveModel {
                id: ActiveValue::Set(wish_id.to_string()),
                ..Default::default()
            };
            let mut changed = false;
            if let Some(name) = patch.name {
                wishes::validate_name(&name)?;
                update.name = ActiveValue::Set(name);
                changed = true;
            }
            if let Some(link) = patch.link {
                wishes::validate_link(&link, "link")?;
                update.link = ActiveValue::Set(link);
                changed = true;
            }
            if let Some(image) = patch.image {
                wishes::validate_link(&image, "image")?;
                update.image = ActiveValue::Set(image);
                changed = true;
            }
            if let Some(price_minor) = patch.price_minor {
                update.price_minor = ActiveValue::Set(price_minor);
                changed = true;
            }
            if let Some(description) = patch.description {
                wishes::validate_description(&description)?;
                update.description = ActiveValue::Set(description);
                changed = true;
            }
            if changed {
                update.update(&db_tx).await?;
            }

            let (refreshed, owner) = self.require_wish_with_owner(&db_tx, wish_id).await?;
            let offers = self.load_wish_offers(&db_tx, wish_id).await?;
            Ok(redact_wish(&refreshed, &owner, &offers, Viewer::user(user_id)))
        })
    }

    /// Delete a wish together with its offers and wishlist memberships.
    /// Returns the pre-deletion snapshot.
    pub async fn delete_wish(&self, wish_id: &str, user_id: &str) -> ResultEngine<WishView> {
        with_tx!(self, |db_tx| {
            let (model, owner) = self.require_wish_with_owner(&db_tx, wish_id).await?;
            if model.owner_id != user_id {
                return Err(EngineError::Forbidden(
                    "you can only remove your own wishes".to_string(),
                ));
            }

            let offers_snapshot = self.load_wish_offers(&db_tx, wish_id).await?;
            let snapshot = redact_wish(&model, &owner, &offers_snapshot, Viewer::user(user_id));

            offers::Entity::delete_many()
                .filter(offers::Column::ItemId.eq(wish_id.to_string()))
                .exec(&db_tx)
                .await?;
            wishlist_items::Entity::delete_many()
                .filter(wishlist_items::Column::WishId.eq(wish_id.to_string()))
                .exec(&db_tx)
                .await?;
            wishes::Entity::delete_by_id(wish_id.to_string())
                .exec(&db_tx)
                .await?;

            Ok(snapshot)
        })
    }

    /// Duplicate a wish under a new owner.
    ///
    /// The source's `copied` counter goes up by one and the duplicate starts
    /// unfunded, detached from the source's offers and wishlist memberships.
    /// Both writes commit in the same transaction.
    pub async fn copy_wish(&self, wish_id: &str, user_id: &str) -> ResultEngine<WishView> {
        with_tx!(self, |db_tx| {
            let source = self.require_wish(&db_tx, wish_id).await?;
            let requester = self.require_user(&db_tx, user_id).await?;

            let bump = wishes::ActiveModel {
                id: ActiveValue::Set(source.id.clone()),
                copied: ActiveValue::Set(source.copied + 1),
                ..Default::default()
            };
            bump.update(&db_tx).await?;

            let duplicate = Wish::from(source).copy_for(user_id);
            let model: wishes::ActiveModel = (&duplicate).into();
            let inserted = model.insert(&db_tx).await?;

            Ok(redact_wish(&inserted, &requester, &[], Viewer::user(user_id)))
        })
    }
}
