//! Lookup and ownership helpers shared by the operation modules.
//!
//! Ownership is always re-resolved from persisted state by identifier
//! equality; a record supplied alongside a request is never trusted for
//! authorization.

use std::collections::HashMap;

use sea_orm::{DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, prelude::*};

use crate::{EngineError, ResultEngine, offers, users, wishes, wishlists};

use super::Engine;

impl Engine {
    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("user".to_string()))
    }

    pub(super) async fn require_wish(
        &self,
        db: &DatabaseTransaction,
        wish_id: &str,
    ) -> ResultEngine<wishes::Model> {
        wishes::Entity::find_by_id(wish_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("wish".to_string()))
    }

    /// Resolve a wish together with its owner row. The owner comes from the
    /// database, never from the caller.
    pub(super) async fn require_wish_with_owner(
        &self,
        db: &DatabaseTransaction,
        wish_id: &str,
    ) -> ResultEngine<(wishes::Model, users::Model)> {
        let wish = self.require_wish(db, wish_id).await?;
        let owner = self.require_user(db, &wish.owner_id).await?;
        Ok((wish, owner))
    }

    pub(super) async fn require_wishlist(
        &self,
        db: &DatabaseTransaction,
        wishlist_id: &str,
    ) -> ResultEngine<wishlists::Model> {
        wishlists::Entity::find_by_id(wishlist_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("wishlist".to_string()))
    }

    pub(super) async fn count_offers(
        &self,
        db: &DatabaseTransaction,
        wish_id: &str,
    ) -> ResultEngine<u64> {
        offers::Entity::find()
            .filter(offers::Column::ItemId.eq(wish_id.to_string()))
            .count(db)
            .await
            .map_err(Into::into)
    }

    /// Load a wish's offers in creation order, each paired with its
    /// contributor row.
    pub(super) async fn load_wish_offers(
        &self,
        db: &DatabaseTransaction,
        wish_id: &str,
    ) -> ResultEngine<Vec<(offers::Model, users::Model)>> {
        let offer_models = offers::Entity::find()
            .filter(offers::Column::ItemId.eq(wish_id.to_string()))
            .order_by_asc(offers::Column::CreatedAt)
            .all(db)
            .await?;
        self.attach_contributors(db, offer_models).await
    }

    pub(super) async fn attach_contributors(
        &self,
        db: &DatabaseTransaction,
        offer_models: Vec<offers::Model>,
    ) -> ResultEngine<Vec<(offers::Model, users::Model)>> {
        let contributor_ids: Vec<String> =
            offer_models.iter().map(|o| o.user_id.clone()).collect();
        let contributors = self.users_by_id(db, contributor_ids).await?;

        let mut out = Vec::with_capacity(offer_models.len());
        for offer in offer_models {
            let contributor = contributors
                .get(&offer.user_id)
                .cloned()
                .ok_or_else(|| EngineError::NotFound("user".to_string()))?;
            out.push((offer, contributor));
        }
        Ok(out)
    }

    /// Pair each wish with its owner row, batching the user lookup.
    pub(super) async fn attach_owners(
        &self,
        db: &DatabaseTransaction,
        wish_models: Vec<wishes::Model>,
    ) -> ResultEngine<Vec<(wishes::Model, users::Model)>> {
        let owner_ids: Vec<String> = wish_models.iter().map(|w| w.owner_id.clone()).collect();
        let owners = self.users_by_id(db, owner_ids).await?;

        let mut out = Vec::with_capacity(wish_models.len());
        for wish in wish_models {
            let owner = owners
                .get(&wish.owner_id)
                .cloned()
                .ok_or_else(|| EngineError::NotFound("user".to_string()))?;
            out.push((wish, owner));
        }
        Ok(out)
    }

    async fn users_by_id(
        &self,
        db: &DatabaseTransaction,
        mut ids: Vec<String>,
    ) -> ResultEngine<HashMap<String, users::Model>> {
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let models = users::Entity::find()
            .filter(users::Column::Id.is_in(ids))
            .all(db)
            .await?;
        Ok(models.into_iter().map(|u| (u.id.clone(), u)).collect())
    }
}
