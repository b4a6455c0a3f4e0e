use std::collections::HashMap;

use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, Offer, ResultEngine, Wish,
    notify::{self, OfferNotification},
    offers, users,
    visibility::{OfferView, Viewer, redact_offer, redact_wish},
    wishes,
};

use super::{Engine, with_tx};

/// A contribution request against a wish.
#[derive(Clone, Debug)]
pub struct ContributeCmd {
    pub item_id: String,
    pub user_id: String,
    pub amount_minor: i64,
    pub hidden: bool,
}

impl Engine {
    /// Contribute funding toward a wish.
    ///
    /// The offer insert and the wish's raised update commit as one
    /// transaction; the ledger check runs against the wish row read inside
    /// that same transaction, so concurrent contributions cannot jointly
    /// overshoot the price. The owner notification goes out only after the
    /// commit and never fails the contribution.
    pub async fn contribute(&self, cmd: ContributeCmd) -> ResultEngine<OfferView> {
        let (view, notification) = with_tx!(self, |db_tx| {
            let (wish_model, owner) = self.require_wish_with_owner(&db_tx, &cmd.item_id).await?;
            if wish_model.owner_id == cmd.user_id {
                return Err(EngineError::Validation(
                    "you cannot contribute to your own wish".to_string(),
                ));
            }
            let contributor = self.require_user(&db_tx, &cmd.user_id).await?;

            let mut wish = Wish::from(wish_model);
            wish.apply_contribution(cmd.amount_minor)?;

            let offer = Offer::new(cmd.amount_minor, cmd.hidden, &cmd.user_id, &cmd.item_id);
            let offer_model: offers::ActiveModel = (&offer).into();
            let inserted = offer_model.insert(&db_tx).await?;

            let raise = wishes::ActiveModel {
                id: ActiveValue::Set(wish.id.clone()),
                raised_minor: ActiveValue::Set(wish.raised_minor),
                ..Default::default()
            };
            let updated_wish = raise.update(&db_tx).await?;

            let viewer = Viewer::user(&cmd.user_id);
            let mut view = redact_offer(&inserted, &contributor, &updated_wish.owner_id, viewer);
            view.item = Some(Box::new(redact_wish(&updated_wish, &owner, &[], viewer)));

            let notification = OfferNotification {
                wish_name: updated_wish.name.clone(),
                owner_email: Some(owner.email.clone()),
                contributor_email: Some(contributor.email.clone()),
                amount_minor: cmd.amount_minor,
                hidden: cmd.hidden,
            };
            Ok::<_, EngineError>((view, notification))
        })?;

        notify::dispatch(self.notifier.as_ref(), notification);
        Ok(view)
    }

    /// Return one offer with its wish and contributor attached, redacted for
    /// the viewer.
    pub async fn offer(&self, offer_id: &str, viewer: Viewer<'_>) -> ResultEngine<OfferView> {
        with_tx!(self, |db_tx| {
            let offer = offers::Entity::find_by_id(offer_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("offer".to_string()))?;
            let (wish, owner) = self.require_wish_with_owner(&db_tx, &offer.item_id).await?;
            let contributor = self.require_user(&db_tx, &offer.user_id).await?;

            let mut view = redact_offer(&offer, &contributor, &wish.owner_id, viewer);
            view.item = Some(Box::new(redact_wish(&wish, &owner, &[], viewer)));
            Ok(view)
        })
    }

    /// List all offers in creation order, each with wish and contributor
    /// attached, redacted for the viewer.
    pub async fn offers(&self, viewer: Viewer<'_>) -> ResultEngine<Vec<OfferView>> {
        with_tx!(self, |db_tx| {
            let offer_models = offers::Entity::find()
                .order_by_asc(offers::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            let pairs = self.attach_contributors(&db_tx, offer_models).await?;

            let mut wish_ids: Vec<String> = pairs.iter().map(|(o, _)| o.item_id.clone()).collect();
            wish_ids.sort();
            wish_ids.dedup();
            let wish_models = wishes::Entity::find()
                .filter(wishes::Column::Id.is_in(wish_ids))
                .all(&db_tx)
                .await?;
            let wishes_by_id: HashMap<String, (wishes::Model, users::Model)> = self
                .attach_owners(&db_tx, wish_models)
                .await?
                .into_iter()
                .map(|(wish, owner)| (wish.id.clone(), (wish, owner)))
                .collect();

            let mut out = Vec::with_capacity(pairs.len());
            for (offer, contributor) in &pairs {
                let (wish, owner) = wishes_by_id
                    .get(&offer.item_id)
                    .ok_or_else(|| EngineError::NotFound("wish".to_string()))?;
                let mut view = redact_offer(offer, contributor, &wish.owner_id, viewer);
                view.item = Some(Box::new(redact_wish(wish, owner, &[], viewer)));
                out.push(view);
            }
            Ok(out)
        })
    }
}
