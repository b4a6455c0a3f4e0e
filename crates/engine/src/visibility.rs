//! Read-time redaction of users, offers, wishes and wishlists.
//!
//! Every read path of the engine goes through this one policy instead of
//! stripping fields ad hoc per call site. The functions here are pure: they
//! take persisted models plus the identity of the requesting viewer and
//! produce view structs with the withheld fields absent. Nothing is ever
//! persisted redacted, and redacting twice yields the same result.
//!
//! The rules:
//!
//! - a user's password is never rendered; the email only to the user
//!   themself or in contexts the caller explicitly authorizes (own profile,
//!   authenticated user search);
//! - a hidden offer shows `amount_minor = None` and `user = None` to anyone
//!   who is neither the contributor nor the owner of the target wish;
//! - monetary fields are plain `i64` cents, never decimal strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{offers, users, wishes, wishlists};

/// Identity of the requesting viewer. Anonymous viewers see only public
/// data.
#[derive(Clone, Copy, Debug, Default)]
pub struct Viewer<'a> {
    user_id: Option<&'a str>,
}

impl<'a> Viewer<'a> {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn user(user_id: &'a str) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    /// Whether this viewer is the user with the given id.
    pub fn is(self, user_id: &str) -> bool {
        self.user_id == Some(user_id)
    }
}

/// Whether the caller authorized rendering the email field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmailExposure {
    Conceal,
    Expose,
}

/// The single predicate behind hidden-offer visibility: a hidden offer's
/// amount and contributor are visible only to the contributor and to the
/// owner of the target wish.
pub fn offer_visible_to(
    hidden: bool,
    contributor_id: &str,
    wish_owner_id: &str,
    viewer: Viewer<'_>,
) -> bool {
    !hidden || viewer.is(contributor_id) || viewer.is(wish_owner_id)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub about: Option<String>,
    pub avatar: Option<String>,
    /// Present only when the caller authorized exposure.
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OfferView {
    pub id: String,
    /// `None` when the offer is hidden from this viewer.
    pub amount_minor: Option<i64>,
    pub hidden: bool,
    /// `None` when the offer is hidden from this viewer.
    pub user: Option<UserView>,
    /// The target wish, attached on direct offer reads.
    pub item: Option<Box<WishView>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WishView {
    pub id: String,
    pub name: String,
    pub link: String,
    pub image: String,
    pub price_minor: i64,
    pub raised_minor: i64,
    pub description: String,
    pub copied: i64,
    pub owner: UserView,
    pub offers: Vec<OfferView>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WishlistView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub owner: UserView,
    pub items: Vec<WishView>,
    pub created_at: DateTime<Utc>,
}

/// Render a user, dropping the password unconditionally and the email unless
/// the caller authorized exposure.
pub fn redact_user(user: &users::Model, exposure: EmailExposure) -> UserView {
    UserView {
        id: user.id.clone(),
        username: user.username.clone(),
        about: user.about.clone(),
        avatar: user.avatar.clone(),
        email: match exposure {
            EmailExposure::Expose => Some(user.email.clone()),
            EmailExposure::Conceal => None,
        },
        created_at: user.created_at,
    }
}

/// Render a user for a viewer: the email is exposed only to the user
/// themself.
pub fn redact_user_for(user: &users::Model, viewer: Viewer<'_>) -> UserView {
    let exposure = if viewer.is(&user.id) {
        EmailExposure::Expose
    } else {
        EmailExposure::Conceal
    };
    redact_user(user, exposure)
}

/// Render an offer for a viewer. `wish_owner_id` must come from persisted
/// state, not from the request.
pub fn redact_offer(
    offer: &offers::Model,
    contributor: &users::Model,
    wish_owner_id: &str,
    viewer: Viewer<'_>,
) -> OfferView {
    let visible = offer_visible_to(offer.hidden, &offer.user_id, wish_owner_id, viewer);
    OfferView {
        id: offer.id.clone(),
        amount_minor: visible.then_some(offer.amount_minor),
        hidden: offer.hidden,
        user: visible.then(|| redact_user_for(contributor, viewer)),
        item: None,
        created_at: offer.created_at,
    }
}

/// Render a wish with its owner and offers for a viewer. Each offer passes
/// through [`redact_offer`] with the same viewer.
pub fn redact_wish(
    wish: &wishes::Model,
    owner: &users::Model,
    offers: &[(offers::Model, users::Model)],
    viewer: Viewer<'_>,
) -> WishView {
    WishView {
        id: wish.id.clone(),
        name: wish.name.clone(),
        link: wish.link.clone(),
        image: wish.image.clone(),
        price_minor: wish.price_minor,
        raised_minor: wish.raised_minor,
        description: wish.description.clone(),
        copied: wish.copied,
        owner: redact_user_for(owner, viewer),
        offers: offers
            .iter()
            .map(|(offer, contributor)| redact_offer(offer, contributor, &wish.owner_id, viewer))
            .collect(),
        created_at: wish.created_at,
    }
}

/// Render a wishlist with its owner and items for a viewer.
pub fn redact_wishlist(
    wishlist: &wishlists::Model,
    owner: &users::Model,
    items: &[(wishes::Model, users::Model)],
    viewer: Viewer<'_>,
) -> WishlistView {
    WishlistView {
        id: wishlist.id.clone(),
        name: wishlist.name.clone(),
        description: wishlist.description.clone(),
        image: wishlist.image.clone(),
        owner: redact_user_for(owner, viewer),
        items: items
            .iter()
            .map(|(wish, wish_owner)| redact_wish(wish, wish_owner, &[], viewer))
            .collect(),
        created_at: wishlist.created_at,
    }
}
