//! Funding and visibility engine for a gift registry.
//!
//! Users publish wishes (desired items with a target price), other users
//! fund them with offers, and wishes are curated into shareable wishlists.
//! The engine owns the funding invariant (`0 <= raised <= price`), the
//! ownership checks in front of every mutation, and the read-time redaction
//! of hidden offers and private user fields. HTTP, password hashing and
//! actual mail delivery live outside; persistence goes through `sea-orm`
//! and each write runs inside a single database transaction.

pub use error::EngineError;
pub use money::MoneyCents;
pub use notify::{LogNotifier, Notifier, OfferNotification};
pub use offers::Offer;
pub use ops::{
    ContributeCmd, Engine, EngineBuilder, NewUser, NewWish, NewWishlist, UserPatch, WishPatch,
    WishlistPatch,
};
pub use visibility::{
    EmailExposure, OfferView, UserView, Viewer, WishView, WishlistView, offer_visible_to,
    redact_offer, redact_user, redact_user_for, redact_wish, redact_wishlist,
};
pub use wishes::Wish;

mod error;
mod money;
mod notify;
pub mod offers;
mod ops;
pub mod users;
mod visibility;
pub mod wishes;
pub mod wishlist_items;
pub mod wishlists;

type ResultEngine<T> = Result<T, EngineError>;
