//! End-to-end tests against an in-memory SQLite database.

use std::sync::{Arc, Mutex};

use engine::{
    ContributeCmd, Engine, EngineError, NewUser, NewWish, NewWishlist, Notifier,
    OfferNotification, UserPatch, Viewer, WishPatch, WishlistPatch,
};
use migration::MigratorTrait;
use sea_orm::Database;

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    migration::Migrator::up(&db, None).await.expect("migrations");
    Engine::builder().database(db).build().await.expect("engine")
}

async fn make_user(engine: &Engine, username: &str) -> String {
    engine
        .new_user(NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "opaque-hash".to_string(),
            about: None,
            avatar: None,
        })
        .await
        .expect("user created")
}

async fn make_wish(engine: &Engine, owner_id: &str, name: &str, price_minor: i64) -> String {
    engine
        .new_wish(
            NewWish {
                name: name.to_string(),
                link: "https://shop.example.com/item".to_string(),
                image: "https://shop.example.com/item.jpg".to_string(),
                price_minor,
                description: "a thing worth having".to_string(),
            },
            owner_id,
        )
        .await
        .expect("wish created")
}

// ─────────────────────────────────────────────────────────────────────────────
// Funding ledger
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn contributions_accumulate_up_to_the_price_and_never_past_it() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;
    let bob = make_user(&engine, "bob").await;
    let carol = make_user(&engine, "carol").await;

    let wish_id = make_wish(&engine, &alice, "camera", 10_000).await;

    engine
        .contribute(ContributeCmd {
            item_id: wish_id.clone(),
            user_id: bob.clone(),
            amount_minor: 6_000,
            hidden: false,
        })
        .await
        .expect("first contribution fits");

    // 6000 raised, 4000 remaining: 4100 must be rejected without any effect.
    let err = engine
        .contribute(ContributeCmd {
            item_id: wish_id.clone(),
            user_id: carol.clone(),
            amount_minor: 4_100,
            hidden: false,
        })
        .await
        .expect_err("overshoot rejected");
    assert!(matches!(err, EngineError::Validation(_)));

    let view = engine.wish(&wish_id, Viewer::anonymous()).await.expect("wish");
    assert_eq!(view.raised_minor, 6_000);
    assert_eq!(view.offers.len(), 1);

    engine
        .contribute(ContributeCmd {
            item_id: wish_id.clone(),
            user_id: carol.clone(),
            amount_minor: 4_000,
            hidden: false,
        })
        .await
        .expect("exact remainder fills the wish");

    let view = engine.wish(&wish_id, Viewer::anonymous()).await.expect("wish");
    assert_eq!(view.raised_minor, view.price_minor);

    // Fully funded wish accepts nothing more.
    let err = engine
        .contribute(ContributeCmd {
            item_id: wish_id.clone(),
            user_id: bob.clone(),
            amount_minor: 1,
            hidden: false,
        })
        .await
        .expect_err("no room left");
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn contribution_amount_must_be_positive() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;
    let bob = make_user(&engine, "bob").await;
    let wish_id = make_wish(&engine, &alice, "camera", 10_000).await;

    for amount in [0, -500] {
        let err = engine
            .contribute(ContributeCmd {
                item_id: wish_id.clone(),
                user_id: bob.clone(),
                amount_minor: amount,
                hidden: false,
            })
            .await
            .expect_err("non-positive amount rejected");
        assert!(matches!(err, EngineError::Validation(_)));
    }
}

#[tokio::test]
async fn owners_cannot_fund_their_own_wish() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;
    let wish_id = make_wish(&engine, &alice, "camera", 10_000).await;

    let err = engine
        .contribute(ContributeCmd {
            item_id: wish_id,
            user_id: alice,
            amount_minor: 1_000,
            hidden: false,
        })
        .await
        .expect_err("self-funding rejected");
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn contributing_to_a_missing_wish_is_not_found() {
    let engine = engine_with_db().await;
    let bob = make_user(&engine, "bob").await;

    let err = engine
        .contribute(ContributeCmd {
            item_id: "no-such-wish".to_string(),
            user_id: bob,
            amount_minor: 1_000,
            hidden: false,
        })
        .await
        .expect_err("unknown wish");
    assert!(matches!(err, EngineError::NotFound(_)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Hidden-offer visibility
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn hidden_offers_are_withheld_from_strangers_but_not_from_parties() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;
    let bob = make_user(&engine, "bob").await;
    let wish_id = make_wish(&engine, &alice, "camera", 10_000).await;

    let created = engine
        .contribute(ContributeCmd {
            item_id: wish_id.clone(),
            user_id: bob.clone(),
            amount_minor: 2_500,
            hidden: true,
        })
        .await
        .expect("hidden contribution");
    // The contributor sees their own offer in full.
    assert_eq!(created.amount_minor, Some(2_500));

    // A stranger and an anonymous viewer see that an offer exists, nothing
    // more.
    for viewer in [Viewer::user("carol-other"), Viewer::anonymous()] {
        let view = engine.offer(&created.id, viewer).await.expect("offer");
        assert!(view.hidden);
        assert_eq!(view.amount_minor, None);
        assert!(view.user.is_none());
    }

    // Contributor and wish owner both see the full offer.
    for viewer in [Viewer::user(&bob), Viewer::user(&alice)] {
        let view = engine.offer(&created.id, viewer).await.expect("offer");
        assert_eq!(view.amount_minor, Some(2_500));
        assert_eq!(view.user.as_ref().map(|u| u.id.as_str()), Some(bob.as_str()));
    }

    // Withheld fields serialize as null, not as zero or empty.
    let stranger_view = engine
        .offer(&created.id, Viewer::anonymous())
        .await
        .expect("offer");
    let json = serde_json::to_value(&stranger_view).expect("serialize");
    assert_eq!(json["amount_minor"], serde_json::Value::Null);
    assert_eq!(json["user"], serde_json::Value::Null);

    // The redaction also applies when the offer rides along on the wish.
    let wish_view = engine.wish(&wish_id, Viewer::anonymous()).await.expect("wish");
    assert_eq!(wish_view.offers.len(), 1);
    assert_eq!(wish_view.offers[0].amount_minor, None);
    // The raised total still moves, hidden or not.
    assert_eq!(wish_view.raised_minor, 2_500);
}

#[tokio::test]
async fn offers_listing_redacts_per_offer() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;
    let bob = make_user(&engine, "bob").await;
    let wish_id = make_wish(&engine, &alice, "camera", 10_000).await;

    engine
        .contribute(ContributeCmd {
            item_id: wish_id.clone(),
            user_id: bob.clone(),
            amount_minor: 1_000,
            hidden: false,
        })
        .await
        .expect("visible contribution");
    engine
        .contribute(ContributeCmd {
            item_id: wish_id.clone(),
            user_id: bob.clone(),
            amount_minor: 2_000,
            hidden: true,
        })
        .await
        .expect("hidden contribution");

    let listing = engine.offers(Viewer::anonymous()).await.expect("offers");
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].amount_minor, Some(1_000));
    assert_eq!(listing[1].amount_minor, None);
    // Each row carries its target wish.
    assert!(listing.iter().all(|o| o.item.is_some()));
}

// ─────────────────────────────────────────────────────────────────────────────
// Wish lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn price_is_frozen_once_a_wish_has_offers() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;
    let bob = make_user(&engine, "bob").await;
    let wish_id = make_wish(&engine, &alice, "camera", 10_000).await;

    // Without offers the price can move freely.
    let view = engine
        .update_wish(
            &wish_id,
            WishPatch {
                price_minor: Some(12_000),
                ..Default::default()
            },
            &alice,
        )
        .await
        .expect("price change before offers");
    assert_eq!(view.price_minor, 12_000);

    engine
        .contribute(ContributeCmd {
            item_id: wish_id.clone(),
            user_id: bob,
            amount_minor: 1_000,
            hidden: false,
        })
        .await
        .expect("contribution");

    let err = engine
        .update_wish(
            &wish_id,
            WishPatch {
                price_minor: Some(15_000),
                ..Default::default()
            },
            &alice,
        )
        .await
        .expect_err("price frozen");
    assert!(matches!(err, EngineError::Validation(_)));

    // Restating the current price is not a change and passes.
    let view = engine
        .update_wish(
            &wish_id,
            WishPatch {
                price_minor: Some(12_000),
                name: Some("better camera".to_string()),
                ..Default::default()
            },
            &alice,
        )
        .await
        .expect("no-op price with a real rename");
    assert_eq!(view.name, "better camera");
    assert_eq!(view.price_minor, 12_000);
}

#[tokio::test]
async fn only_the_owner_updates_or_deletes_a_wish() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;
    let bob = make_user(&engine, "bob").await;
    let wish_id = make_wish(&engine, &alice, "camera", 10_000).await;

    let err = engine
        .update_wish(
            &wish_id,
            WishPatch {
                name: Some("mine now".to_string()),
                ..Default::default()
            },
            &bob,
        )
        .await
        .expect_err("non-owner update");
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .delete_wish(&wish_id, &bob)
        .await
        .expect_err("non-owner delete");
    assert!(matches!(err, EngineError::Forbidden(_)));

    let snapshot = engine.delete_wish(&wish_id, &alice).await.expect("owner delete");
    assert_eq!(snapshot.id, wish_id);

    let err = engine
        .wish(&wish_id, Viewer::anonymous())
        .await
        .expect_err("gone");
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn deleting_a_wish_takes_its_offers_and_memberships_along() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;
    let bob = make_user(&engine, "bob").await;
    let wish_id = make_wish(&engine, &alice, "camera", 10_000).await;

    engine
        .contribute(ContributeCmd {
            item_id: wish_id.clone(),
            user_id: bob.clone(),
            amount_minor: 500,
            hidden: false,
        })
        .await
        .expect("contribution");
    let list_id = engine
        .new_wishlist(
            NewWishlist {
                name: "birthday".to_string(),
                description: None,
                image: None,
                items_id: vec![wish_id.clone()],
            },
            &alice,
        )
        .await
        .expect("wishlist");

    let snapshot = engine.delete_wish(&wish_id, &alice).await.expect("delete");
    assert_eq!(snapshot.offers.len(), 1);

    assert!(engine.offers(Viewer::anonymous()).await.expect("offers").is_empty());
    let list = engine.wishlist(&list_id, Viewer::anonymous()).await.expect("list");
    assert!(list.items.is_empty());
}

#[tokio::test]
async fn copying_bumps_the_counter_and_starts_a_fresh_duplicate() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;
    let bob = make_user(&engine, "bob").await;
    let carol = make_user(&engine, "carol").await;
    let wish_id = make_wish(&engine, &alice, "camera", 10_000).await;

    engine
        .contribute(ContributeCmd {
            item_id: wish_id.clone(),
            user_id: carol,
            amount_minor: 3_000,
            hidden: false,
        })
        .await
        .expect("contribution");

    let duplicate = engine.copy_wish(&wish_id, &bob).await.expect("copy");
    assert_ne!(duplicate.id, wish_id);
    assert_eq!(duplicate.owner.id, bob);
    assert_eq!(duplicate.name, "camera");
    assert_eq!(duplicate.price_minor, 10_000);
    // Funding progress and popularity never travel with a copy.
    assert_eq!(duplicate.raised_minor, 0);
    assert_eq!(duplicate.copied, 0);
    assert!(duplicate.offers.is_empty());

    let source = engine.wish(&wish_id, Viewer::anonymous()).await.expect("source");
    assert_eq!(source.copied, 1);
    assert_eq!(source.raised_minor, 3_000);
}

#[tokio::test]
async fn listings_order_by_recency_and_popularity() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;
    let bob = make_user(&engine, "bob").await;

    let first = make_wish(&engine, &alice, "first", 1_000).await;
    let second = make_wish(&engine, &alice, "second", 1_000).await;
    let third = make_wish(&engine, &alice, "third", 1_000).await;

    let last = engine
        .last_wishes(Some(2), Viewer::anonymous())
        .await
        .expect("last");
    assert_eq!(last.len(), 2);
    assert_eq!(last[0].id, third);
    assert_eq!(last[1].id, second);

    engine.copy_wish(&second, &bob).await.expect("copy");
    engine.copy_wish(&second, &bob).await.expect("copy again");
    engine.copy_wish(&first, &bob).await.expect("copy other");

    let top = engine
        .top_wishes(Some(2), Viewer::anonymous())
        .await
        .expect("top");
    assert_eq!(top[0].id, second);
    assert_eq!(top[0].copied, 2);
    assert_eq!(top[1].id, first);
}

// ─────────────────────────────────────────────────────────────────────────────
// Wishlists
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_item_ids_are_dropped_without_error() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;
    let wish_id = make_wish(&engine, &alice, "camera", 10_000).await;

    let list_id = engine
        .new_wishlist(
            NewWishlist {
                name: "birthday".to_string(),
                description: Some("stuff I want".to_string()),
                image: None,
                items_id: vec![wish_id.clone(), "bogus".to_string()],
            },
            &alice,
        )
        .await
        .expect("wishlist with one bogus id");

    let view = engine.wishlist(&list_id, Viewer::anonymous()).await.expect("list");
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].id, wish_id);
}

#[tokio::test]
async fn wishlist_items_keep_their_curated_order() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;
    let a = make_wish(&engine, &alice, "a", 1_000).await;
    let b = make_wish(&engine, &alice, "b", 1_000).await;
    let c = make_wish(&engine, &alice, "c", 1_000).await;

    let list_id = engine
        .new_wishlist(
            NewWishlist {
                name: "ordered".to_string(),
                description: None,
                image: None,
                items_id: vec![c.clone(), a.clone(), b.clone()],
            },
            &alice,
        )
        .await
        .expect("wishlist");

    let view = engine.wishlist(&list_id, Viewer::anonymous()).await.expect("list");
    let got: Vec<&str> = view.items.iter().map(|w| w.id.as_str()).collect();
    assert_eq!(got, vec![c.as_str(), a.as_str(), b.as_str()]);
}

#[tokio::test]
async fn a_present_item_list_replaces_the_membership_wholesale() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;
    let a = make_wish(&engine, &alice, "a", 1_000).await;
    let b = make_wish(&engine, &alice, "b", 1_000).await;

    let list_id = engine
        .new_wishlist(
            NewWishlist {
                name: "mine".to_string(),
                description: None,
                image: None,
                items_id: vec![a.clone()],
            },
            &alice,
        )
        .await
        .expect("wishlist");

    let view = engine
        .update_wishlist(
            &list_id,
            WishlistPatch {
                items_id: Some(vec![b.clone()]),
                ..Default::default()
            },
            &alice,
        )
        .await
        .expect("replace membership");
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].id, b);

    // An explicitly empty list clears the membership; an absent one leaves
    // it alone.
    let view = engine
        .update_wishlist(
            &list_id,
            WishlistPatch {
                items_id: Some(Vec::new()),
                ..Default::default()
            },
            &alice,
        )
        .await
        .expect("clear membership");
    assert!(view.items.is_empty());

    let view = engine
        .update_wishlist(
            &list_id,
            WishlistPatch {
                name: Some("renamed".to_string()),
                ..Default::default()
            },
            &alice,
        )
        .await
        .expect("rename only");
    assert_eq!(view.name, "renamed");
    assert!(view.items.is_empty());
}

#[tokio::test]
async fn only_the_owner_touches_a_wishlist() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;
    let bob = make_user(&engine, "bob").await;
    let list_id = engine
        .new_wishlist(
            NewWishlist {
                name: "mine".to_string(),
                description: None,
                image: None,
                items_id: Vec::new(),
            },
            &alice,
        )
        .await
        .expect("wishlist");

    let err = engine
        .update_wishlist(
            &list_id,
            WishlistPatch {
                name: Some("hijacked".to_string()),
                ..Default::default()
            },
            &bob,
        )
        .await
        .expect_err("non-owner update");
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .delete_wishlist(&list_id, &bob)
        .await
        .expect_err("non-owner delete");
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine.delete_wishlist(&list_id, &alice).await.expect("owner delete");
    let err = engine
        .wishlist(&list_id, Viewer::anonymous())
        .await
        .expect_err("gone");
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn deleting_a_wishlist_leaves_member_wishes_intact() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;
    let wish_id = make_wish(&engine, &alice, "camera", 10_000).await;
    let list_id = engine
        .new_wishlist(
            NewWishlist {
                name: "mine".to_string(),
                description: None,
                image: None,
                items_id: vec![wish_id.clone()],
            },
            &alice,
        )
        .await
        .expect("wishlist");

    let snapshot = engine.delete_wishlist(&list_id, &alice).await.expect("delete");
    assert_eq!(snapshot.items.len(), 1);

    engine
        .wish(&wish_id, Viewer::anonymous())
        .await
        .expect("member wish survives");
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_username_or_email_is_a_conflict() {
    let engine = engine_with_db().await;
    make_user(&engine, "alice").await;

    let err = engine
        .new_user(NewUser {
            username: "alice".to_string(),
            email: "other@example.com".to_string(),
            password: "opaque-hash".to_string(),
            about: None,
            avatar: None,
        })
        .await
        .expect_err("username taken");
    assert!(matches!(err, EngineError::Conflict(_)));

    let err = engine
        .new_user(NewUser {
            username: "alice2".to_string(),
            email: "alice@example.com".to_string(),
            password: "opaque-hash".to_string(),
            about: None,
            avatar: None,
        })
        .await
        .expect_err("email taken");
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn profile_email_is_visible_only_to_its_owner() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;

    let own = engine
        .profile(&alice, Viewer::user(&alice))
        .await
        .expect("own profile");
    assert_eq!(own.email.as_deref(), Some("alice@example.com"));

    let public = engine
        .profile(&alice, Viewer::anonymous())
        .await
        .expect("public profile");
    assert_eq!(public.email, None);

    let json = serde_json::to_value(&public).expect("serialize");
    assert!(json.get("password").is_none());
}

#[tokio::test]
async fn profiles_resolve_by_username_too() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;

    let view = engine
        .profile_by_username("alice", Viewer::anonymous())
        .await
        .expect("profile");
    assert_eq!(view.id, alice);
    assert_eq!(view.email, None);

    let own = engine
        .profile_by_username("alice", Viewer::user(&alice))
        .await
        .expect("own profile");
    assert_eq!(own.email.as_deref(), Some("alice@example.com"));

    let err = engine
        .profile_by_username("nobody", Viewer::anonymous())
        .await
        .expect_err("unknown username");
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn profile_updates_keep_signup_uniqueness() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;
    make_user(&engine, "bob").await;

    let view = engine
        .update_user(
            &alice,
            UserPatch {
                username: Some("alicia".to_string()),
                about: Some("likes cameras".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("profile update");
    assert_eq!(view.username, "alicia");
    assert_eq!(view.about.as_deref(), Some("likes cameras"));
    assert_eq!(view.email.as_deref(), Some("alice@example.com"));

    // The freed-up old username is visible to lookups immediately.
    let err = engine
        .profile_by_username("alice", Viewer::anonymous())
        .await
        .expect_err("old username gone");
    assert!(matches!(err, EngineError::NotFound(_)));

    let err = engine
        .update_user(
            &alice,
            UserPatch {
                username: Some("bob".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect_err("username taken by someone else");
    assert!(matches!(err, EngineError::Conflict(_)));

    let err = engine
        .update_user(
            &alice,
            UserPatch {
                email: Some("bob@example.com".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect_err("email taken by someone else");
    assert!(matches!(err, EngineError::Conflict(_)));

    // Re-stating one's own identity is not a conflict.
    let view = engine
        .update_user(
            &alice,
            UserPatch {
                username: Some("alicia".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("restating own username");
    assert_eq!(view.username, "alicia");

    let err = engine
        .update_user(
            &alice,
            UserPatch {
                password: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .expect_err("empty password");
    assert!(matches!(err, EngineError::Validation(_)));

    // A blank about clears the field.
    let view = engine
        .update_user(
            &alice,
            UserPatch {
                about: Some("  ".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("clear about");
    assert_eq!(view.about, None);
}

#[tokio::test]
async fn a_users_wishes_come_newest_first_with_redacted_offers() {
    let engine = engine_with_db().await;
    let alice = make_user(&engine, "alice").await;
    let bob = make_user(&engine, "bob").await;

    let older = make_wish(&engine, &alice, "older", 10_000).await;
    let newer = make_wish(&engine, &alice, "newer", 5_000).await;
    make_wish(&engine, &bob, "not hers", 1_000).await;

    engine
        .contribute(ContributeCmd {
            item_id: older.clone(),
            user_id: bob.clone(),
            amount_minor: 1_500,
            hidden: true,
        })
        .await
        .expect("hidden contribution");

    let listing = engine
        .user_wishes(&alice, Viewer::anonymous())
        .await
        .expect("listing");
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].id, newer);
    assert_eq!(listing[1].id, older);
    assert_eq!(listing[1].offers.len(), 1);
    assert_eq!(listing[1].offers[0].amount_minor, None);

    // The owner sees the hidden offer on their own listing.
    let own = engine
        .user_wishes(&alice, Viewer::user(&alice))
        .await
        .expect("own listing");
    assert_eq!(own[1].offers[0].amount_minor, Some(1_500));

    let err = engine
        .user_wishes("no-such-user", Viewer::anonymous())
        .await
        .expect_err("unknown user");
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn user_search_folds_case_on_both_sides() {
    let engine = engine_with_db().await;
    make_user(&engine, "Alice").await;

    let found = engine.find_users("aLiCe").await.expect("search");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].username, "Alice");

    let found = engine.find_users("ALI").await.expect("search");
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn user_search_matches_username_and_email_substrings() {
    let engine = engine_with_db().await;
    make_user(&engine, "alice").await;
    make_user(&engine, "bob").await;

    let by_name = engine.find_users("ali").await.expect("search");
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].username, "alice");

    let by_email = engine.find_users("bob@example").await.expect("search");
    assert_eq!(by_email.len(), 1);

    let all = engine.find_users("  ").await.expect("blank search");
    assert_eq!(all.len(), 2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Notifications
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<OfferNotification>>,
}

impl Notifier for Recorder {
    fn offer_created(&self, notification: OfferNotification) {
        self.sent.lock().unwrap().push(notification);
    }
}

#[tokio::test]
async fn a_committed_contribution_notifies_the_wish_owner() {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    migration::Migrator::up(&db, None).await.expect("migrations");

    let recorder = Arc::new(Recorder::default());
    let engine = Engine::builder()
        .database(db)
        .notifier(recorder.clone())
        .build()
        .await
        .expect("engine");

    let alice = make_user(&engine, "alice").await;
    let bob = make_user(&engine, "bob").await;
    let wish_id = make_wish(&engine, &alice, "camera", 10_000).await;

    engine
        .contribute(ContributeCmd {
            item_id: wish_id.clone(),
            user_id: bob.clone(),
            amount_minor: 2_000,
            hidden: true,
        })
        .await
        .expect("contribution");

    let sent = recorder.sent.lock().expect("lock");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].wish_name, "camera");
    assert_eq!(sent[0].amount_minor, 2_000);
    assert!(sent[0].hidden);
    assert_eq!(sent[0].owner_email.as_deref(), Some("alice@example.com"));
    assert_eq!(sent[0].contributor_email.as_deref(), Some("bob@example.com"));

    // A failed contribution must not notify.
    drop(sent);
    let _ = engine
        .contribute(ContributeCmd {
            item_id: wish_id,
            user_id: alice,
            amount_minor: 100,
            hidden: false,
        })
        .await
        .expect_err("self-funding rejected");
    assert_eq!(recorder.sent.lock().expect("lock").len(), 1);
}
