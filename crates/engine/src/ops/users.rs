use chrono::Utc;
use sea_orm::{
    ActiveValue, Condition, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
    sea_query::{Expr, Func},
};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, users,
    visibility::{
        EmailExposure, UserView, Viewer, WishView, redact_user, redact_user_for, redact_wish,
    },
    wishes,
};

use super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

/// Signup payload. The password is an opaque credential already processed by
/// the authentication boundary.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub about: Option<String>,
    pub avatar: Option<String>,
}

/// Partial profile update; absent fields are left untouched. A blank about
/// or avatar clears the field.
#[derive(Clone, Debug, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub about: Option<String>,
    pub avatar: Option<String>,
}

impl Engine {
    /// Register a new user. Fails with `Conflict` when the username or email
    /// is already taken.
    pub async fn new_user(&self, user: NewUser) -> ResultEngine<String> {
        let username = normalize_required_text(&user.username, "username")?;
        let email = normalize_required_text(&user.email, "email")?;
        if user.password.is_empty() {
            return Err(EngineError::Validation(
                "password must not be empty".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        with_tx!(self, |db_tx| {
            let taken = users::Entity::find()
                .filter(
                    Condition::any()
                        .add(users::Column::Username.eq(username.clone()))
                        .add(users::Column::Email.eq(email.clone())),
                )
                .one(&db_tx)
                .await?
                .is_some();
            if taken {
                return Err(EngineError::Conflict(
                    "username or email already taken".to_string(),
                ));
            }

            let model = users::ActiveModel {
                id: ActiveValue::Set(id.clone()),
                username: ActiveValue::Set(username.clone()),
                email: ActiveValue::Set(email.clone()),
                password: ActiveValue::Set(user.password.clone()),
                about: ActiveValue::Set(normalize_optional_text(user.about.as_deref())),
                avatar: ActiveValue::Set(normalize_optional_text(user.avatar.as_deref())),
                created_at: ActiveValue::Set(Utc::now()),
            };
            model.insert(&db_tx).await?;

            Ok(id)
        })
    }

    /// Return a user profile. The email is present only when the viewer is
    /// that user.
    pub async fn profile(&self, user_id: &str, viewer: Viewer<'_>) -> ResultEngine<UserView> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            Ok(redact_user_for(&user, viewer))
        })
    }

    /// Resolve a profile by its unique username. Same redaction as
    /// [`Engine::profile`].
    pub async fn profile_by_username(
        &self,
        username: &str,
        viewer: Viewer<'_>,
    ) -> ResultEngine<UserView> {
        with_tx!(self, |db_tx| {
            let user = users::Entity::find()
                .filter(users::Column::Username.eq(username.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("user".to_string()))?;
            Ok(redact_user_for(&user, viewer))
        })
    }

    /// Update the user's own profile. A username or email already carried by
    /// a different user is a `Conflict`; the password stays opaque and may
    /// not be set to empty. Returns the refreshed profile, email included.
    pub async fn update_user(&self, user_id: &str, patch: UserPatch) -> ResultEngine<UserView> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;

            let mut update = users::ActiveModel {
                id: ActiveValue::Set(user_id.to_string()),
                ..Default::default()
            };
            let mut changed = false;
            if let Some(username) = patch.username {
                let username = normalize_required_text(&username, "username")?;
                if self
                    .identity_taken(&db_tx, users::Column::Username, &username, user_id)
                    .await?
                {
                    return Err(EngineError::Conflict(
                        "username or email already taken".to_string(),
                    ));
                }
                update.username = ActiveValue::Set(username);
                changed = true;
            }
            if let Some(email) = patch.email {
                let email = normalize_required_text(&email, "email")?;
                if self
                    .identity_taken(&db_tx, users::Column::Email, &email, user_id)
                    .await?
                {
                    return Err(EngineError::Conflict(
                        "username or email already taken".to_string(),
                    ));
                }
                update.email = ActiveValue::Set(email);
                changed = true;
            }
            if let Some(password) = patch.password {
                if password.is_empty() {
                    return Err(EngineError::Validation(
                        "password must not be empty".to_string(),
                    ));
                }
                update.password = ActiveValue::Set(password);
                changed = true;
            }
            if let Some(about) = patch.about {
                update.about = ActiveValue::Set(normalize_optional_text(Some(about.as_str())));
                changed = true;
            }
            if let Some(avatar) = patch.avatar {
                update.avatar = ActiveValue::Set(normalize_optional_text(Some(avatar.as_str())));
                changed = true;
            }
            if changed {
                update.update(&db_tx).await?;
            }

            let refreshed = self.require_user(&db_tx, user_id).await?;
            Ok(redact_user_for(&refreshed, Viewer::user(user_id)))
        })
    }

    /// List a user's wishes newest first, each with owner and offers
    /// attached, redacted for the viewer.
    pub async fn user_wishes(
        &self,
        user_id: &str,
        viewer: Viewer<'_>,
    ) -> ResultEngine<Vec<WishView>> {
        with_tx!(self, |db_tx| {
            let owner = self.require_user(&db_tx, user_id).await?;
            let models = wishes::Entity::find()
                .filter(wishes::Column::OwnerId.eq(user_id.to_string()))
                .order_by_desc(wishes::Column::CreatedAt)
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(models.len());
            for model in models {
                let offers = self.load_wish_offers(&db_tx, &model.id).await?;
                out.push(redact_wish(&model, &owner, &offers, viewer));
            }
            Ok(out)
        })
    }

    /// Case-insensitive substring search over usernames and emails. This is
    /// an authenticated listing, so emails are exposed; callers gate access.
    ///
    /// The match is folded through `lower()` on both sides instead of
    /// relying on `LIKE`, whose case folding is ASCII-only on SQLite and
    /// collation-dependent elsewhere.
    pub async fn find_users(&self, query: &str) -> ResultEngine<Vec<UserView>> {
        let search = query.trim().to_lowercase();
        with_tx!(self, |db_tx| {
            let mut select = users::Entity::find();
            if !search.is_empty() {
                let pattern = format!("%{search}%");
                select = select.filter(
                    Condition::any()
                        .add(
                            Expr::expr(Func::lower(Expr::col(users::Column::Username)))
                                .like(pattern.clone()),
                        )
                        .add(Expr::expr(Func::lower(Expr::col(users::Column::Email))).like(pattern)),
                );
            }
            let models = select.all(&db_tx).await?;
            Ok(models
                .iter()
                .map(|u| redact_user(u, EmailExposure::Expose))
                .collect())
        })
    }

    async fn identity_taken(
        &self,
        db: &sea_orm::DatabaseTransaction,
        column: users::Column,
        value: &str,
        except_id: &str,
    ) -> ResultEngine<bool> {
        Ok(users::Entity::find()
            .filter(column.eq(value.to_string()))
            .filter(users::Column::Id.ne(except_id.to_string()))
            .one(db)
            .await?
            .is_some())
    }
}
