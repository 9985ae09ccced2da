//! Warbler's HTTP layer: session handling, authorization, and the HTML views.
//!
//! [`router`] builds the complete application so the binary and the
//! integration tests drive exactly the same routes.

pub mod auth;
pub mod error;
pub mod likes;
pub mod messages;
pub mod pages;
pub mod render;
pub mod session;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tera::Tera;
use tracing::error;

use warbler_db::Database;

use crate::error::AppError;
use crate::session::SessionKeys;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub sessions: SessionKeys,
    pub templates: Tera,
}

impl AppStateInner {
    pub fn new(db: Database, sessions: SessionKeys) -> anyhow::Result<AppState> {
        Ok(Arc::new(Self {
            db,
            sessions,
            templates: render::load_templates()?,
        }))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::home))
        .route("/signup", get(auth::signup_form).post(auth::signup_submit))
        .route("/login", get(auth::login_form).post(auth::login_submit))
        .route("/logout", get(auth::logout))
        .route("/users", get(users::list_users))
        .route("/users/profile", get(users::edit_profile_form).post(users::edit_profile))
        .route("/users/delete", post(users::delete_user))
        .route("/users/follow/{id}", post(users::follow))
        .route("/users/stop-following/{id}", post(users::stop_following))
        .route("/users/{id}", get(users::show_user))
        .route("/users/{id}/following", get(users::show_following))
        .route("/users/{id}/followers", get(users::show_followers))
        .route("/users/{id}/likes", get(likes::show_likes))
        .route("/messages/new", get(messages::new_message_form).post(messages::create_message))
        .route("/messages/{id}", get(messages::show_message))
        .route("/messages/{id}/delete", post(messages::delete_message))
        .route("/messages/{id}/like", post(likes::toggle_like))
        .fallback(pages::not_found)
        .method_not_allowed_fallback(pages::method_not_allowed)
        .with_state(state)
}

/// Run blocking database work off the async runtime.
///
/// Only a join failure is reported here; the closure's own result comes back
/// untouched, so call sites usually end in `.await??`.
pub(crate) async fn with_db<F, R>(state: &AppState, f: F) -> Result<R, AppError>
where
    F: FnOnce(&Database) -> R + Send + 'static,
    R: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            AppError::Internal(e.into())
        })
}
