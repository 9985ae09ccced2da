use axum::{extract::State, http::StatusCode, response::Response};

use crate::error::AppError;
use crate::render::MessageItem;
use crate::session::RequestContext;
use crate::users::likes_of;
use crate::{AppState, with_db};

const TIMELINE_LIMIT: u32 = 100;

/// Logged in: the latest messages from the user and everyone they follow.
/// Anonymous: the sign-up pitch.
pub async fn home(State(state): State<AppState>, ctx: RequestContext) -> Result<Response, AppError> {
    let Some(viewer) = ctx.user_id() else {
        return ctx.render("home-anon.html", tera::Context::new());
    };

    let (stats, messages, liked) = with_db(&state, move |db| {
        anyhow::Ok((
            db.user_stats(viewer)?,
            db.timeline(viewer, TIMELINE_LIMIT)?,
            likes_of(db, Some(viewer))?,
        ))
    })
    .await??;

    let mut context = tera::Context::new();
    context.insert("stats", &stats);
    context.insert("messages", &MessageItem::list(&messages, Some(viewer), &liked));
    ctx.render("home.html", context)
}

pub async fn not_found(ctx: RequestContext) -> Result<Response, AppError> {
    ctx.not_found()
}

pub async fn method_not_allowed(ctx: RequestContext) -> Result<Response, AppError> {
    ctx.error_page(StatusCode::METHOD_NOT_ALLOWED)
}
