use axum::{
    extract::{Path, State},
    response::Response,
};
use tracing::info;
use uuid::Uuid;

use warbler_types::session::FlashLevel;

use crate::error::AppError;
use crate::render::MessageItem;
use crate::session::RequestContext;
use crate::users::{likes_of, profile_context};
use crate::{AppState, with_db};

/// Like or unlike someone else's message.
pub async fn toggle_like(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(message_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let user = match ctx.require_user() {
        Ok(user) => user,
        Err(denied) => return Ok(ctx.unauthorized(denied)),
    };

    let Some(message) = with_db(&state, move |db| db.get_message(message_id))
        .await??
    else {
        return ctx.not_found();
    };

    if message.user_id == user.id {
        ctx.flash(FlashLevel::Danger, "You can't like your own message.");
        return Ok(ctx.redirect("/"));
    }

    let user_id = user.id;
    let added = with_db(&state, move |db| db.toggle_like(user_id, message_id)).await??;
    info!(%user_id, %message_id, added, "Like toggled");

    Ok(ctx.redirect("/"))
}

pub async fn show_likes(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let viewer = match ctx.require_user() {
        Ok(viewer) => viewer.id,
        Err(denied) => return Ok(ctx.unauthorized(denied)),
    };

    let Some((mut context, messages, liked)) = with_db(&state, move |db| {
        let Some(context) = profile_context(db, user_id, Some(viewer))? else {
            return Ok(None);
        };
        let messages = db.liked_messages(user_id)?;
        anyhow::Ok(Some((context, messages, likes_of(db, Some(viewer))?)))
    })
    .await??
    else {
        return ctx.not_found();
    };

    context.insert("messages", &MessageItem::list(&messages, Some(viewer), &liked));
    ctx.render("users/likes.html", context)
}
