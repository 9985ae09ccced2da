use axum::{
    Form,
    extract::{Path, State},
    response::Response,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use warbler_types::forms::{MESSAGE_MAX_LEN, MessageForm, error_messages};
use warbler_types::session::FlashLevel;

use crate::error::AppError;
use crate::session::RequestContext;
use crate::{AppState, with_db};

pub async fn new_message_form(ctx: RequestContext) -> Result<Response, AppError> {
    if let Err(denied) = ctx.require_user() {
        return Ok(ctx.unauthorized(denied));
    }
    render_new(ctx, "")
}

/// The author is always the session's user. Any `user_id` in the posted
/// form is not even deserialized.
pub async fn create_message(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Form(form): Form<MessageForm>,
) -> Result<Response, AppError> {
    let user = match ctx.require_user() {
        Ok(user) => user,
        Err(denied) => return Ok(ctx.unauthorized(denied)),
    };

    if let Err(errors) = form.validate() {
        for message in error_messages(&errors) {
            ctx.flash(FlashLevel::Danger, message);
        }
        return render_new(ctx, &form.text);
    }

    let text = form.text;
    let message = with_db(&state, move |db| db.insert_message(user.id, &text)).await??;
    info!(message_id = %message.id, user_id = %message.user_id, "Message created");

    Ok(ctx.redirect(&format!("/users/{}", message.user_id)))
}

fn render_new(ctx: RequestContext, text: &str) -> Result<Response, AppError> {
    let mut context = tera::Context::new();
    context.insert("text", text);
    context.insert("max_len", &MESSAGE_MAX_LEN);
    ctx.render("messages/new.html", context)
}

pub async fn show_message(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(message_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let viewer = ctx.user_id();
    let Some((message, liked)) = with_db(&state, move |db| {
        let Some(message) = db.get_message(message_id)? else {
            return Ok(None);
        };
        let liked = match viewer {
            Some(viewer) => db.liked_message_ids(viewer)?.contains(&message.id),
            None => false,
        };
        anyhow::Ok(Some((message, liked)))
    })
    .await??
    else {
        return ctx.not_found();
    };

    let mut context = tera::Context::new();
    context.insert("is_owner", &(viewer == Some(message.user_id)));
    context.insert("liked", &liked);
    context.insert("message", &message);
    ctx.render("messages/show.html", context)
}

/// Only reachable by POST; the router answers other verbs with 405.
pub async fn delete_message(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(message_id): Path<Uuid>,
) -> Result<Response, AppError> {
    if let Err(denied) = ctx.require_user() {
        return Ok(ctx.unauthorized(denied));
    }

    let Some(message) = with_db(&state, move |db| db.get_message(message_id))
        .await??
    else {
        return ctx.not_found();
    };

    let user = match ctx.authorize_owner(message.user_id) {
        Ok(user) => user,
        Err(denied) => return Ok(ctx.unauthorized(denied)),
    };

    with_db(&state, move |db| db.delete_message(message_id)).await??;
    info!(message_id = %message_id, user_id = %user.id, "Message deleted");

    ctx.flash(FlashLevel::Success, "Message deleted");
    Ok(ctx.redirect(&format!("/users/{}", user.id)))
}
