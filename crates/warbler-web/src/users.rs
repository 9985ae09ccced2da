use std::collections::HashSet;

use axum::{
    Form,
    extract::{Path, Query, State},
    response::Response,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use warbler_db::models::{ProfileUpdate, UserRow};
use warbler_db::{Database, Follow, UniqueViolation};
use warbler_types::forms::{ProfileForm, UserSearch, error_messages};
use warbler_types::session::FlashLevel;

use crate::auth::{authenticate, capitalize};
use crate::error::AppError;
use crate::render::{MessageItem, UserItem};
use crate::session::RequestContext;
use crate::{AppState, with_db};

const PROFILE_MESSAGE_LIMIT: u32 = 100;

/// Header data shared by every page under `/users/{id}`: the user, their
/// counters, and how the viewer relates to them.
pub(crate) fn profile_context(
    db: &Database,
    user_id: Uuid,
    viewer: Option<Uuid>,
) -> anyhow::Result<Option<tera::Context>> {
    let Some(user) = db.get_user_by_id(user_id)? else {
        return Ok(None);
    };
    let stats = db.user_stats(user_id)?;
    let is_followed = match viewer {
        Some(viewer) if viewer != user_id => db.is_following(viewer, user_id)?,
        _ => false,
    };

    let mut context = tera::Context::new();
    context.insert("user", &user);
    context.insert("stats", &stats);
    context.insert("is_self", &(viewer == Some(user_id)));
    context.insert("is_followed", &is_followed);
    Ok(Some(context))
}

fn following_of(db: &Database, viewer: Option<Uuid>) -> anyhow::Result<HashSet<Uuid>> {
    match viewer {
        Some(viewer) => db.following_ids(viewer),
        None => Ok(HashSet::new()),
    }
}

pub(crate) fn likes_of(db: &Database, viewer: Option<Uuid>) -> anyhow::Result<HashSet<Uuid>> {
    match viewer {
        Some(viewer) => db.liked_message_ids(viewer),
        None => Ok(HashSet::new()),
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(search): Query<UserSearch>,
) -> Result<Response, AppError> {
    let viewer = ctx.user_id();
    let term = search.term().map(str::to_string);

    let q = term.clone();
    let (users, following) = with_db(&state, move |db| {
        anyhow::Ok((db.list_users(q.as_deref())?, following_of(db, viewer)?))
    })
    .await??;

    let mut context = tera::Context::new();
    context.insert("q", term.as_deref().unwrap_or_default());
    context.insert("users", &UserItem::list(&users, viewer, &following));
    ctx.render("users/index.html", context)
}

pub async fn show_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let viewer = ctx.user_id();
    let Some((mut context, messages, liked)) = with_db(&state, move |db| {
        let Some(context) = profile_context(db, user_id, viewer)? else {
            return Ok(None);
        };
        let messages = db.messages_by_user(user_id, PROFILE_MESSAGE_LIMIT)?;
        anyhow::Ok(Some((context, messages, likes_of(db, viewer)?)))
    })
    .await??
    else {
        return ctx.not_found();
    };

    context.insert("messages", &MessageItem::list(&messages, viewer, &liked));
    ctx.render("users/show.html", context)
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Following,
    Followers,
}

pub async fn show_following(
    state: State<AppState>,
    ctx: RequestContext,
    path: Path<Uuid>,
) -> Result<Response, AppError> {
    show_follow_list(state, ctx, path, Direction::Following).await
}

pub async fn show_followers(
    state: State<AppState>,
    ctx: RequestContext,
    path: Path<Uuid>,
) -> Result<Response, AppError> {
    show_follow_list(state, ctx, path, Direction::Followers).await
}

/// Any logged-in user may look at anyone's lists.
async fn show_follow_list(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<Uuid>,
    direction: Direction,
) -> Result<Response, AppError> {
    let viewer = match ctx.require_user() {
        Ok(viewer) => viewer.id,
        Err(denied) => return Ok(ctx.unauthorized(denied)),
    };

    let Some((mut context, users, following)) = with_db(&state, move |db| {
        let Some(context) = profile_context(db, user_id, Some(viewer))? else {
            return Ok(None);
        };
        let users = match direction {
            Direction::Following => db.following(user_id)?,
            Direction::Followers => db.followers(user_id)?,
        };
        anyhow::Ok(Some((context, users, db.following_ids(viewer)?)))
    })
    .await??
    else {
        return ctx.not_found();
    };

    context.insert("users", &UserItem::list(&users, Some(viewer), &following));
    let template = match direction {
        Direction::Following => "users/following.html",
        Direction::Followers => "users/followers.html",
    };
    ctx.render(template, context)
}

pub async fn follow(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(followed_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let user = match ctx.require_user() {
        Ok(user) => user,
        Err(denied) => return Ok(ctx.unauthorized(denied)),
    };

    let edge = Follow::new(user.id, followed_id);
    if edge.is_self_follow() {
        ctx.flash(FlashLevel::Danger, "You can't follow yourself.");
        return Ok(ctx.redirect(&format!("/users/{}", user.id)));
    }

    let Some(added) = with_db(&state, move |db| {
        if db.get_user_by_id(followed_id)?.is_none() {
            return Ok(None);
        }
        anyhow::Ok(Some(db.follow(edge)?))
    })
    .await??
    else {
        return ctx.not_found();
    };

    if added {
        info!(follower = %user.id, followed = %followed_id, "Follow added");
    }
    Ok(ctx.redirect(&format!("/users/{}/following", user.id)))
}

pub async fn stop_following(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(followed_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let user = match ctx.require_user() {
        Ok(user) => user,
        Err(denied) => return Ok(ctx.unauthorized(denied)),
    };

    let edge = Follow::new(user.id, followed_id);
    if with_db(&state, move |db| db.unfollow(edge)).await?? {
        info!(follower = %user.id, followed = %followed_id, "Follow removed");
    }
    Ok(ctx.redirect(&format!("/users/{}/following", user.id)))
}

/// Profile form contents; always strings so the template never sees null.
#[derive(Debug, Default, Serialize)]
struct ProfileFields {
    username: String,
    email: String,
    image_url: String,
    header_image_url: String,
    bio: String,
    location: String,
}

impl From<&UserRow> for ProfileFields {
    fn from(user: &UserRow) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            image_url: user.image_url.clone(),
            header_image_url: user.header_image_url.clone(),
            bio: user.bio.clone().unwrap_or_default(),
            location: user.location.clone().unwrap_or_default(),
        }
    }
}

impl From<&ProfileForm> for ProfileFields {
    fn from(form: &ProfileForm) -> Self {
        Self {
            username: form.username.clone(),
            email: form.email.clone(),
            image_url: form.image_url.clone().unwrap_or_default(),
            header_image_url: form.header_image_url.clone().unwrap_or_default(),
            bio: form.bio.clone().unwrap_or_default(),
            location: form.location.clone().unwrap_or_default(),
        }
    }
}

fn render_edit(ctx: RequestContext, fields: ProfileFields) -> Result<Response, AppError> {
    let mut context = tera::Context::new();
    context.insert("form", &fields);
    ctx.render("users/edit.html", context)
}

pub async fn edit_profile_form(ctx: RequestContext) -> Result<Response, AppError> {
    let user = match ctx.require_user() {
        Ok(user) => user,
        Err(denied) => return Ok(ctx.unauthorized(denied)),
    };
    render_edit(ctx, ProfileFields::from(&user))
}

enum EditOutcome {
    Saved(UserRow),
    WrongPassword,
    Taken(String),
}

/// Saves the profile only after the current password checks out.
pub async fn edit_profile(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    let user = match ctx.require_user() {
        Ok(user) => user,
        Err(denied) => return Ok(ctx.unauthorized(denied)),
    };

    let form = form.normalized();
    if let Err(errors) = form.validate() {
        for message in error_messages(&errors) {
            ctx.flash(FlashLevel::Danger, message);
        }
        return render_edit(ctx, ProfileFields::from(&form));
    }

    let (form, outcome) = with_db(&state, move |db| {
        let outcome = save_profile(db, &user, &form);
        (form, outcome)
    })
    .await?;

    match outcome? {
        EditOutcome::Saved(user) => {
            info!(user_id = %user.id, "Profile updated");
            Ok(ctx.redirect(&format!("/users/{}", user.id)))
        }
        EditOutcome::WrongPassword => {
            warn!(user_id = ?ctx.user_id(), "Profile edit with wrong password");
            ctx.flash(FlashLevel::Danger, "Wrong password, please try again.");
            Ok(ctx.redirect("/"))
        }
        EditOutcome::Taken(column) => {
            ctx.flash(FlashLevel::Danger, capitalize(&format!("{column} already taken")));
            render_edit(ctx, ProfileFields::from(&form))
        }
    }
}

fn save_profile(db: &Database, user: &UserRow, form: &ProfileForm) -> anyhow::Result<EditOutcome> {
    if authenticate(db, &user.username, &form.password)?.is_none() {
        return Ok(EditOutcome::WrongPassword);
    }

    let update = ProfileUpdate {
        username: &form.username,
        email: &form.email,
        image_url: form.image_url.as_deref(),
        header_image_url: form.header_image_url.as_deref(),
        bio: form.bio.as_deref(),
        location: form.location.as_deref(),
    };
    match db.update_profile(user.id, &update) {
        Ok(user) => Ok(EditOutcome::Saved(user)),
        Err(e) => match e.downcast::<UniqueViolation>() {
            Ok(violation) => Ok(EditOutcome::Taken(violation.column)),
            Err(e) => Err(e),
        },
    }
}

/// Deletes the account with everything it owns, then logs out.
pub async fn delete_user(
    State(state): State<AppState>,
    mut ctx: RequestContext,
) -> Result<Response, AppError> {
    let user = match ctx.require_user() {
        Ok(user) => user,
        Err(denied) => return Ok(ctx.unauthorized(denied)),
    };

    let user_id = user.id;
    with_db(&state, move |db| db.delete_user(user_id)).await??;
    info!(user_id = %user.id, username = %user.username, "User deleted");

    ctx.session.logout();
    ctx.flash(FlashLevel::Info, "Your account has been deleted.");
    Ok(ctx.redirect("/signup"))
}
