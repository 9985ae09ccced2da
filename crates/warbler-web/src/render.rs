use std::collections::HashSet;

use anyhow::Context as _;
use serde::Serialize;
use tera::{Context, Tera};
use uuid::Uuid;

use warbler_db::models::{MessageRow, UserRow};

use crate::error::AppError;

/// Templates are compiled into the binary; names ending in `.html` are
/// autoescaped by tera.
const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("error.html", include_str!("../templates/error.html")),
    ("home.html", include_str!("../templates/home.html")),
    ("home-anon.html", include_str!("../templates/home-anon.html")),
    ("macros.html", include_str!("../templates/macros.html")),
    ("messages/new.html", include_str!("../templates/messages/new.html")),
    ("messages/show.html", include_str!("../templates/messages/show.html")),
    ("users/detail.html", include_str!("../templates/users/detail.html")),
    ("users/edit.html", include_str!("../templates/users/edit.html")),
    ("users/followers.html", include_str!("../templates/users/followers.html")),
    ("users/following.html", include_str!("../templates/users/following.html")),
    ("users/index.html", include_str!("../templates/users/index.html")),
    ("users/likes.html", include_str!("../templates/users/likes.html")),
    ("users/login.html", include_str!("../templates/users/login.html")),
    ("users/show.html", include_str!("../templates/users/show.html")),
    ("users/signup.html", include_str!("../templates/users/signup.html")),
];

pub fn load_templates() -> anyhow::Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES.iter().copied())
        .context("failed to compile templates")?;
    Ok(tera)
}

pub fn render(tera: &Tera, template: &str, context: &Context) -> Result<String, AppError> {
    tera.render(template, context)
        .with_context(|| format!("failed to render {template}"))
        .map_err(AppError::Internal)
}

/// A message as listed on a page, with the viewer's like state.
#[derive(Debug, Serialize)]
pub struct MessageItem<'a> {
    #[serde(flatten)]
    pub message: &'a MessageRow,
    pub liked: bool,
    pub can_like: bool,
}

impl<'a> MessageItem<'a> {
    pub fn list(messages: &'a [MessageRow], viewer: Option<Uuid>, liked: &HashSet<Uuid>) -> Vec<Self> {
        messages
            .iter()
            .map(|message| MessageItem {
                message,
                liked: liked.contains(&message.id),
                // Own messages can't be liked; anonymous viewers can't like at all.
                can_like: viewer.is_some_and(|v| v != message.user_id),
            })
            .collect()
    }
}

/// A user card, with whether the viewer follows them.
#[derive(Debug, Serialize)]
pub struct UserItem<'a> {
    #[serde(flatten)]
    pub user: &'a UserRow,
    pub followed: bool,
    pub can_follow: bool,
}

impl<'a> UserItem<'a> {
    pub fn list(users: &'a [UserRow], viewer: Option<Uuid>, following: &HashSet<Uuid>) -> Vec<Self> {
        users
            .iter()
            .map(|user| UserItem {
                user,
                followed: following.contains(&user.id),
                can_follow: viewer.is_some_and(|v| v != user.id),
            })
            .collect()
    }
}
