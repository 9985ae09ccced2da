use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Form, extract::State, response::Response};
use thiserror::Error;
use tracing::{info, warn};
use validator::Validate;

use warbler_db::models::{NewUser, UserRow};
use warbler_db::{Database, UniqueViolation};
use warbler_types::forms::{LoginForm, SignupForm, error_messages};
use warbler_types::session::FlashLevel;

use crate::error::AppError;
use crate::session::RequestContext;
use crate::{AppState, with_db};

/// Everything needed to open an account. Every field is required;
/// `image_url: None` means the default picture.
#[derive(Debug, Clone, Copy)]
pub struct NewAccount<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub image_url: Option<&'a str>,
}

#[derive(Debug, Error)]
pub enum SignupError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{0} already taken")]
    Taken(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SignupError {
    /// Text for the form, e.g. "Username already taken".
    pub fn user_message(&self) -> Option<String> {
        match self {
            SignupError::Missing(field) => Some(capitalize(&format!("{field} is required"))),
            SignupError::Taken(column) => Some(capitalize(&format!("{column} already taken"))),
            SignupError::Internal(_) => None,
        }
    }
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// False for a wrong password and for anything that isn't an Argon2 hash.
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// Hash the password and store the new user.
pub fn signup(db: &Database, account: NewAccount<'_>) -> Result<UserRow, SignupError> {
    for (field, value) in [
        ("username", account.username),
        ("email", account.email),
        ("password", account.password),
    ] {
        if value.trim().is_empty() {
            return Err(SignupError::Missing(field));
        }
    }

    let password_hash = hash_password(account.password)?;
    let user = db
        .create_user(&NewUser {
            username: account.username,
            email: account.email,
            password_hash: &password_hash,
            image_url: account.image_url.filter(|url| !url.trim().is_empty()),
        })
        .map_err(|e| match e.downcast::<UniqueViolation>() {
            Ok(violation) => SignupError::Taken(violation.column),
            Err(e) => SignupError::Internal(e),
        })?;

    info!(user_id = %user.id, username = %user.username, "User signed up");
    Ok(user)
}

/// `Some(user)` only when the username exists and the password matches.
/// An unknown user and a wrong password look exactly the same.
pub fn authenticate(db: &Database, username: &str, password: &str) -> anyhow::Result<Option<UserRow>> {
    let Some(user) = db.get_user_by_username(username)? else {
        return Ok(None);
    };
    Ok(verify_password(&user.password, password).then_some(user))
}

// -- Handlers --

pub async fn signup_form(ctx: RequestContext) -> Result<Response, AppError> {
    render_signup(ctx, &SignupForm::default())
}

pub async fn signup_submit(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let form = form.normalized();
    if let Err(errors) = form.validate() {
        for message in error_messages(&errors) {
            ctx.flash(FlashLevel::Danger, message);
        }
        return render_signup(ctx, &form);
    }

    let (form, result) = with_db(&state, move |db| {
        let result = signup(
            db,
            NewAccount {
                username: &form.username,
                email: &form.email,
                password: &form.password,
                image_url: form.image_url.as_deref(),
            },
        );
        (form, result)
    })
    .await?;

    match result {
        Ok(user) => {
            ctx.session.login(user.id);
            Ok(ctx.redirect("/"))
        }
        Err(SignupError::Internal(e)) => Err(AppError::Internal(e)),
        Err(e) => {
            warn!(username = %form.username, "Signup refused: {}", e);
            if let Some(message) = e.user_message() {
                ctx.flash(FlashLevel::Danger, message);
            }
            render_signup(ctx, &form)
        }
    }
}

fn render_signup(ctx: RequestContext, form: &SignupForm) -> Result<Response, AppError> {
    let mut context = tera::Context::new();
    context.insert("username", &form.username);
    context.insert("email", &form.email);
    context.insert("image_url", form.image_url.as_deref().unwrap_or_default());
    ctx.render("users/signup.html", context)
}

pub async fn login_form(ctx: RequestContext) -> Result<Response, AppError> {
    render_login(ctx, "")
}

pub async fn login_submit(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let form = form.normalized();
    if form.validate().is_ok() {
        let username = form.username.clone();
        let password = form.password;
        let user = with_db(&state, move |db| authenticate(db, &username, &password)).await??;

        if let Some(user) = user {
            info!(user_id = %user.id, "User logged in");
            ctx.session.login(user.id);
            ctx.flash(FlashLevel::Success, format!("Hello, {}!", user.username));
            return Ok(ctx.redirect("/"));
        }
    }

    warn!(username = %form.username, "Failed login");
    ctx.flash(FlashLevel::Danger, "Invalid credentials.");
    render_login(ctx, &form.username)
}

fn render_login(ctx: RequestContext, username: &str) -> Result<Response, AppError> {
    let mut context = tera::Context::new();
    context.insert("username", username);
    ctx.render("users/login.html", context)
}

pub async fn logout(mut ctx: RequestContext) -> Response {
    if let Some(id) = ctx.user_id() {
        info!(user_id = %id, "User logged out");
    }
    ctx.session.logout();
    ctx.flash(FlashLevel::Success, "You have successfully logged out.");
    ctx.redirect("/login")
}

pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
