//! Signed-cookie sessions and the per-request context built from them.
//!
//! The session is a JWT in the `warbler_session` cookie. It carries the
//! logged-in user's id under [`CURR_USER_KEY`] plus any pending flash
//! messages. Nothing is stored server-side.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{Html, IntoResponse, IntoResponseParts, Redirect, Response, ResponseParts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{error, warn};
use uuid::Uuid;

use warbler_db::models::UserRow;
use warbler_types::session::{Flash, FlashLevel, SessionClaims};

pub use warbler_types::session::CURR_USER_KEY;

use crate::error::AppError;
use crate::{AppState, render, with_db};

pub const SESSION_COOKIE: &str = "warbler_session";

pub const ACCESS_UNAUTHORIZED: &str = "Access unauthorized.";

#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::default(),
            ttl,
        }
    }

    /// Sign `claims`, stamping a fresh expiry.
    pub fn encode(&self, claims: &SessionClaims) -> anyhow::Result<String> {
        let claims = SessionClaims {
            exp: (Utc::now() + self.ttl).timestamp() as usize,
            ..claims.clone()
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// `None` for anything that is not a valid, unexpired session.
    pub fn decode(&self, token: &str) -> Option<SessionClaims> {
        match decode::<SessionClaims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                warn!("Ignoring session cookie: {}", e);
                None
            }
        }
    }
}

pub struct Session {
    claims: SessionClaims,
    keys: SessionKeys,
    dirty: bool,
}

impl Session {
    pub fn new(claims: SessionClaims, keys: SessionKeys) -> Self {
        Self {
            claims,
            keys,
            dirty: false,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.claims.curr_user
    }

    pub fn login(&mut self, user_id: Uuid) {
        self.claims.curr_user = Some(user_id);
        self.dirty = true;
    }

    pub fn logout(&mut self) {
        if self.claims.curr_user.take().is_some() {
            self.dirty = true;
        }
    }

    pub fn flash(&mut self, level: FlashLevel, message: impl Into<String>) {
        self.claims.flashes.push(Flash::new(level, message));
        self.dirty = true;
    }

    pub fn take_flashes(&mut self) -> Vec<Flash> {
        if !self.claims.flashes.is_empty() {
            self.dirty = true;
        }
        std::mem::take(&mut self.claims.flashes)
    }
}

impl IntoResponseParts for Session {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if !self.dirty {
            return Ok(res);
        }
        match self.keys.encode(&self.claims) {
            Ok(token) => {
                let cookie = Cookie::build((SESSION_COOKIE, token))
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax);
                CookieJar::new().add(cookie).into_response_parts(res)
            }
            Err(e) => {
                error!("Failed to sign session: {:#}", e);
                Ok(res)
            }
        }
    }
}

/// Why an action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denied {
    Unauthenticated,
    NotOwner,
}

pub fn require_login(user: Option<&UserRow>) -> Result<&UserRow, Denied> {
    user.ok_or(Denied::Unauthenticated)
}

pub fn require_owner(user: Option<&UserRow>, owner_id: Uuid) -> Result<&UserRow, Denied> {
    let user = require_login(user)?;
    if user.id == owner_id {
        Ok(user)
    } else {
        Err(Denied::NotOwner)
    }
}

/// Everything a handler knows about who is asking.
///
/// `user` is `None` for anonymous visitors, including sessions whose user
/// has since been deleted.
pub struct RequestContext {
    pub session: Session,
    pub user: Option<UserRow>,
    state: AppState,
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let claims = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| state.sessions.decode(cookie.value()))
            .unwrap_or_default();
        let mut session = Session::new(claims, state.sessions.clone());

        let user = match session.user_id() {
            Some(id) => {
                let user = with_db(state, move |db| db.get_user_by_id(id)).await??;
                if user.is_none() {
                    warn!(%id, "Session names a missing user, treating as anonymous");
                    session.logout();
                }
                user
            }
            None => None,
        };

        Ok(Self {
            session,
            user,
            state: state.clone(),
        })
    }
}

impl RequestContext {
    pub fn user_id(&self) -> Option<Uuid> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn require_user(&self) -> Result<UserRow, Denied> {
        require_login(self.user.as_ref()).cloned()
    }

    pub fn authorize_owner(&self, owner_id: Uuid) -> Result<UserRow, Denied> {
        require_owner(self.user.as_ref(), owner_id).cloned()
    }

    pub fn flash(&mut self, level: FlashLevel, message: impl Into<String>) {
        self.session.flash(level, message);
    }

    /// The one response for every refused action, whatever the reason.
    pub fn unauthorized(mut self, denied: Denied) -> Response {
        warn!(?denied, user = ?self.user_id(), "Access denied");
        self.session.flash(FlashLevel::Danger, ACCESS_UNAUTHORIZED);
        self.redirect("/")
    }

    pub fn redirect(self, to: &str) -> Response {
        (self.session, Redirect::to(to)).into_response()
    }

    /// The 404 page, for ids that name nothing.
    pub fn not_found(self) -> Result<Response, AppError> {
        self.error_page(StatusCode::NOT_FOUND)
    }

    pub fn error_page(self, status: StatusCode) -> Result<Response, AppError> {
        let mut context = tera::Context::new();
        context.insert("status", &status.as_u16());
        context.insert("title", status.canonical_reason().unwrap_or("Error"));
        self.render_status(status, "error.html", context)
    }

    /// Render `template` with the flashes and current user filled in.
    pub fn render(self, template: &str, context: tera::Context) -> Result<Response, AppError> {
        self.render_status(StatusCode::OK, template, context)
    }

    pub fn render_status(
        mut self,
        status: StatusCode,
        template: &str,
        mut context: tera::Context,
    ) -> Result<Response, AppError> {
        context.insert("flashes", &self.session.take_flashes());
        context.insert("current_user", &self.user);
        let html = render::render(&self.state.templates, template, &context)?;
        Ok((status, self.session, Html(html)).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            username: "testuser".into(),
            email: "test@test.com".into(),
            password: "HASHED_PASSWORD".into(),
            image_url: "/static/images/default-pic.png".into(),
            header_image_url: "/static/images/warbler-hero.jpg".into(),
            bio: None,
            location: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn anonymous_is_unauthenticated() {
        assert_eq!(require_login(None), Err(Denied::Unauthenticated));
        assert_eq!(require_owner(None, Uuid::new_v4()), Err(Denied::Unauthenticated));
    }

    #[test]
    fn owner_check_compares_ids() {
        let user = sample_user();
        assert_eq!(require_owner(Some(&user), user.id), Ok(&user));
        assert_eq!(require_owner(Some(&user), Uuid::new_v4()), Err(Denied::NotOwner));
    }

    #[test]
    fn session_round_trips_through_signature() {
        let keys = SessionKeys::new(b"test-secret", Duration::hours(1));
        let id = Uuid::new_v4();
        let claims = SessionClaims {
            curr_user: Some(id),
            flashes: vec![Flash::new(FlashLevel::Success, "Hello, testuser!")],
            exp: 0,
        };

        let token = keys.encode(&claims).unwrap();
        let decoded = keys.decode(&token).unwrap();
        assert_eq!(decoded.curr_user, Some(id));
        assert_eq!(decoded.flashes, claims.flashes);
        assert!(decoded.exp > 0);
    }

    #[test]
    fn foreign_or_expired_session_is_rejected() {
        let keys = SessionKeys::new(b"test-secret", Duration::hours(1));
        let other = SessionKeys::new(b"other-secret", Duration::hours(1));
        let claims = SessionClaims {
            curr_user: Some(Uuid::new_v4()),
            ..Default::default()
        };

        let token = other.encode(&claims).unwrap();
        assert!(keys.decode(&token).is_none());

        let stale = SessionKeys::new(b"test-secret", Duration::hours(-2));
        let token = stale.encode(&claims).unwrap();
        assert!(keys.decode(&token).is_none());

        assert!(keys.decode("not-a-jwt").is_none());
    }

    #[test]
    fn logout_only_dirties_a_logged_in_session() {
        let keys = SessionKeys::new(b"test-secret", Duration::hours(1));
        let mut session = Session::new(SessionClaims::default(), keys.clone());
        session.logout();
        assert!(!session.dirty);

        session.login(Uuid::new_v4());
        assert!(session.dirty);
        session.logout();
        assert_eq!(session.user_id(), None);
    }
}
