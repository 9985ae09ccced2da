#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Duration;
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use warbler_db::Database;
use warbler_db::models::{MessageRow, NewUser, UserRow};
use warbler_types::session::SessionClaims;
use warbler_web::session::{SESSION_COOKIE, SessionKeys};
use warbler_web::{AppState, AppStateInner, router};

pub struct TestApp {
    pub state: AppState,
    keys: SessionKeys,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let keys = SessionKeys::new(b"test-secret", Duration::hours(1));
        let db = Database::open_in_memory().unwrap();
        let state = AppStateInner::new(db, keys.clone()).unwrap();
        Self {
            router: router(state.clone()),
            state,
            keys,
        }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// A user with an unusable password, for tests that forge the session.
    pub fn user(&self, username: &str) -> UserRow {
        self.db()
            .create_user(&NewUser {
                username,
                email: &format!("{username}@test.com"),
                password_hash: "HASHED_PASSWORD",
                image_url: None,
            })
            .unwrap()
    }

    pub fn message(&self, user: &UserRow, text: &str) -> MessageRow {
        self.db().insert_message(user.id, text).unwrap()
    }

    pub fn anonymous(&self) -> Client<'_> {
        Client {
            app: self,
            cookie: None,
        }
    }

    /// A client whose session already names `user_id`, like setting the
    /// current-user key directly in the session store.
    pub fn logged_in_as(&self, user_id: Uuid) -> Client<'_> {
        let claims = SessionClaims {
            curr_user: Some(user_id),
            ..Default::default()
        };
        let token = self.keys.encode(&claims).unwrap();
        Client {
            app: self,
            cookie: Some(format!("{SESSION_COOKIE}={token}")),
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl TestResponse {
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }
}

/// Carries the session cookie from response to request, like a browser.
pub struct Client<'a> {
    app: &'a TestApp,
    cookie: Option<String>,
}

impl Client<'_> {
    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Request::get(uri), Body::empty()).await
    }

    pub async fn post(&mut self, uri: &str, form: &str) -> TestResponse {
        let builder = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(builder, Body::from(form.to_string())).await
    }

    pub async fn get_following(&mut self, uri: &str) -> TestResponse {
        let resp = self.get(uri).await;
        self.follow_redirects(resp).await
    }

    pub async fn post_following(&mut self, uri: &str, form: &str) -> TestResponse {
        let resp = self.post(uri, form).await;
        self.follow_redirects(resp).await
    }

    pub async fn follow_redirects(&mut self, mut resp: TestResponse) -> TestResponse {
        for _ in 0..5 {
            if !resp.is_redirect() {
                return resp;
            }
            let location = resp.location.clone().expect("redirect without Location");
            resp = self.get(&location).await;
        }
        panic!("too many redirects");
    }

    async fn send(&mut self, mut builder: axum::http::request::Builder, body: Body) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let resp = self
            .app
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        for value in resp.headers().get_all(header::SET_COOKIE) {
            let value = value.to_str().unwrap();
            if let Some(pair) = value.split(';').next() {
                if pair.starts_with(&format!("{SESSION_COOKIE}=")) {
                    self.cookie = Some(pair.to_string());
                }
            }
        }

        let status = resp.status();
        let location = resp
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();

        TestResponse {
            status,
            location,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }
}
