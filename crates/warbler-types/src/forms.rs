//! Form payloads posted by the HTML pages.
//!
//! None of these deny unknown fields: a browser (or a hostile client) may post
//! extra inputs such as `user_id`, and those are dropped on the floor.

use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

pub const MESSAGE_MAX_LEN: u64 = 140;

// -- Auth --

#[derive(Debug, Default, Deserialize, Validate)]
pub struct SignupForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 30, message = "Username must be 1-30 characters"))]
    pub username: String,

    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(custom(function = "self::image_url", message = "Image URL must be a valid URL"))]
    pub image_url: Option<String>,
}

impl SignupForm {
    /// Treat blank optional inputs as absent.
    pub fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_string();
        self.image_url = blank_to_none(self.image_url);
        self
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl LoginForm {
    /// Usernames are stored trimmed, so match them the same way.
    pub fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self
    }
}

// -- Messages --

#[derive(Debug, Default, Deserialize, Validate)]
pub struct MessageForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 140, message = "Message must be 1-140 characters"))]
    pub text: String,
}

// -- Users --

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ProfileForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 30, message = "Username must be 1-30 characters"))]
    pub username: String,

    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(custom(function = "self::image_url", message = "Image URL must be a valid URL"))]
    pub image_url: Option<String>,

    #[validate(custom(function = "self::image_url", message = "Header image URL must be a valid URL"))]
    pub header_image_url: Option<String>,

    #[validate(length(max = 500, message = "Bio must be less than 500 characters"))]
    pub bio: Option<String>,

    #[validate(length(max = 100, message = "Location must be less than 100 characters"))]
    pub location: Option<String>,

    /// Current password, re-checked before any change is saved.
    #[serde(default)]
    pub password: String,
}

impl ProfileForm {
    pub fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_string();
        self.image_url = blank_to_none(self.image_url);
        self.header_image_url = blank_to_none(self.header_image_url);
        self.bio = blank_to_none(self.bio);
        self.location = blank_to_none(self.location);
        self
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserSearch {
    pub q: Option<String>,
}

impl UserSearch {
    pub fn term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// An http(s) URL, or a path on this site like the default pictures.
fn image_url(value: &str) -> Result<(), ValidationError> {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .or_else(|| value.strip_prefix('/'));
    match rest {
        Some(rest) if !rest.is_empty() && !rest.contains(char::is_whitespace) => Ok(()),
        _ => Err(ValidationError::new("image_url")),
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Flatten validation errors into user-facing lines, in a stable order.
pub fn error_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("Invalid {}", field),
            })
        })
        .collect();
    messages.sort();
    messages
}
