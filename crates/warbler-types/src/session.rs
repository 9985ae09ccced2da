use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Key under which the logged-in user's id is stored in the session.
pub const CURR_USER_KEY: &str = "curr_user";

/// Claims carried by the signed session cookie.
///
/// Shared between warbler-web (which encodes and decodes the cookie) and the
/// integration tests (which forge sessions for a given user).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(rename = "curr_user", default, skip_serializing_if = "Option::is_none")]
    pub curr_user: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flashes: Vec<Flash>,
    pub exp: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Danger,
}

/// A one-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}
