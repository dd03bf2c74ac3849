//! Authenticated identity of the local user.

use std::fmt;

use crate::channel::UserId;

/// Credentials and identity the engine runs as.
///
/// Populated before the engine starts and dropped wholesale on logout. The
/// engine only reads it.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Local user ID.
    pub user_id: UserId,
    /// Local username.
    pub username: String,
    /// Bearer token for REST and transport authentication.
    pub token: String,
}

impl AuthContext {
    /// Create an auth context.
    pub fn new(user_id: UserId, username: impl Into<String>, token: impl Into<String>) -> Self {
        Self { user_id, username: username.into(), token: token.into() }
    }

    /// Value for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}
