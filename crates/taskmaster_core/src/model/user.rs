//! Authenticated user projection.
//!
//! Mirrors the fields the auth provider exposes for the current session.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Owner reference carried by every task/note row.
pub type UserId = Uuid;

/// Current session user as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
    /// Account creation time in epoch milliseconds.
    pub created_at: i64,
    /// Email verification time in epoch milliseconds, if verified.
    pub email_confirmed_at: Option<i64>,
}

impl AuthUser {
    pub fn new(id: UserId, email: impl Into<String>, created_at: i64) -> Self {
        Self {
            id,
            email: email.into(),
            created_at,
            email_confirmed_at: None,
        }
    }

    pub fn is_email_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_confirmed_once_verification_time_is_set() {
        let mut user = AuthUser::new(Uuid::new_v4(), "pat@example.com", 1_000);
        assert!(!user.is_email_confirmed());

        user.email_confirmed_at = Some(2_000);
        assert!(user.is_email_confirmed());
    }
}
