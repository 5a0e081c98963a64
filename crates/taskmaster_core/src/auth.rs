//! Explicit current-user state.
//!
//! The auth provider itself is external; this type only records who is
//! signed in so sync sessions can be started and ended around it.

use crate::model::user::AuthUser;
use log::info;

/// Holder for the current session user.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    user: Option<AuthUser>,
}

impl AuthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// Records `user` as current and returns the previous user, if any.
    pub fn sign_in(&mut self, user: AuthUser) -> Option<AuthUser> {
        info!("event=auth_sign_in module=auth status=ok user_id={}", user.id);
        self.user.replace(user)
    }

    /// Clears the current user and returns it.
    pub fn sign_out(&mut self) -> Option<AuthUser> {
        let previous = self.user.take();
        if let Some(user) = &previous {
            info!("event=auth_sign_out module=auth status=ok user_id={}", user.id);
        }
        previous
    }
}
