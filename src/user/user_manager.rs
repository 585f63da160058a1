//! Account and session orchestration on top of the user store.

use super::auth::{AuthToken, AuthTokenValue, CredentialsHasher, PasswordCredentials};
use super::role::UserRole;
use super::user_store::{UserAccount, UserStore};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::broadcast;

/// Session-change notification. One channel per manager; anything that
/// needs to react to identity changes subscribes here instead of holding
/// ambient auth state.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    SignedUp { user_id: usize },
    SignedIn { user_id: usize },
    SignedOut { user_id: usize },
}

/// The identity attached to a validated session token.
#[derive(Clone, Debug, Serialize)]
pub struct SessionInfo {
    pub user_id: usize,
    pub email: String,
    pub display_name: Option<String>,
    pub role: UserRole,
}

const SESSION_EVENTS_CAPACITY: usize = 64;

pub struct UserManager {
    user_store: Arc<dyn UserStore>,
    session_events: broadcast::Sender<SessionEvent>,
}

impl UserManager {
    pub fn new(user_store: Arc<dyn UserStore>) -> Self {
        let (session_events, _) = broadcast::channel(SESSION_EVENTS_CAPACITY);
        Self {
            user_store,
            session_events,
        }
    }

    /// The single subscription point for session-change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session_events.subscribe()
    }

    fn notify(&self, event: SessionEvent) {
        // nobody listening is fine
        let _ = self.session_events.send(event);
    }

    fn create_hashed_password(user_id: usize, password: &str) -> Result<PasswordCredentials> {
        let hasher = CredentialsHasher::Argon2;
        let salt = hasher.generate_b64_salt();
        let hash = hasher.hash(password.as_bytes(), &salt)?;
        Ok(PasswordCredentials {
            user_id,
            salt,
            hash,
            hasher,
            created: SystemTime::now(),
            last_used: None,
        })
    }

    /// Registers a new account with password credentials.
    pub fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
        role: UserRole,
    ) -> Result<usize> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            bail!("A valid email address is required.");
        }
        if password.is_empty() {
            bail!("The password cannot be empty.");
        }
        if self.user_store.get_user_by_email(email)?.is_some() {
            bail!("An account with email {} already exists.", email);
        }

        let user_id = self.user_store.create_user(email, display_name, role)?;
        self.user_store
            .set_password_credentials(Self::create_hashed_password(user_id, password)?)?;

        self.notify(SessionEvent::SignedUp { user_id });
        Ok(user_id)
    }

    /// Verifies the credentials and mints a session token.
    /// Returns Ok(None) when the email is unknown or the password wrong.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<Option<AuthToken>> {
        let credentials = match self.user_store.get_password_credentials(email.trim())? {
            Some(credentials) => credentials,
            None => return Ok(None),
        };

        if !credentials.hasher.verify(password, &credentials.hash)? {
            return Ok(None);
        }

        let token = AuthToken {
            user_id: credentials.user_id,
            created: SystemTime::now(),
            last_used: None,
            value: AuthTokenValue::generate(),
        };
        self.user_store.add_auth_token(token.clone())?;

        self.notify(SessionEvent::SignedIn {
            user_id: token.user_id,
        });
        Ok(Some(token))
    }

    /// Invalidates a session token.
    pub fn sign_out(&self, token: &AuthTokenValue) -> Result<()> {
        match self.user_store.delete_auth_token(token)? {
            Some(deleted) => {
                self.notify(SessionEvent::SignedOut {
                    user_id: deleted.user_id,
                });
                Ok(())
            }
            None => bail!("Unknown session token."),
        }
    }

    /// Resolves a token to the account behind it, Ok(None) for unknown
    /// tokens.
    pub fn session(&self, token: &AuthTokenValue) -> Result<Option<SessionInfo>> {
        let auth_token = match self.user_store.get_auth_token(token)? {
            Some(auth_token) => auth_token,
            None => return Ok(None),
        };

        let user = self
            .user_store
            .get_user(auth_token.user_id)?
            .with_context(|| format!("Token owner {} no longer exists", auth_token.user_id))?;

        Ok(Some(SessionInfo {
            user_id: user.id,
            email: user.email,
            display_name: user.display_name,
            role: user.role,
        }))
    }

    /// Stamps the token's last-used time; failures here are not fatal to
    /// the request being authenticated.
    pub fn touch_token(&self, token: &AuthTokenValue) -> Result<()> {
        self.user_store.update_auth_token_last_used(token)
    }

    pub fn is_admin(&self, user_id: usize) -> Result<bool> {
        Ok(self
            .user_store
            .get_user(user_id)?
            .map(|user| user.role.is_admin())
            .unwrap_or(false))
    }

    pub fn get_user(&self, user_id: usize) -> Result<Option<UserAccount>> {
        self.user_store.get_user(user_id)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserAccount>> {
        self.user_store.get_user_by_email(email)
    }

    pub fn list_users(&self) -> Result<Vec<UserAccount>> {
        self.user_store.list_users()
    }

    pub fn set_role(&self, email: &str, role: UserRole) -> Result<()> {
        let user = self
            .user_store
            .get_user_by_email(email)?
            .with_context(|| format!("User with email {} not found.", email))?;
        self.user_store.set_user_role(user.id, role)
    }

    pub fn set_password(&self, email: &str, password: &str) -> Result<()> {
        if password.is_empty() {
            bail!("The password cannot be empty.");
        }
        let user = self
            .user_store
            .get_user_by_email(email)?
            .with_context(|| format!("User with email {} not found.", email))?;
        self.user_store
            .set_password_credentials(Self::create_hashed_password(user.id, password)?)
    }

    /// Checks a password without creating a token or mutating anything.
    pub fn check_password(&self, email: &str, password: &str) -> Result<bool> {
        match self.user_store.get_password_credentials(email)? {
            Some(credentials) => credentials.hasher.verify(password, &credentials.hash),
            None => Ok(false),
        }
    }

    pub fn get_user_tokens(&self, email: &str) -> Result<Vec<AuthToken>> {
        let user = self
            .user_store
            .get_user_by_email(email)?
            .with_context(|| format!("User with email {} not found.", email))?;
        self.user_store.get_user_auth_tokens(user.id)
    }

    pub fn prune_unused_tokens(&self, unused_for_days: u64) -> Result<usize> {
        self.user_store.prune_unused_auth_tokens(unused_for_days)
    }
}
