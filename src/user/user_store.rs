use super::auth::{AuthToken, AuthTokenValue, PasswordCredentials};
use super::role::UserRole;
use anyhow::Result;
use serde::Serialize;

/// A user account row.
#[derive(Clone, Debug, Serialize)]
pub struct UserAccount {
    pub id: usize,
    pub email: String,
    pub display_name: Option<String>,
    pub role: UserRole,
    pub created: i64,
}

pub trait UserCredentialsStore: Send + Sync {
    /// Returns the password credentials for the given email.
    /// Returns Ok(None) if the user does not exist or has no password set.
    fn get_password_credentials(&self, email: &str) -> Result<Option<PasswordCredentials>>;

    /// Inserts or replaces the user's password credentials.
    fn set_password_credentials(&self, credentials: PasswordCredentials) -> Result<()>;
}

pub trait UserTokenStore: Send + Sync {
    /// Returns the auth token for the given value, Ok(None) if unknown.
    fn get_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Adds a new auth token.
    fn add_auth_token(&self, token: AuthToken) -> Result<()>;

    /// Deletes an auth token, returning it, or Ok(None) if unknown.
    fn delete_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Stamps the token with the current time.
    fn update_auth_token_last_used(&self, token: &AuthTokenValue) -> Result<()>;

    /// All auth tokens belonging to a user.
    fn get_user_auth_tokens(&self, user_id: usize) -> Result<Vec<AuthToken>>;

    /// Deletes tokens that haven't been used for the given number of days.
    /// Returns how many were deleted.
    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize>;
}

pub trait UserStore: UserCredentialsStore + UserTokenStore + Send + Sync {
    /// Creates a user and returns the generated user id.
    fn create_user(
        &self,
        email: &str,
        display_name: Option<&str>,
        role: UserRole,
    ) -> Result<usize>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: usize) -> Result<Option<UserAccount>>;

    /// Returns Ok(None) if no account uses this email.
    fn get_user_by_email(&self, email: &str) -> Result<Option<UserAccount>>;

    /// All accounts, ordered by email.
    fn list_users(&self) -> Result<Vec<UserAccount>>;

    fn set_user_role(&self, user_id: usize, role: UserRole) -> Result<()>;
}
