use super::auth::HashedPassword;
use super::user_models::{User, UserUpdate};
use anyhow::Result;

pub trait UserCredentialsStore: Send + Sync {
    /// Returns the stored password hash of a user.
    /// Returns Ok(None) if the user does not exist.
    /// Returns Err if there is a database error.
    fn get_password_credentials(&self, user_id: usize) -> Result<Option<HashedPassword>>;

    /// Replaces the stored password hash of a user.
    fn set_password_credentials(&self, user_id: usize, password: &HashedPassword) -> Result<()>;
}

pub trait TokenBlacklistStore: Send + Sync {
    /// Blacklists a refresh token id until `expires_at` (unix seconds).
    /// Returns Ok(false) if the token id was already blacklisted.
    fn blacklist_token(&self, jti: &str, user_id: usize, expires_at: i64) -> Result<bool>;

    /// Returns whether the token id is blacklisted.
    fn is_token_blacklisted(&self, jti: &str) -> Result<bool>;

    /// Deletes blacklist entries whose token expired before `now`.
    /// Returns the number of entries that were deleted.
    fn prune_expired_blacklist(&self, now: i64) -> Result<usize>;
}

pub trait UserStore: UserCredentialsStore + TokenBlacklistStore + Send + Sync {
    /// Creates a new user with its password credentials and returns the user id.
    fn create_user(
        &self,
        username: &str,
        email: &str,
        display_name: &str,
        password: &HashedPassword,
    ) -> Result<usize>;

    /// Returns the user with the given id.
    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: usize) -> Result<Option<User>>;

    /// Returns the user with the given email.
    /// Returns Ok(None) if no user has that email.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Returns the id of the user with the given username.
    /// Returns Ok(None) if no user has that username.
    fn get_user_id_by_username(&self, username: &str) -> Result<Option<usize>>;

    /// Applies the present fields of `update` and bumps `updated_at`.
    fn update_user(&self, user_id: usize, update: &UserUpdate) -> Result<()>;

    fn set_user_active(&self, user_id: usize, active: bool) -> Result<()>;

    fn set_user_admin(&self, user_id: usize, admin: bool) -> Result<()>;

    /// Returns the number of registered users.
    fn count_users(&self) -> Result<usize>;
}
