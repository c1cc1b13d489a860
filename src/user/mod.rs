pub mod auth;
pub mod permissions;
mod sqlite_user_store;
pub mod tokens;
mod user_manager;
pub mod user_models;
mod user_store;

pub use auth::{AuthError, HashedPassword, PasswordHasher};
pub use permissions::{Permission, UserRole};
pub use sqlite_user_store::SqliteUserStore;
pub use tokens::{Claims, TokenIssuer, TokenPair, TokenType};
pub use user_manager::{AuthenticatedUser, UserManager};
pub use user_models::{RegisterRequest, User, UserDisplayName, UserUpdate};
pub use user_store::{TokenBlacklistStore, UserCredentialsStore, UserStore};
