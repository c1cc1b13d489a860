//! User data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::permissions::UserRole;

/// A registered account, as exposed to API clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub user_id: usize,
    pub username: String,
    pub email: String,
    #[serde(rename = "nombre")]
    pub display_name: String,
    #[serde(skip)]
    pub is_active: bool,
    #[serde(skip)]
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> UserRole {
        if self.is_admin {
            UserRole::Admin
        } else {
            UserRole::Regular
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "nombre")]
    pub display_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "nombre")]
    pub display_name: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.display_name.is_none()
    }
}

/// The public projection returned by `usuarios/{id}/nombre`.
#[derive(Debug, Clone, Serialize)]
pub struct UserDisplayName {
    pub user_id: usize,
    pub nombre: String,
}
