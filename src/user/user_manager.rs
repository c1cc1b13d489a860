use super::{
    auth::{AuthError, HashedPassword},
    permissions::{Permission, UserRole},
    tokens::{Claims, TokenIssuer, TokenPair, TokenType},
    user_models::{RegisterRequest, User, UserUpdate},
    UserStore,
};
use crate::sqlite_persistence::now_secs;
use crate::validation::{is_valid_email, FieldErrors, MAX_NAME_LEN, MIN_PASSWORD_LEN};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// The caller identity resolved from a valid access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: usize,
    pub permissions: &'static [Permission],
}

pub struct UserManager {
    user_store: Arc<dyn UserStore>,
    tokens: TokenIssuer,
}

impl UserManager {
    pub fn new(user_store: Arc<dyn UserStore>, tokens: TokenIssuer) -> Self {
        Self { user_store, tokens }
    }

    pub fn token_issuer(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Validates and stores a new account, returning it with a fresh token pair.
    pub fn register(&self, request: RegisterRequest) -> Result<(User, TokenPair)> {
        let mut errors = FieldErrors::new();
        errors.require_text("username", request.username.as_deref(), MAX_NAME_LEN);
        errors.require_text("email", request.email.as_deref(), usize::MAX);
        errors.optional_text("nombre", request.display_name.as_deref(), MAX_NAME_LEN);
        match request.password.as_deref() {
            None | Some("") => errors.add("password", "Este campo es requerido."),
            Some(p) if p.chars().count() < MIN_PASSWORD_LEN => errors.add(
                "password",
                format!(
                    "La contraseña debe tener al menos {} caracteres.",
                    MIN_PASSWORD_LEN
                ),
            ),
            Some(_) => {}
        }

        let username = request.username.as_deref().unwrap_or_default().trim();
        let email = request.email.as_deref().unwrap_or_default().trim();
        self.check_identity_available(&mut errors, Some(username), Some(email), None)?;
        errors.into_result().map_err(AuthError::Invalid)?;

        let display_name = request
            .display_name
            .as_deref()
            .map(str::trim)
            .unwrap_or(username);
        let password = HashedPassword::new(request.password.as_deref().unwrap_or_default())?;
        let user_id = self
            .user_store
            .create_user(username, email, display_name, &password)?;
        info!("Registered user {} ({})", username, user_id);

        let user = self.require_user(user_id)?;
        let tokens = self.tokens.issue_pair(user_id)?;
        Ok((user, tokens))
    }

    pub fn login(&self, email: &str, password: &str) -> Result<(User, TokenPair)> {
        let user = self
            .user_store
            .get_user_by_email(email.trim())?
            .ok_or(AuthError::InvalidCredentials)?;
        let credentials = self
            .user_store
            .get_password_credentials(user.user_id)?
            .ok_or(AuthError::InvalidCredentials)?;
        if !credentials.matches(password)? {
            debug!("Wrong password for user {}", user.user_id);
            return Err(AuthError::InvalidCredentials.into());
        }
        if !user.is_active {
            return Err(AuthError::AccountDisabled.into());
        }

        let tokens = self.tokens.issue_pair(user.user_id)?;
        Ok((user, tokens))
    }

    /// Exchanges a refresh token for a new pair, blacklisting the old refresh token.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.verify_refresh(refresh_token)?;
        let user = self
            .user_store
            .get_user(claims.user_id)?
            .ok_or(AuthError::InvalidToken)?;
        if !user.is_active {
            return Err(AuthError::AccountDisabled.into());
        }

        // A concurrent refresh with the same token loses here.
        if !self
            .user_store
            .blacklist_token(&claims.jti, claims.user_id, claims.exp)?
        {
            return Err(AuthError::InvalidToken.into());
        }
        self.tokens.issue_pair(user.user_id)
    }

    /// Blacklists the caller's refresh token.
    pub fn logout(&self, user_id: usize, refresh_token: &str) -> Result<()> {
        let claims = self.verify_refresh(refresh_token)?;
        if claims.user_id != user_id {
            return Err(AuthError::InvalidToken.into());
        }
        self.user_store
            .blacklist_token(&claims.jti, claims.user_id, claims.exp)?;
        info!("User {} logged out", user_id);
        Ok(())
    }

    fn verify_refresh(&self, refresh_token: &str) -> Result<Claims> {
        let claims = self.tokens.verify(refresh_token, TokenType::Refresh)?;
        if self.user_store.is_token_blacklisted(&claims.jti)? {
            debug!("Refresh token {} is blacklisted", claims.jti);
            return Err(AuthError::InvalidToken.into());
        }
        Ok(claims)
    }

    /// Resolves an access token to an active user.
    pub fn authenticate(&self, access_token: &str) -> Result<AuthenticatedUser> {
        let claims = self.tokens.verify(access_token, TokenType::Access)?;
        let user = self
            .user_store
            .get_user(claims.user_id)?
            .ok_or(AuthError::InvalidToken)?;
        if !user.is_active {
            return Err(AuthError::AccountDisabled.into());
        }
        Ok(AuthenticatedUser {
            user_id: user.user_id,
            permissions: user.role().permissions(),
        })
    }

    pub fn get_user(&self, user_id: usize) -> Result<Option<User>> {
        self.user_store.get_user(user_id)
    }

    pub fn require_user(&self, user_id: usize) -> Result<User> {
        Ok(self
            .user_store
            .get_user(user_id)?
            .ok_or(AuthError::UserNotFound)?)
    }

    pub fn update_info(&self, user_id: usize, update: UserUpdate) -> Result<User> {
        let update = UserUpdate {
            username: update.username.map(|s| s.trim().to_string()),
            email: update.email.map(|s| s.trim().to_string()),
            display_name: update.display_name.map(|s| s.trim().to_string()),
        };

        let mut errors = FieldErrors::new();
        errors.optional_text("username", update.username.as_deref(), MAX_NAME_LEN);
        errors.optional_text("email", update.email.as_deref(), usize::MAX);
        errors.optional_text("nombre", update.display_name.as_deref(), MAX_NAME_LEN);
        self.check_identity_available(
            &mut errors,
            update.username.as_deref(),
            update.email.as_deref(),
            Some(user_id),
        )?;
        errors.into_result().map_err(AuthError::Invalid)?;

        if !update.is_empty() {
            self.user_store.update_user(user_id, &update)?;
        }
        self.require_user(user_id)
    }

    /// Records "already taken" and malformed-email errors for the given identity fields.
    fn check_identity_available(
        &self,
        errors: &mut FieldErrors,
        username: Option<&str>,
        email: Option<&str>,
        current_user: Option<usize>,
    ) -> Result<()> {
        if let Some(username) = username.filter(|u| !u.is_empty()) {
            if let Some(owner) = self.user_store.get_user_id_by_username(username)? {
                if Some(owner) != current_user {
                    errors.add("username", "Ya existe un usuario con este nombre de usuario.");
                }
            }
        }
        if let Some(email) = email.filter(|e| !e.is_empty()) {
            if !is_valid_email(email) {
                errors.add("email", "Introduzca una dirección de correo electrónico válida.");
            } else if let Some(owner) = self.user_store.get_user_by_email(email)? {
                if Some(owner.user_id) != current_user {
                    errors.add("email", "Ya existe un usuario con este email.");
                }
            }
        }
        Ok(())
    }

    /// Grants admin rights to the user with the given email, returning its id.
    pub fn promote_admin(&self, email: &str) -> Result<usize> {
        let user = self
            .user_store
            .get_user_by_email(email)?
            .with_context(|| format!("No user with email {}", email))?;
        self.user_store.set_user_admin(user.user_id, true)?;
        info!("Promoted user {} to {}", user.user_id, UserRole::Admin.as_str());
        Ok(user.user_id)
    }

    pub fn count_users(&self) -> Result<usize> {
        self.user_store.count_users()
    }

    pub fn prune_token_blacklist(&self) -> Result<usize> {
        self.user_store.prune_expired_blacklist(now_secs())
    }
}
