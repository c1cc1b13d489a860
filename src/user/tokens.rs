//! Signed access/refresh token pairs

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::auth::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: usize,
    pub token_type: TokenType,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], access_lifetime: Duration, refresh_lifetime: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_lifetime,
            refresh_lifetime,
        }
    }

    pub fn access_lifetime(&self) -> Duration {
        self.access_lifetime
    }

    fn issue(&self, user_id: usize, token_type: TokenType) -> Result<String> {
        let now = Utc::now();
        let lifetime = match token_type {
            TokenType::Access => self.access_lifetime,
            TokenType::Refresh => self.refresh_lifetime,
        };
        let claims = Claims {
            user_id,
            token_type,
            jti: uuid::Uuid::new_v4().simple().to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .with_context(|| format!("Failed to sign {:?} token", token_type))
    }

    pub fn issue_pair(&self, user_id: usize) -> Result<TokenPair> {
        Ok(TokenPair {
            access: self.issue(user_id, TokenType::Access)?,
            refresh: self.issue(user_id, TokenType::Refresh)?,
        })
    }

    /// Verifies signature, expiry and token type.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| AuthError::InvalidToken)?
            .claims;
        if claims.token_type != expected {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }
}
