//! Подпись запросов к Kling
//!
//! Каждый запрос несет короткоживущий HS256 JWT, выпущенный из пары
//! access/secret ключей.

use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::config::KlingConfig;
use crate::error::{DubError, Result};

/// Время жизни токена в секундах
pub const TOKEN_TTL_SECS: i64 = 1800;
/// Запас на расхождение часов
pub const NOT_BEFORE_SKEW_SECS: i64 = 5;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct KlingClaims {
    /// Access key
    pub iss: String,
    pub exp: i64,
    pub nbf: i64,
}

#[derive(Clone)]
pub struct KlingCredentials {
    access_key: String,
    secret_key: String,
}

impl std::fmt::Debug for KlingCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KlingCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .finish()
    }
}

impl KlingCredentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn from_config(config: &KlingConfig) -> Self {
        Self::new(config.access_key.clone(), config.secret_key.clone())
    }

    pub fn is_configured(&self) -> bool {
        !self.access_key.is_empty() && !self.secret_key.is_empty()
    }

    pub fn claims_at(&self, now: i64) -> KlingClaims {
        KlingClaims {
            iss: self.access_key.clone(),
            exp: now + TOKEN_TTL_SECS,
            nbf: now - NOT_BEFORE_SKEW_SECS,
        }
    }

    /// Выпустить токен для заголовка `Authorization: Bearer`
    pub fn generate_token(&self) -> Result<String> {
        if !self.is_configured() {
            return Err(DubError::Configuration(
                "KLING_ACCESS_KEY and KLING_SECRET_KEY are required".to_string(),
            ));
        }
        let claims = self.claims_at(chrono::Utc::now().timestamp());
        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret_key.as_bytes()),
        )?)
    }
}
