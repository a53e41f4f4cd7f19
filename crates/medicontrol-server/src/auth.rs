//! Password login and bearer-token verification.
//!
//! One operator account is configured with an argon2 PHC hash. A successful
//! login yields an HS256 JWT whose subject is the username; every other API
//! call presents it as `Authorization: Bearer <token>`.

use argon2::{
  Argon2,
  PasswordHash,
  PasswordHasher,
  PasswordVerifier,
  password_hash::SaltString,
};
use axum::http::{HeaderMap, header};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::Error;

// ─── Credentials ─────────────────────────────────────────────────────────────

/// Credentials accepted as valid for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`. Without one,
  /// every login is refused.
  pub password_hash: Option<String>,
}

impl AuthConfig {
  pub fn verify(&self, username: &str, password: &str) -> Result<(), Error> {
    let hash = self
      .password_hash
      .as_deref()
      .ok_or(Error::InvalidCredentials)?;
    if username != self.username {
      return Err(Error::InvalidCredentials);
    }
    let parsed = PasswordHash::new(hash).map_err(|_| Error::InvalidCredentials)?;
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .map_err(|_| Error::InvalidCredentials)
  }
}

/// Hash `password` into an argon2 PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Hash(e.to_string()))
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  /// The authenticated username.
  pub sub: String,
  pub iat: i64,
  pub exp: i64,
}

/// Signs and verifies session tokens with a shared HMAC secret.
pub struct TokenIssuer {
  secret: Vec<u8>,
  ttl:    Duration,
}

impl TokenIssuer {
  pub fn new(secret: impl AsRef<[u8]>, ttl_hours: i64) -> Self {
    Self { secret: secret.as_ref().to_vec(), ttl: Duration::hours(ttl_hours) }
  }

  /// An issuer with a random per-process secret. Tokens do not survive a
  /// restart.
  pub fn random(ttl_hours: i64) -> Self {
    let mut secret = [0u8; 32];
    OsRng.fill_bytes(&mut secret);
    Self::new(secret, ttl_hours)
  }

  pub fn issue(&self, subject: &str) -> Result<String, Error> {
    let now = Utc::now();
    let claims = Claims {
      sub: subject.to_owned(),
      iat: now.timestamp(),
      exp: (now + self.ttl).timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
      .map_err(Error::Issue)
  }

  pub fn verify(&self, token: &str) -> Result<Claims, Error> {
    decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &Validation::default())
      .map(|data| data.claims)
      .map_err(Error::InvalidToken)
  }
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, Error> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or(Error::MissingToken)
}
