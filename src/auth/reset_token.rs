//! Signed, time-limited password reset tokens.
//!
//! A token is an HS256 JWT whose only payload field is the user id; `iat`
//! and `exp` bound its lifetime.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct ResetClaims {
    user_id: i64,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct ResetTokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl ResetTokenCodec {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    pub fn generate(&self, user_id: i64) -> jsonwebtoken::errors::Result<String> {
        self.generate_at(user_id, Utc::now().timestamp())
    }

    /// Issue a token as if it had been created at `issued_at` (unix seconds).
    pub fn generate_at(
        &self,
        user_id: i64,
        issued_at: i64,
    ) -> jsonwebtoken::errors::Result<String> {
        let claims = ResetClaims {
            user_id,
            iat: issued_at,
            exp: issued_at + self.ttl_secs as i64,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// The embedded user id, or `None` for tampered, foreign or expired tokens.
    pub fn verify(&self, token: &str) -> Option<i64> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        match jsonwebtoken::decode::<ResetClaims>(token.trim(), &self.decoding, &validation) {
            Ok(data) => Some(data.claims.user_id),
            Err(error) => {
                match error.kind() {
                    ErrorKind::ExpiredSignature => tracing::info!("Expired reset token presented"),
                    _ => tracing::warn!("Rejected reset token: {}", error),
                }
                None
            }
        }
    }
}
