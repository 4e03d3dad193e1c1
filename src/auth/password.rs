//! bcrypt hashing, run off the async executor.

use tokio::task::spawn_blocking;

use crate::error::{AppError, AppResult};

pub async fn hash(password: String, cost: u32) -> AppResult<String> {
    spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("hash task failed: {}", e)))?
        .map_err(AppError::from)
}

/// Check `password` against a stored hash. A malformed stored hash counts as a mismatch.
pub async fn verify(password: String, password_hash: String) -> AppResult<bool> {
    let matched = spawn_blocking(move || bcrypt::verify(password, &password_hash))
        .await
        .map_err(|e| AppError::Internal(format!("verify task failed: {}", e)))?;

    match matched {
        Ok(matched) => Ok(matched),
        Err(e) => {
            tracing::warn!("Stored password hash could not be verified: {}", e);
            Ok(false)
        }
    }
}
