use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use crate::auth::session;
use crate::db::models::{User, DEFAULT_AVATAR};
use crate::error::AppError;
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub image_file: String,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            image_file: user.image_file,
        }
    }
}

impl CurrentUser {
    pub fn avatar_url(&self) -> String {
        crate::db::models::avatar_url(&self.image_file)
    }

    pub fn has_custom_avatar(&self) -> bool {
        self.image_file != DEFAULT_AVATAR
    }
}

/// Extractor that requires authentication.
/// Without a valid session the request is redirected to the login page,
/// remembering where it was going.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match lookup(parts, state)? {
            Some(user) => Ok(user),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| "/".to_string());
                Err(AppError::LoginRequired {
                    next,
                    jar: CookieJar::from_headers(&parts.headers),
                })
            }
        }
    }
}

/// Optional user extractor: `None` instead of a login redirect.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(lookup(parts, state)?))
    }
}

fn lookup(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, AppError> {
    let jar = CookieJar::from_headers(&parts.headers);
    let Some(cookie) = jar.get(&state.config.auth.cookie_name) else {
        return Ok(None);
    };

    let conn = state.db.get()?;
    let user = session::user_for_token(&conn, cookie.value())?;
    Ok(user.map(CurrentUser::from))
}
