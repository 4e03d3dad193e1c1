use askama::Template;
use axum::extract::multipart::MultipartError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;

use crate::flash::{self, Level};

#[derive(Template)]
#[template(path = "pages/error.html")]
struct ErrorTemplate {
    status: u16,
    reason: String,
    message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    /// A protected page was requested without a session; `next` is the path to resume.
    /// `jar` is the request's cookies, so notices already queued are kept.
    #[error("Login required")]
    LoginRequired { next: String, jar: CookieJar },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::LoginRequired { .. } => StatusCode::SEE_OTHER,
            AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = match self {
            AppError::LoginRequired { next, jar } => {
                let jar = flash::push(jar, Level::Info, "Please log in to access this page.");
                return (jar, Redirect::to(&login_url(&next))).into_response();
            }
            other => other,
        };

        let message = match &err {
            AppError::NotFound => "That page does not exist.".to_string(),
            AppError::Forbidden => "You don't have permission to do that.".to_string(),
            AppError::Multipart(e) => {
                tracing::warn!("Multipart error: {}", e);
                "Malformed upload".to_string()
            }
            other => {
                tracing::error!("{}", other);
                "Internal server error".to_string()
            }
        };

        let status = err.status();
        let page = ErrorTemplate {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
        };

        match page.render() {
            Ok(body) => (
                status,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (status, page.message).into_response()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// `/login?next=...` for the given local path.
pub fn login_url(next: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    format!("/login?{}", query)
}
