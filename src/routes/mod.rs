pub mod account;
pub mod assets;
pub mod auth;
pub mod home;
pub mod posts;
pub mod reset;
pub mod users;

use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use axum_extra::extract::CookieJar;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::flash::{self, Flash, Level};
use crate::state::AppState;

const SITE_NAME: &str = "Pahina";

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// What every page's base template needs: title, nav identity and notices.
pub struct Layout {
    pub title: Option<String>,
    pub current_user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
}

impl Layout {
    /// Build the layout, consuming any notices queued by the previous request.
    pub fn new(
        title: Option<&str>,
        current_user: Option<CurrentUser>,
        jar: CookieJar,
    ) -> (CookieJar, Self) {
        let (jar, flashes) = flash::take(jar);
        (
            jar,
            Self {
                title: title.map(str::to_string),
                current_user,
                flashes,
            },
        )
    }

    /// Show a notice on the page being rendered right now.
    pub fn flash(&mut self, level: Level, message: impl Into<String>) {
        self.flashes.push(Flash::new(level, message));
    }

    pub fn page_title(&self) -> String {
        match &self.title {
            Some(title) => format!("{} - {}", SITE_NAME, title),
            None => SITE_NAME.to_string(),
        }
    }
}

async fn not_found() -> AppError {
    AppError::NotFound
}

/// The full application: every page route, static files and tracing.
pub fn router(state: AppState) -> Router {
    let profile_pics = ServeDir::new(state.uploads.root());

    Router::new()
        .route("/", get(home::index))
        .route("/home", get(home::index))
        .route("/about", get(home::about))
        .route("/assets/{*path}", get(assets::serve))
        .nest_service("/static/profile_pics", profile_pics)
        .merge(auth::router())
        .merge(account::router())
        .merge(posts::router())
        .merge(users::router())
        .merge(reset::router())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
