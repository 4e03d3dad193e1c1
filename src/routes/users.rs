use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use axum_extra::extract::CookieJar;

use crate::db::models::{PostWithAuthor, User};
use crate::db::pagination::{Page, PER_PAGE};
use crate::db::{posts, users};
use crate::error::{AppError, AppResult};
use crate::extractors::MaybeUser;
use crate::routes::home::ListQuery;
use crate::routes::{Html, Layout};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/user_posts.html")]
pub struct UserPostsTemplate {
    pub layout: Layout,
    pub author: User,
    pub page: Page<PostWithAuthor>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/user/{username}", get(user_posts))
}

/// GET /user/{username}
pub async fn user_posts(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Path(username): Path<String>,
    Query(query): Query<ListQuery>,
) -> AppResult<Response> {
    let (author, page) = {
        let conn = state.db.get()?;
        let author = users::find_by_username(&conn, &username)?.ok_or(AppError::NotFound)?;
        let page = posts::list_by_author(&conn, author.id, query.number(), PER_PAGE)?;
        (author, page)
    };

    let title = format!("Posts by {}", author.username);
    let (jar, layout) = Layout::new(Some(&title), user, jar);
    Ok((jar, Html(UserPostsTemplate { layout, author, page })).into_response())
}
