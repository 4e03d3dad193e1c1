use askama::Template;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::db::models::PostWithAuthor;
use crate::db::pagination::{page_number, Page, PER_PAGE};
use crate::db::posts;
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::routes::{Html, Layout};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub page: Page<PostWithAuthor>,
}

#[derive(Template)]
#[template(path = "pages/about.html")]
pub struct AboutTemplate {
    pub layout: Layout,
}

/// `?page=` on listing pages. Kept as a string so junk falls back to page 1.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
}

impl ListQuery {
    pub fn number(&self) -> u32 {
        page_number(self.page.as_deref())
    }
}

/// GET / and /home: every post, newest first
pub async fn index(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Query(query): Query<ListQuery>,
) -> AppResult<Response> {
    let page = {
        let conn = state.db.get()?;
        posts::list_recent(&conn, query.number(), PER_PAGE)?
    };

    let (jar, layout) = Layout::new(None, user, jar);
    Ok((jar, Html(HomeTemplate { layout, page })).into_response())
}

/// GET /about
pub async fn about(MaybeUser(user): MaybeUser, jar: CookieJar) -> AppResult<Response> {
    let (jar, layout) = Layout::new(Some("About"), user, jar);
    Ok((jar, Html(AboutTemplate { layout })).into_response())
}
