use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use axum_extra::extract::CookieJar;

use crate::db::models::PostWithAuthor;
use crate::db::posts;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::flash::{self, Level};
use crate::forms::{FormErrors, PostForm};
use crate::routes::{Html, Layout};
use crate::state::AppState;

const NEW_POST: &str = "New Post";
const UPDATE_POST: &str = "Update Post";

#[derive(Template)]
#[template(path = "pages/post_form.html")]
pub struct PostFormTemplate {
    pub layout: Layout,
    pub legend: &'static str,
    pub form: PostForm,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "pages/post.html")]
pub struct PostTemplate {
    pub layout: Layout,
    pub post: PostWithAuthor,
    pub is_owner: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/post/create", get(new_post_page).post(create_post))
        .route("/post/{id}", get(show_post))
        .route("/post/{id}/edit", get(edit_post_page).post(update_post))
        .route("/post/{id}/delete", post(delete_post))
}

/// Non-numeric ids can never match a row.
fn parse_id(raw: &str) -> AppResult<i64> {
    raw.parse().map_err(|_| AppError::NotFound)
}

fn find_post(state: &AppState, id: i64) -> AppResult<PostWithAuthor> {
    let conn = state.db.get()?;
    posts::find_with_author(&conn, id)?.ok_or(AppError::NotFound)
}

/// The post, if it exists and was written by `user`.
fn load_owned_post(state: &AppState, raw_id: &str, user: &CurrentUser) -> AppResult<PostWithAuthor> {
    let post = find_post(state, parse_id(raw_id)?)?;
    if post.post.user_id != user.id {
        tracing::warn!(
            user_id = user.id,
            post_id = post.post.id,
            "Rejected change to another user's post"
        );
        return Err(AppError::Forbidden);
    }
    Ok(post)
}

fn render_form(
    jar: CookieJar,
    user: CurrentUser,
    legend: &'static str,
    form: PostForm,
    errors: FormErrors,
) -> AppResult<Response> {
    let (jar, layout) = Layout::new(Some(legend), Some(user), jar);
    Ok((
        jar,
        Html(PostFormTemplate {
            layout,
            legend,
            form,
            errors,
        }),
    )
        .into_response())
}

/// GET /post/create
pub async fn new_post_page(user: CurrentUser, jar: CookieJar) -> AppResult<Response> {
    render_form(jar, user, NEW_POST, PostForm::default(), FormErrors::new())
}

/// POST /post/create
pub async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    let errors = form.validate();
    if !errors.is_empty() {
        return render_form(jar, user, NEW_POST, form, errors);
    }

    let post_id = {
        let conn = state.db.get()?;
        posts::insert(&conn, user.id, &form.title, &form.content)?
    };
    tracing::info!(user_id = user.id, post_id, "Post created");

    let jar = flash::push(jar, Level::Success, "Your post has been created!");
    Ok((jar, Redirect::to("/")).into_response())
}

/// GET /post/{id}
pub async fn show_post(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let post = find_post(&state, parse_id(&id)?)?;
    let is_owner = user.as_ref().is_some_and(|u| u.id == post.post.user_id);

    let title = format!("{} by {}", post.post.title, post.author_username);
    let (jar, layout) = Layout::new(Some(&title), user, jar);
    Ok((
        jar,
        Html(PostTemplate {
            layout,
            post,
            is_owner,
        }),
    )
        .into_response())
}

/// GET /post/{id}/edit
pub async fn edit_post_page(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let existing = load_owned_post(&state, &id, &user)?;
    let form = PostForm {
        title: existing.post.title,
        content: existing.post.content,
    };
    render_form(jar, user, UPDATE_POST, form, FormErrors::new())
}

/// POST /post/{id}/edit
pub async fn update_post(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(id): Path<String>,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    let existing = load_owned_post(&state, &id, &user)?;

    let errors = form.validate();
    if !errors.is_empty() {
        return render_form(jar, user, UPDATE_POST, form, errors);
    }

    let post_id = existing.post.id;
    {
        let conn = state.db.get()?;
        posts::update(&conn, post_id, &form.title, &form.content)?;
    }
    tracing::info!(user_id = user.id, post_id, "Post updated");

    let jar = flash::push(jar, Level::Success, "Your post has been updated!");
    Ok((jar, Redirect::to(&format!("/post/{}", post_id))).into_response())
}

/// POST /post/{id}/delete
pub async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let existing = load_owned_post(&state, &id, &user)?;

    let post_id = existing.post.id;
    {
        let conn = state.db.get()?;
        posts::delete(&conn, post_id)?;
    }
    tracing::info!(user_id = user.id, post_id, "Post deleted");

    let jar = flash::push(jar, Level::Success, "Your post has been deleted!");
    Ok((jar, Redirect::to("/")).into_response())
}
