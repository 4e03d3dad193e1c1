use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::auth::password;
use crate::db::models::User;
use crate::db::users;
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::flash::{self, Level};
use crate::forms::{FormErrors, ResetPasswordForm, ResetRequestForm, EMAIL_UNKNOWN};
use crate::mail;
use crate::routes::{Html, Layout};
use crate::state::AppState;

pub const INVALID_TOKEN: &str = "That is an invalid or expired token";

#[derive(Template)]
#[template(path = "pages/reset_request.html")]
pub struct ResetRequestTemplate {
    pub layout: Layout,
    pub email: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "pages/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub layout: Layout,
    pub action: String,
    pub errors: FormErrors,
}

/// Older reset links carry the username alongside the token.
#[derive(Debug, Default, Deserialize)]
pub struct ResetQuery {
    pub username: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reset_password", get(request_page).post(request_reset))
        .route(
            "/reset_password/{token}",
            get(reset_page).post(reset_password),
        )
}

fn render_request(jar: CookieJar, email: String, errors: FormErrors) -> AppResult<Response> {
    let (jar, layout) = Layout::new(Some("Reset Password"), None, jar);
    Ok((
        jar,
        Html(ResetRequestTemplate {
            layout,
            email,
            errors,
        }),
    )
        .into_response())
}

/// GET /reset_password
pub async fn request_page(MaybeUser(user): MaybeUser, jar: CookieJar) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    render_request(jar, String::new(), FormErrors::new())
}

/// POST /reset_password: mail a reset link to a registered address
pub async fn request_reset(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Form(form): Form<ResetRequestForm>,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let email = form.email.trim().to_string();
    let mut errors = form.validate();
    let account = if errors.is_empty() {
        let conn = state.db.get()?;
        users::find_by_email(&conn, &email)?
    } else {
        None
    };
    let Some(account) = account else {
        if errors.is_empty() {
            errors.add("email", EMAIL_UNKNOWN);
        }
        return render_request(jar, email, errors);
    };

    let token = state.reset_tokens.generate(account.id)?;
    let link = format!("{}/reset_password/{}", state.config.base_url(), token);
    let message = mail::password_reset(&account.email, &link);

    let jar = match mail::deliver(state.mailer.clone(), message).await {
        Ok(()) => {
            tracing::info!(user_id = account.id, "Password reset email sent");
            flash::push(
                jar,
                Level::Info,
                "An email has been sent with instructions to reset your password.",
            )
        }
        Err(e) => {
            tracing::error!(user_id = account.id, "Failed to send reset email: {}", e);
            flash::push(
                jar,
                Level::Danger,
                "There was an error sending the email. Please try again later.",
            )
        }
    };
    Ok((jar, Redirect::to("/reset_password")).into_response())
}

/// The account a reset token was issued for. A `username` in the query must name it.
fn token_owner(state: &AppState, token: &str, query: &ResetQuery) -> AppResult<Option<User>> {
    let Some(user_id) = state.reset_tokens.verify(token) else {
        return Ok(None);
    };
    let user = {
        let conn = state.db.get()?;
        users::find_by_id(&conn, user_id)?
    };
    Ok(user.filter(|u| {
        query
            .username
            .as_deref()
            .map_or(true, |name| name == u.username)
    }))
}

fn invalid_token(jar: CookieJar) -> Response {
    let jar = flash::push(jar, Level::Warning, INVALID_TOKEN);
    (jar, Redirect::to("/reset_password")).into_response()
}

/// Form target that keeps the token and, when present, the username.
fn reset_action(token: &str, query: &ResetQuery) -> String {
    let path = format!("/reset_password/{}", token);
    match &query.username {
        Some(username) => {
            let qs = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("username", username)
                .finish();
            format!("{}?{}", path, qs)
        }
        None => path,
    }
}

fn render_reset(
    jar: CookieJar,
    token: &str,
    query: &ResetQuery,
    errors: FormErrors,
) -> AppResult<Response> {
    let (jar, mut layout) = Layout::new(Some("Reset Password"), None, jar);
    if errors.is_empty() {
        layout.flash(Level::Info, "Enter your new password.");
    }
    Ok((
        jar,
        Html(ResetPasswordTemplate {
            layout,
            action: reset_action(token, query),
            errors,
        }),
    )
        .into_response())
}

/// GET /reset_password/{token}
pub async fn reset_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Path(token): Path<String>,
    Query(query): Query<ResetQuery>,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    if token_owner(&state, &token, &query)?.is_none() {
        return Ok(invalid_token(jar));
    }
    render_reset(jar, &token, &query, FormErrors::new())
}

/// POST /reset_password/{token}: the token is checked again before anything changes
pub async fn reset_password(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Path(token): Path<String>,
    Query(query): Query<ResetQuery>,
    Form(form): Form<ResetPasswordForm>,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    let Some(account) = token_owner(&state, &token, &query)? else {
        return Ok(invalid_token(jar));
    };

    let errors = form.validate();
    if !errors.is_empty() {
        return render_reset(jar, &token, &query, errors);
    }

    let password_hash = password::hash(form.password, state.config.auth.bcrypt_cost).await?;
    {
        let conn = state.db.get()?;
        users::update_password(&conn, account.id, &password_hash)?;
    }
    tracing::info!(user_id = account.id, "Password reset completed");

    let jar = flash::push(
        jar,
        Level::Success,
        "Your password has been updated! You are now able to log in",
    );
    Ok((jar, Redirect::to("/login")).into_response())
}
