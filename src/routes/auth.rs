use askama::Template;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::auth::{password, session};
use crate::db::users::{self, Conflict};
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::flash::{self, Level};
use crate::forms::{FormErrors, LoginForm, RegistrationForm, EMAIL_TAKEN, USERNAME_TAKEN};
use crate::routes::{Html, Layout};
use crate::state::AppState;

pub const LOGIN_FAILED: &str = "Login unsuccessful. Please check email and password.";

// -- Templates --

#[derive(Template)]
#[template(path = "pages/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub username: String,
    pub email: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub email: String,
    pub remember: bool,
    pub errors: FormErrors,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
}

/// Only same-site absolute paths are followed after login.
fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

// -- Registration --

fn render_register(
    jar: CookieJar,
    username: String,
    email: String,
    errors: FormErrors,
) -> AppResult<Response> {
    let (jar, layout) = Layout::new(Some("Register"), None, jar);
    Ok((
        jar,
        Html(RegisterTemplate {
            layout,
            username,
            email,
            errors,
        }),
    )
        .into_response())
}

/// GET /register
pub async fn register_page(MaybeUser(user): MaybeUser, jar: CookieJar) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    render_register(jar, String::new(), String::new(), FormErrors::new())
}

/// POST /register: create the account, then send the user to log in
pub async fn register(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Form(form): Form<RegistrationForm>,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let form = form.normalized();
    let mut errors = form.validate();
    {
        let conn = state.db.get()?;
        if !errors.has("username") && users::username_taken(&conn, &form.username)? {
            errors.add("username", USERNAME_TAKEN);
        }
        if !errors.has("email") && users::email_taken(&conn, &form.email)? {
            errors.add("email", EMAIL_TAKEN);
        }
    }
    if !errors.is_empty() {
        return render_register(jar, form.username, form.email, errors);
    }

    let password_hash = password::hash(form.password.clone(), state.config.auth.bcrypt_cost).await?;

    let inserted = {
        let conn = state.db.get()?;
        users::insert(&conn, &form.username, &form.email, &password_hash)
    };
    match inserted {
        Ok(user_id) => tracing::info!(user_id, "Registered new user {}", form.username),
        // Lost a race with a concurrent registration.
        Err(e) => {
            match users::unique_conflict(&e) {
                Some(Conflict::Username) => errors.add("username", USERNAME_TAKEN),
                Some(Conflict::Email) => errors.add("email", EMAIL_TAKEN),
                None => return Err(e.into()),
            }
            return render_register(jar, form.username, form.email, errors);
        }
    }

    let jar = flash::push(
        jar,
        Level::Success,
        "Your account has been created! You are now able to log in",
    );
    Ok((jar, Redirect::to("/login")).into_response())
}

// -- Login --

fn render_login(
    jar: CookieJar,
    email: String,
    remember: bool,
    errors: FormErrors,
    notice: Option<&str>,
) -> AppResult<Response> {
    let (jar, mut layout) = Layout::new(Some("Login"), None, jar);
    if let Some(message) = notice {
        layout.flash(Level::Danger, message);
    }
    Ok((
        jar,
        Html(LoginTemplate {
            layout,
            email,
            remember,
            errors,
        }),
    )
        .into_response())
}

/// GET /login
pub async fn login_page(MaybeUser(user): MaybeUser, jar: CookieJar) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    render_login(jar, String::new(), false, FormErrors::new(), None)
}

/// POST /login: unknown email and wrong password get the same answer
pub async fn login(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let email = form.email.trim().to_string();
    let remember = form.remember();
    let errors = form.validate();
    if !errors.is_empty() {
        return render_login(jar, email, remember, errors, None);
    }

    let found = {
        let conn = state.db.get()?;
        users::find_by_email(&conn, &email)?
    };

    let authenticated = match found {
        Some(user) => {
            let matched = password::verify(form.password, user.password_hash.clone()).await?;
            matched.then_some(user)
        }
        None => None,
    };

    let Some(user) = authenticated else {
        tracing::warn!("Failed login attempt");
        return render_login(jar, email, remember, FormErrors::new(), Some(LOGIN_FAILED));
    };

    let auth = &state.config.auth;
    let token = {
        let conn = state.db.get()?;
        session::create_session(&conn, user.id, auth.session_hours)?
    };
    tracing::info!(user_id = user.id, remember, "User logged in");

    let jar = jar.add(session::session_cookie(
        &auth.cookie_name,
        &token,
        remember,
        auth.session_hours,
    ));
    let target = safe_next(query.next.as_deref()).unwrap_or("/");
    Ok((jar, Redirect::to(target)).into_response())
}

// -- Logout --

/// GET /logout: works whether or not anyone is logged in
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;

    if let Some(cookie) = jar.get(cookie_name) {
        let conn = state.db.get()?;
        session::delete_session(&conn, cookie.value())?;
    }

    let jar = jar.remove(session::removal_cookie(cookie_name));
    let jar = flash::push(jar, Level::Success, "You have been logged out.");
    Ok((jar, Redirect::to("/")).into_response())
}
