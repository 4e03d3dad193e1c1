use askama::Template;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use axum_extra::extract::CookieJar;

use crate::db::users::{self, Conflict};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::flash::{self, Level};
use crate::forms::{AccountForm, FormErrors, EMAIL_TAKEN, PICTURE_TOO_LARGE, USERNAME_TAKEN};
use crate::routes::{Html, Layout};
use crate::state::AppState;
use crate::uploads::MAX_UPLOAD_BYTES;

#[derive(Template)]
#[template(path = "pages/account.html")]
pub struct AccountTemplate {
    pub layout: Layout,
    pub username: String,
    pub email: String,
    pub avatar_url: String,
    pub errors: FormErrors,
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/account",
        get(account_page)
            .post(update_account)
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
}

/// An account submission: the text fields plus the picture, if one was chosen.
#[derive(Default)]
struct AccountSubmission {
    form: AccountForm,
    picture: Option<Vec<u8>>,
    /// The body went over `MAX_UPLOAD_BYTES` before it was fully read.
    too_large: bool,
}

async fn read_submission(mut multipart: Multipart) -> AppResult<AccountSubmission> {
    let mut submission = AccountSubmission::default();
    match read_fields(&mut multipart, &mut submission).await {
        Ok(()) => Ok(submission),
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            tracing::warn!("Account upload rejected: {}", e);
            submission.too_large = true;
            Ok(submission)
        }
        Err(e) => Err(e.into()),
    }
}

async fn read_fields(
    multipart: &mut Multipart,
    submission: &mut AccountSubmission,
) -> Result<(), MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "username" => submission.form.username = field.text().await?.trim().to_string(),
            "email" => submission.form.email = field.text().await?.trim().to_string(),
            "picture" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was chosen.
                if let Some(file_name) = file_name.filter(|n| !n.is_empty()) {
                    if !bytes.is_empty() {
                        submission.form.picture_name = Some(file_name);
                        submission.picture = Some(bytes.to_vec());
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn render_account(
    jar: CookieJar,
    user: CurrentUser,
    username: String,
    email: String,
    errors: FormErrors,
) -> AppResult<Response> {
    let avatar_url = user.avatar_url();
    let (jar, layout) = Layout::new(Some("Account"), Some(user), jar);
    Ok((
        jar,
        Html(AccountTemplate {
            layout,
            username,
            email,
            avatar_url,
            errors,
        }),
    )
        .into_response())
}

/// GET /account
pub async fn account_page(user: CurrentUser, jar: CookieJar) -> AppResult<Response> {
    let username = user.username.clone();
    let email = user.email.clone();
    render_account(jar, user, username, email, FormErrors::new())
}

/// POST /account: update identity fields and optionally replace the avatar
pub async fn update_account(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    multipart: Multipart,
) -> AppResult<Response> {
    let AccountSubmission {
        form,
        picture,
        too_large,
    } = read_submission(multipart).await?;

    if too_large {
        let mut errors = FormErrors::new();
        errors.add("picture", PICTURE_TOO_LARGE);
        let (username, email) = (user.username.clone(), user.email.clone());
        return render_account(jar, user, username, email, errors);
    }

    let mut errors = form.validate();
    {
        let conn = state.db.get()?;
        if !errors.has("username")
            && form.username != user.username
            && users::username_taken(&conn, &form.username)?
        {
            errors.add("username", USERNAME_TAKEN);
        }
        if !errors.has("email")
            && form.email != user.email
            && users::email_taken(&conn, &form.email)?
        {
            errors.add("email", EMAIL_TAKEN);
        }
    }
    if !errors.is_empty() {
        return render_account(jar, user, form.username, form.email, errors);
    }

    let new_picture = match (&picture, &form.picture_name) {
        (Some(bytes), Some(name)) => Some(state.uploads.save_avatar(name, bytes).await?),
        _ => None,
    };
    let image_file = new_picture
        .clone()
        .unwrap_or_else(|| user.image_file.clone());

    let updated = {
        let conn = state.db.get()?;
        users::update_profile(&conn, user.id, &form.username, &form.email, &image_file)
    };

    if let Err(e) = updated {
        if let Some(stored) = &new_picture {
            if let Err(remove_err) = state.uploads.remove(stored).await {
                tracing::warn!("Failed to remove orphaned avatar {}: {}", stored, remove_err);
            }
        }
        match users::unique_conflict(&e) {
            Some(Conflict::Username) => errors.add("username", USERNAME_TAKEN),
            Some(Conflict::Email) => errors.add("email", EMAIL_TAKEN),
            None => return Err(AppError::from(e)),
        }
        return render_account(jar, user, form.username, form.email, errors);
    }

    if new_picture.is_some() && user.has_custom_avatar() {
        if let Err(e) = state.uploads.remove(&user.image_file).await {
            tracing::warn!("Failed to remove old avatar {}: {}", user.image_file, e);
        }
    }
    tracing::info!(user_id = user.id, "Account updated");

    let jar = flash::push(jar, Level::Success, "Your account has been updated!");
    Ok((jar, Redirect::to("/account")).into_response())
}
