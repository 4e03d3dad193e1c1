//! Form payloads and their validation.
//!
//! Validation never touches storage: each `validate` returns the field errors
//! it found and handlers add uniqueness errors on top.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::uploads::{allowed_extension, ALLOWED_EXTENSIONS};

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9-]+(?:\.[a-zA-Z0-9-]+)+$")
        .expect("compile email regex")
});

const USERNAME_MIN: usize = 2;
const USERNAME_MAX: usize = 20;
const PASSWORD_MIN: usize = 8;

pub const REQUIRED: &str = "This field is required.";
pub const USERNAME_TAKEN: &str = "Username has already been taken.";
pub const EMAIL_TAKEN: &str = "Email has already been taken.";
pub const PICTURE_TOO_LARGE: &str = "File is too large. The limit is 2 MB.";
pub const EMAIL_UNKNOWN: &str = "There is no account with that email. You must register first.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct FormErrors(Vec<FieldError>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn for_field(&self, field: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

fn check_required(errors: &mut FormErrors, field: &'static str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, REQUIRED);
        false
    } else {
        true
    }
}

fn check_username(errors: &mut FormErrors, username: &str) {
    if !check_required(errors, "username", username) {
        return;
    }
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        errors.add(
            "username",
            format!(
                "Field must be between {} and {} characters long.",
                USERNAME_MIN, USERNAME_MAX
            ),
        );
    }
}

fn check_email(errors: &mut FormErrors, email: &str) {
    if check_required(errors, "email", email) && !is_valid_email(email) {
        errors.add("email", "Invalid email address.");
    }
}

fn check_new_password(errors: &mut FormErrors, password: &str, confirm: &str) {
    if check_required(errors, "password", password) && password.chars().count() < PASSWORD_MIN {
        errors.add(
            "password",
            format!("Field must be at least {} characters long.", PASSWORD_MIN),
        );
    }
    if check_required(errors, "confirm_password", confirm) && confirm != password {
        errors.add("confirm_password", "Field must be equal to password.");
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    pub fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_string();
        self
    }

    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        check_username(&mut errors, &self.username);
        check_email(&mut errors, &self.email);
        check_new_password(&mut errors, &self.password, &self.confirm_password);
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub remember: Option<String>,
}

impl LoginForm {
    /// Checkbox semantics: any submitted value other than "" or "false" means checked.
    pub fn remember(&self) -> bool {
        matches!(self.remember.as_deref(), Some(v) if !v.is_empty() && v != "false")
    }

    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        check_email(&mut errors, self.email.trim());
        check_required(&mut errors, "password", &self.password);
        errors
    }
}

/// Account form fields; the multipart body is unpacked by the handler.
#[derive(Debug, Clone, Default)]
pub struct AccountForm {
    pub username: String,
    pub email: String,
    /// Client-side name of the uploaded picture, when one was attached.
    pub picture_name: Option<String>,
}

impl AccountForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        check_username(&mut errors, &self.username);
        check_email(&mut errors, &self.email);
        if let Some(name) = &self.picture_name {
            if allowed_extension(name).is_none() {
                errors.add(
                    "picture",
                    format!(
                        "File does not have an approved extension: {}",
                        ALLOWED_EXTENSIONS.join(", ")
                    ),
                );
            }
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub content: String,
}

impl PostForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        check_required(&mut errors, "title", &self.title);
        check_required(&mut errors, "content", &self.content);
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResetRequestForm {
    pub email: String,
}

impl ResetRequestForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        check_email(&mut errors, self.email.trim());
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResetPasswordForm {
    pub password: String,
    pub confirm_password: String,
}

impl ResetPasswordForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        check_new_password(&mut errors, &self.password, &self.confirm_password);
        errors
    }
}
