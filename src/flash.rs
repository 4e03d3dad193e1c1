//! One-shot notices carried across a redirect.
//!
//! Pending notices live in a single cookie as `category=message` pairs
//! (form-urlencoded). They are consumed by the next rendered page.

use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;

pub const FLASH_COOKIE: &str = "pahina_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Warning,
    Danger,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Danger => "danger",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Level::Success),
            "info" => Some(Level::Info),
            "warning" => Some(Level::Warning),
            "danger" => Some(Level::Danger),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: Level,
    pub message: String,
}

impl Flash {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn category(&self) -> &'static str {
        self.level.as_str()
    }
}

/// Queue a notice for the next rendered page.
pub fn push(jar: CookieJar, level: Level, message: impl Into<String>) -> CookieJar {
    let mut pending = pending(&jar);
    pending.push(Flash::new(level, message));

    let cookie = Cookie::build((FLASH_COOKIE, encode(&pending)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    jar.add(cookie)
}

/// Remove and return every pending notice.
pub fn take(jar: CookieJar) -> (CookieJar, Vec<Flash>) {
    let pending = pending(&jar);
    if pending.is_empty() {
        return (jar, pending);
    }
    (jar.remove(Cookie::build((FLASH_COOKIE, "")).path("/")), pending)
}

fn pending(jar: &CookieJar) -> Vec<Flash> {
    jar.get(FLASH_COOKIE)
        .map(|cookie| decode(cookie.value()))
        .unwrap_or_default()
}

fn encode(flashes: &[Flash]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for flash in flashes {
        serializer.append_pair(flash.category(), &flash.message);
    }
    serializer.finish()
}

fn decode(value: &str) -> Vec<Flash> {
    url::form_urlencoded::parse(value.as_bytes())
        .filter_map(|(category, message)| {
            Level::parse(&category).map(|level| Flash::new(level, message.into_owned()))
        })
        .collect()
}
