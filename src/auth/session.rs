use axum_extra::extract::cookie::{Cookie, SameSite};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::User;

/// Create a new session for a user. Returns the session token.
pub fn create_session(conn: &Connection, user_id: i64, hours: u64) -> rusqlite::Result<String> {
    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Delete a session by token.
pub fn delete_session(conn: &Connection, token: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// The user behind an unexpired session token.
pub fn user_for_token(conn: &Connection, token: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT u.id, u.username, u.email, u.image_file, u.password_hash, u.created_at
         FROM sessions s
         JOIN users u ON u.id = s.user_id
         WHERE s.token = ?1 AND s.expires_at > datetime('now')",
        params![token],
        |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                image_file: row.get(3)?,
                password_hash: row.get(4)?,
                created_at: row.get(5)?,
            })
        },
    )
    .optional()
}

/// Session cookie. Without `remember` it carries no Max-Age, so the browser
/// drops it when it closes.
pub fn session_cookie(name: &str, token: &str, remember: bool, hours: u64) -> Cookie<'static> {
    let builder = Cookie::build((name.to_string(), token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    if remember {
        builder
            .max_age(time::Duration::hours(hours as i64))
            .build()
    } else {
        builder.build()
    }
}

pub fn removal_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), String::new())).path("/").build()
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}
