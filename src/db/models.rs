use chrono::NaiveDateTime;

/// Sentinel `image_file` meaning the user never uploaded an avatar.
pub const DEFAULT_AVATAR: &str = "default.jpg";

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub image_file: String,
    pub password_hash: String,
    pub created_at: String,
}

impl User {
    pub fn avatar_url(&self) -> String {
        avatar_url(&self.image_file)
    }
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: String,
}

/// A post joined with the author columns the listing pages show.
#[derive(Debug, Clone)]
pub struct PostWithAuthor {
    pub post: Post,
    pub author_username: String,
    pub author_image_file: String,
}

impl PostWithAuthor {
    pub fn author_avatar_url(&self) -> String {
        avatar_url(&self.author_image_file)
    }

    pub fn posted_on(&self) -> String {
        display_date(&self.post.created_at)
    }
}

pub fn avatar_url(image_file: &str) -> String {
    if image_file == DEFAULT_AVATAR {
        "/assets/img/default-avatar.svg".to_string()
    } else {
        format!("/static/profile_pics/{}", image_file)
    }
}

/// `2025-01-15 12:00:00` -> `2025-01-15`; anything unparsable is shown as stored.
pub fn display_date(db_time: &str) -> String {
    NaiveDateTime::parse_from_str(db_time, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| db_time.to_string())
}
