#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use axum_extra::extract::cookie::Cookie;
use tempfile::TempDir;
use tower::ServiceExt; // for `app.oneshot()`

use pahina::config::Config;
use pahina::db;
use pahina::mail::{MailError, Mailer, OutgoingMail};
use pahina::state::{AppState, DbPool};

pub const SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "correct horse";
const BOUNDARY: &str = "----pahina-test-boundary";

/// Captures outgoing mail; can be switched to fail every delivery.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingMail>>,
    pub fail: AtomicBool,
}

impl Mailer for RecordingMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Task("relay unavailable".into()));
        }
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub pool: DbPool,
    pub mailer: Arc<RecordingMailer>,
    pub uploads: PathBuf,
    _tmp: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();

        let mut config = Config::default();
        config.server.base_url = Some("http://localhost:3000".into());
        config.database.path = Some(tmp.path().join("test.db"));
        config.storage.path = Some(tmp.path().join("uploads"));
        config.auth.secret_key = Some(SECRET.into());
        config.auth.bcrypt_cost = 4;

        let pool = db::create_pool(&config.db_path()).expect("Failed to create test database");
        db::run_migrations(&pool).expect("Failed to run migrations");

        let mailer = Arc::new(RecordingMailer::default());
        let uploads = config.uploads_path();
        let state = AppState::new(config, pool.clone(), mailer.clone());

        Self {
            router: pahina::routes::router(state),
            pool,
            mailer,
            uploads,
            _tmp: tmp,
        }
    }

    pub fn browser(&self) -> Browser {
        Browser {
            router: self.router.clone(),
            cookies: HashMap::new(),
        }
    }

    pub fn count(&self, sql: &str) -> i64 {
        let conn = self.pool.get().unwrap();
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    pub fn execute(&self, sql: &str) {
        let conn = self.pool.get().unwrap();
        conn.execute_batch(sql).unwrap();
    }

    pub fn user_id(&self, username: &str) -> i64 {
        let conn = self.pool.get().unwrap();
        db::users::find_by_username(&conn, username)
            .unwrap()
            .expect("user exists")
            .id
    }

    pub fn image_file(&self, username: &str) -> String {
        let conn = self.pool.get().unwrap();
        db::users::find_by_username(&conn, username)
            .unwrap()
            .expect("user exists")
            .image_file
    }

    pub fn upload_names(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.uploads) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Register and log in through the real forms; returns the logged-in browser.
    pub async fn signed_in(&self, username: &str) -> Browser {
        let mut browser = self.browser();
        browser.register(username, &format!("{}@example.com", username)).await;
        let response = browser
            .login(&format!("{}@example.com", username), PASSWORD, false)
            .await;
        assert_eq!(location(&response), "/");
        browser
    }
}

/// Cookie-carrying client. Cookies without Max-Age/Expires are session cookies.
pub struct Browser {
    router: Router,
    cookies: HashMap<String, (String, bool)>,
}

impl Browser {
    pub async fn send(&mut self, mut request: Request<Body>) -> Response {
        if !self.cookies.is_empty() {
            let header_value = self
                .cookies
                .iter()
                .map(|(name, (value, _))| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            request
                .headers_mut()
                .insert(header::COOKIE, header_value.parse().unwrap());
        }

        let response = self.router.clone().oneshot(request).await.unwrap();

        for value in response.headers().get_all(header::SET_COOKIE) {
            let cookie = Cookie::parse(value.to_str().unwrap().to_string()).unwrap();
            let removed = cookie.max_age().is_some_and(|age| age.is_zero())
                || cookie.value().is_empty();
            if removed {
                self.cookies.remove(cookie.name());
            } else {
                let persistent = cookie.max_age().is_some() || cookie.expires().is_some();
                self.cookies.insert(
                    cookie.name().to_string(),
                    (cookie.value().to_string(), persistent),
                );
            }
        }
        response
    }

    /// Drop every cookie that would not outlive the browser process.
    pub fn restart(&mut self) {
        self.cookies.retain(|_, (_, persistent)| *persistent);
    }

    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    pub async fn get(&mut self, uri: &str) -> Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> Response {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Multipart POST with text fields and an optional `picture` upload.
    pub async fn post_multipart(
        &mut self,
        uri: &str,
        fields: &[(&str, &str)],
        picture: Option<(&str, &[u8])>,
    ) -> Response {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        if let Some((filename, bytes)) = picture {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"picture\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    BOUNDARY, filename
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn register(&mut self, username: &str, email: &str) -> Response {
        self.post_form(
            "/register",
            &[
                ("username", username),
                ("email", email),
                ("password", PASSWORD),
                ("confirm_password", PASSWORD),
            ],
        )
        .await
    }

    pub async fn login(&mut self, email: &str, password: &str, remember: bool) -> Response {
        let mut fields = vec![("email", email), ("password", password)];
        if remember {
            fields.push(("remember", "y"));
        }
        self.post_form("/login", &fields).await
    }

    pub async fn create_post(&mut self, title: &str, content: &str) -> Response {
        self.post_form("/post/create", &[("title", title), ("content", content)])
            .await
    }

    /// GET the page and return its body, asserting a 200.
    pub async fn page(&mut self, uri: &str) -> String {
        let response = self.get(uri).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {}", uri);
        body_text(response).await
    }
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response) -> String {
    assert_eq!(
        response.status(),
        StatusCode::SEE_OTHER,
        "expected a redirect"
    );
    response.headers()[header::LOCATION]
        .to_str()
        .unwrap()
        .to_string()
}
