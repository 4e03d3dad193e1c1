use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rand::Rng;

use crate::auth::ResetTokenCodec;
use crate::config::Config;
use crate::mail::Mailer;
use crate::uploads::UploadStore;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub mailer: Arc<dyn Mailer>,
    pub uploads: UploadStore,
    pub reset_tokens: ResetTokenCodec,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, mailer: Arc<dyn Mailer>) -> Self {
        let secret = match &config.auth.secret_key {
            Some(key) => key.clone().into_bytes(),
            None => {
                tracing::warn!(
                    "No [auth] secret_key configured; reset links will not survive a restart"
                );
                rand::thread_rng().gen::<[u8; 32]>().to_vec()
            }
        };

        Self {
            uploads: UploadStore::new(config.uploads_path()),
            reset_tokens: ResetTokenCodec::new(&secret, config.auth.reset_token_secs),
            db,
            config,
            mailer,
        }
    }
}
