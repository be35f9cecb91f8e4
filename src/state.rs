use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sqlx::PgPool;

use crate::config::Config;
use crate::templates::Templates;

/// Everything a handler needs. All of it is immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub templates: Templates,
    pub config: Arc<Config>,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(pool: PgPool, templates: Templates, config: Config) -> Self {
        let cookie_key = Key::from(config.session_secret.as_bytes());
        Self {
            pool,
            templates,
            config: Arc::new(config),
            cookie_key,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
