//! Admin login flag and flash messages, both carried in encrypted cookies.

use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponseParts, ResponseParts};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::state::AppState;

const ADMIN_COOKIE: &str = "portal_admin";
const FLASH_COOKIE: &str = "portal_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Danger,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

/// The request's cookie session. Flashes queued here and not taken by a
/// rendered page are written back for the next request.
#[derive(Clone)]
pub struct Session {
    private_cookies: PrivateCookieJar,
    flashes: Vec<Flash>,
    had_flash_cookie: bool,
    secure: bool,
}

impl Session {
    pub fn new(private_cookies: PrivateCookieJar, secure: bool) -> Self {
        let stored = private_cookies.get(FLASH_COOKIE);
        let flashes = stored
            .as_ref()
            .and_then(|cookie| serde_json::from_str(cookie.value()).ok())
            .unwrap_or_default();
        Self {
            private_cookies,
            flashes,
            had_flash_cookie: stored.is_some(),
            secure,
        }
    }

    fn cookie(&self, name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }

    pub fn admin_username(&self) -> Option<String> {
        self.private_cookies
            .get(ADMIN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|username| !username.is_empty())
    }

    pub fn is_admin(&self) -> bool {
        self.admin_username().is_some()
    }

    pub fn login(&mut self, username: &str) {
        let cookie = self.cookie(ADMIN_COOKIE, username.to_string());
        self.private_cookies = self.private_cookies.clone().add(cookie);
    }

    /// Drops the admin flag and any pending flashes.
    pub fn clear(&mut self) {
        let cookie = self.cookie(ADMIN_COOKIE, String::new());
        self.private_cookies = self.private_cookies.clone().remove(cookie);
        self.flashes.clear();
    }

    pub fn flash(&mut self, level: FlashLevel, message: impl Into<String>) {
        self.flashes.push(Flash {
            level,
            message: message.into(),
        });
    }

    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.flashes)
    }

    pub fn into_jar(self) -> PrivateCookieJar {
        if self.flashes.is_empty() {
            if self.had_flash_cookie {
                let cookie = self.cookie(FLASH_COOKIE, String::new());
                return self.private_cookies.remove(cookie);
            }
            return self.private_cookies;
        }

        match serde_json::to_string(&self.flashes) {
            Ok(value) => {
                let cookie = self.cookie(FLASH_COOKIE, value);
                self.private_cookies.add(cookie)
            }
            Err(e) => {
                warn!(error = %e, "Dropping flash messages that could not be encoded");
                self.private_cookies
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::from_request_parts(parts, state).await?;
        Ok(Session::new(jar, state.config.production))
    }
}

impl IntoResponseParts for Session {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.into_jar().into_response_parts(res)
    }
}
