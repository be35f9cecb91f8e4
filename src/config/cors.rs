use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3001,http://127.0.0.1:3001";

const PREFLIGHT_MAX_AGE_SECS: u64 = 3600;

/// The portal only serves HTML forms and CSV downloads, so GET and POST are
/// the whole surface.
pub fn create_cors_layer(configured: Option<&str>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origins(configured.unwrap_or(DEFAULT_ALLOWED_ORIGINS)))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
        .expose_headers([
            header::CONTENT_DISPOSITION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(PREFLIGHT_MAX_AGE_SECS))
}

fn allowed_origins(origins_str: &str) -> AllowOrigin {
    let origins: Vec<HeaderValue> = parse_origins(origins_str);

    if origins.is_empty() {
        // credentials forbid a wildcard, so fall back to the local dev origins
        tracing::warn!("CORS: No valid origins configured, falling back to defaults");
        AllowOrigin::list(parse_origins(DEFAULT_ALLOWED_ORIGINS))
    } else {
        tracing::info!("CORS: Configured with {} allowed origin(s)", origins.len());
        AllowOrigin::list(origins)
    }
}

fn parse_origins(origins_str: &str) -> Vec<HeaderValue> {
    origins_str
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => {
                tracing::debug!("CORS: Allowing origin: {}", origin);
                Some(value)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_cors_layer() {
        let _layer = create_cors_layer(None);
        let _layer = create_cors_layer(Some("https://portal.example.edu"));
    }

    #[test]
    fn test_parse_origins_skips_blank_and_invalid_entries() {
        let origins = parse_origins(" https://a.example.edu , ,bad\norigin,https://b.example.edu");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "https://a.example.edu");
    }

    #[test]
    fn test_default_origins_are_valid() {
        assert_eq!(
            parse_origins(DEFAULT_ALLOWED_ORIGINS).len(),
            DEFAULT_ALLOWED_ORIGINS.split(',').count()
        );
    }
}
