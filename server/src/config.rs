use anyhow::{Context, Result};
use axum::http::HeaderName;

const DEFAULT_IDENTITY_HEADER: &str = "x-auth-uid";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub cors_allowed_origins: Vec<String>,
    /// Header the upstream identity provider fills with the caller's id.
    pub identity_header: HeaderName,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cors_allowed_origins: Vec::new(),
            identity_header: HeaderName::from_static(DEFAULT_IDENTITY_HEADER),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let cors_allowed_origins = parse_origins(
            &std::env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
        );
        let identity_header = std::env::var("IDENTITY_HEADER")
            .unwrap_or_else(|_| DEFAULT_IDENTITY_HEADER.into());
        let identity_header = HeaderName::try_from(identity_header.trim().to_ascii_lowercase())
            .context("invalid IDENTITY_HEADER")?;

        Ok(Self {
            cors_allowed_origins,
            identity_header,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
