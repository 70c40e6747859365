use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub media_root: PathBuf,
    pub media_url: String,
    pub max_upload_size: usize,
    pub log_level: String,
    pub admin: Option<AdminConfig>,
}

/// Superuser created at startup when no account with this email exists.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;

        let host: IpAddr = env_or("RECIPES_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid RECIPES_HOST: {e}"))?;

        let port: u16 = env_or("RECIPES_PORT", "8000")
            .parse()
            .map_err(|e| format!("Invalid RECIPES_PORT: {e}"))?;

        let media_root = PathBuf::from(env_or("RECIPES_MEDIA_ROOT", "media"));
        let media_url = normalize_media_url(&env_or("RECIPES_MEDIA_URL", "/media"))?;

        let max_upload_size: usize = env_or("RECIPES_MAX_UPLOAD_SIZE", "5242880")
            .parse()
            .map_err(|e| format!("Invalid RECIPES_MAX_UPLOAD_SIZE: {e}"))?;

        let log_level = env_or("RECIPES_LOG_LEVEL", "info");

        let admin = match (
            std::env::var("RECIPES_ADMIN_EMAIL").ok(),
            std::env::var("RECIPES_ADMIN_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some(AdminConfig { email, password }),
            (None, None) => None,
            _ => {
                return Err(
                    "RECIPES_ADMIN_EMAIL and RECIPES_ADMIN_PASSWORD must be set together"
                        .to_string(),
                );
            }
        };

        Ok(Config {
            database_url,
            host,
            port,
            media_root,
            media_url,
            max_upload_size,
            log_level,
            admin,
        })
    }
}

/// Media URLs are mounted as a router path, so they need a leading slash and no trailing one.
fn normalize_media_url(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !trimmed.starts_with('/') || trimmed.len() < 2 {
        return Err(format!("Invalid RECIPES_MEDIA_URL '{raw}': must be an absolute path"));
    }
    Ok(trimmed.to_string())
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
