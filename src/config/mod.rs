use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub media: MediaConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Allowed CORS origin; "*" mirrors the request origin.
    pub cors_origin: String,
    pub max_json_bytes: usize,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub name: String,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub access_token_secret: String,
    pub access_token_expiry_secs: i64,
    pub refresh_token_secret: String,
    pub refresh_token_expiry_secs: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaBackend {
    Cloudinary,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub backend: MediaBackend,
    pub cloudinary_cloud_name: String,
    pub cloudinary_api_key: String,
    pub cloudinary_api_secret: String,
    /// Directory the local backend copies files into; served under /static.
    pub local_dir: String,
    /// Public base URL of the local backend (e.g. http://localhost:8000/static).
    pub public_url: String,
    pub temp_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_limit: u64,
    pub max_limit: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()?;

        config.validate()?;
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        // Server overrides
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("CORS_ORIGIN") {
            self.server.cors_origin = v.trim().to_string();
        }
        if let Ok(v) = env::var("MAX_JSON_BYTES") {
            self.server.max_json_bytes = v.parse().unwrap_or(self.server.max_json_bytes);
        }
        if let Ok(v) = env::var("MAX_UPLOAD_BYTES") {
            self.server.max_upload_bytes = v.parse().unwrap_or(self.server.max_upload_bytes);
        }

        // Database overrides
        if let Ok(v) = env::var("MONGODB_URI") {
            self.database.uri = v;
        }
        if let Ok(v) = env::var("DB_NAME") {
            self.database.name = v;
        }
        if let Ok(v) = env::var("DATABASE_CONNECT_TIMEOUT_SECS") {
            self.database.connect_timeout_secs = v.parse().unwrap_or(self.database.connect_timeout_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("ACCESS_TOKEN_SECRET") {
            self.security.access_token_secret = v;
        }
        if let Ok(v) = env::var("ACCESS_TOKEN_EXPIRY") {
            self.security.access_token_expiry_secs = parse_expiry(&v).ok_or(ConfigError::Invalid {
                name: "ACCESS_TOKEN_EXPIRY",
                value: v.clone(),
            })?;
        }
        if let Ok(v) = env::var("REFRESH_TOKEN_SECRET") {
            self.security.refresh_token_secret = v;
        }
        if let Ok(v) = env::var("REFRESH_TOKEN_EXPIRY") {
            self.security.refresh_token_expiry_secs = parse_expiry(&v).ok_or(ConfigError::Invalid {
                name: "REFRESH_TOKEN_EXPIRY",
                value: v.clone(),
            })?;
        }
        if let Ok(v) = env::var("COOKIE_SECURE") {
            self.security.cookie_secure = parse_flag(&v).ok_or(ConfigError::Invalid {
                name: "COOKIE_SECURE",
                value: v.clone(),
            })?;
        }

        // Media overrides
        if let Ok(v) = env::var("MEDIA_BACKEND") {
            self.media.backend = match v.to_ascii_lowercase().as_str() {
                "cloudinary" => MediaBackend::Cloudinary,
                "local" => MediaBackend::Local,
                _ => return Err(ConfigError::Invalid { name: "MEDIA_BACKEND", value: v }),
            };
        }
        if let Ok(v) = env::var("CLOUDINARY_CLOUD_NAME") {
            self.media.cloudinary_cloud_name = v;
        }
        if let Ok(v) = env::var("CLOUDINARY_API_KEY") {
            self.media.cloudinary_api_key = v;
        }
        if let Ok(v) = env::var("CLOUDINARY_SECRET_KEY") {
            self.media.cloudinary_api_secret = v;
        }
        if let Ok(v) = env::var("MEDIA_LOCAL_DIR") {
            self.media.local_dir = v;
        }
        if let Ok(v) = env::var("MEDIA_PUBLIC_URL") {
            self.media.public_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("UPLOAD_TEMP_DIR") {
            self.media.temp_dir = v;
        }

        // Pagination overrides
        if let Ok(v) = env::var("PAGINATION_DEFAULT_LIMIT") {
            self.pagination.default_limit = v.parse().unwrap_or(self.pagination.default_limit);
        }
        if let Ok(v) = env::var("PAGINATION_MAX_LIMIT") {
            self.pagination.max_limit = v.parse().unwrap_or(self.pagination.max_limit);
        }

        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.security.access_token_secret.is_empty() {
            return Err(ConfigError::Missing("ACCESS_TOKEN_SECRET"));
        }
        if self.security.refresh_token_secret.is_empty() {
            return Err(ConfigError::Missing("REFRESH_TOKEN_SECRET"));
        }
        if self.media.backend == MediaBackend::Cloudinary
            && (self.media.cloudinary_cloud_name.is_empty()
                || self.media.cloudinary_api_key.is_empty()
                || self.media.cloudinary_api_secret.is_empty())
        {
            return Err(ConfigError::Missing("CLOUDINARY_CLOUD_NAME/CLOUDINARY_API_KEY/CLOUDINARY_SECRET_KEY"));
        }
        if self.pagination.max_limit > i64::MAX as u64 {
            return Err(ConfigError::Invalid {
                name: "PAGINATION_MAX_LIMIT",
                value: self.pagination.max_limit.to_string(),
            });
        }
        if self.pagination.default_limit == 0 || self.pagination.max_limit < self.pagination.default_limit {
            return Err(ConfigError::Invalid {
                name: "PAGINATION_DEFAULT_LIMIT",
                value: self.pagination.default_limit.to_string(),
            });
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 8000,
                cors_origin: "*".to_string(),
                max_json_bytes: 16 * 1024,
                max_upload_bytes: 200 * 1024 * 1024, // 200MB
            },
            database: DatabaseConfig {
                uri: "mongodb://localhost:27017".to_string(),
                name: "videotube".to_string(),
                connect_timeout_secs: 10,
            },
            security: SecurityConfig {
                access_token_secret: "development-access-secret".to_string(),
                access_token_expiry_secs: 24 * 60 * 60,
                refresh_token_secret: "development-refresh-secret".to_string(),
                refresh_token_expiry_secs: 10 * 24 * 60 * 60,
                cookie_secure: false,
            },
            media: MediaConfig {
                backend: MediaBackend::Local,
                cloudinary_cloud_name: String::new(),
                cloudinary_api_key: String::new(),
                cloudinary_api_secret: String::new(),
                local_dir: "public/media".to_string(),
                public_url: "http://localhost:8000/static".to_string(),
                temp_dir: env::temp_dir().to_string_lossy().into_owned(),
            },
            pagination: PaginationConfig {
                default_limit: 10,
                max_limit: 100,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 8000,
                cors_origin: "https://staging.videotube.example".to_string(),
                max_json_bytes: 16 * 1024,
                max_upload_bytes: 200 * 1024 * 1024,
            },
            database: DatabaseConfig {
                uri: "mongodb://localhost:27017".to_string(),
                name: "videotube".to_string(),
                connect_timeout_secs: 10,
            },
            security: SecurityConfig {
                access_token_secret: String::new(),
                access_token_expiry_secs: 24 * 60 * 60,
                refresh_token_secret: String::new(),
                refresh_token_expiry_secs: 10 * 24 * 60 * 60,
                cookie_secure: true,
            },
            media: MediaConfig {
                backend: MediaBackend::Cloudinary,
                cloudinary_cloud_name: String::new(),
                cloudinary_api_key: String::new(),
                cloudinary_api_secret: String::new(),
                local_dir: "public/media".to_string(),
                public_url: String::new(),
                temp_dir: env::temp_dir().to_string_lossy().into_owned(),
            },
            pagination: PaginationConfig {
                default_limit: 10,
                max_limit: 100,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 8000,
                cors_origin: "https://videotube.example".to_string(),
                max_json_bytes: 16 * 1024,
                max_upload_bytes: 500 * 1024 * 1024,
            },
            database: DatabaseConfig {
                uri: "mongodb://localhost:27017".to_string(),
                name: "videotube".to_string(),
                connect_timeout_secs: 5,
            },
            security: SecurityConfig {
                access_token_secret: String::new(),
                access_token_expiry_secs: 60 * 60,
                refresh_token_secret: String::new(),
                refresh_token_expiry_secs: 10 * 24 * 60 * 60,
                cookie_secure: true,
            },
            media: MediaConfig {
                backend: MediaBackend::Cloudinary,
                cloudinary_cloud_name: String::new(),
                cloudinary_api_key: String::new(),
                cloudinary_api_secret: String::new(),
                local_dir: "public/media".to_string(),
                public_url: String::new(),
                temp_dir: env::temp_dir().to_string_lossy().into_owned(),
            },
            pagination: PaginationConfig {
                default_limit: 10,
                max_limit: 50,
            },
        }
    }
}

/// Parse token lifetimes written as `3600`, `45s`, `15m`, `12h` or `10d` into seconds.
pub fn parse_expiry(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let (number, multiplier) = match raw.chars().last()? {
        's' => (&raw[..raw.len() - 1], 1),
        'm' => (&raw[..raw.len() - 1], 60),
        'h' => (&raw[..raw.len() - 1], 60 * 60),
        'd' => (&raw[..raw.len() - 1], 24 * 60 * 60),
        c if c.is_ascii_digit() => (raw, 1),
        _ => return None,
    };
    let value: i64 = number.trim().parse().ok()?;
    if value <= 0 {
        return None;
    }
    value.checked_mul(multiplier)
}

/// Parse a boolean switch such as `true`, `0` or `off`
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
