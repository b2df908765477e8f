use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub geocoder: GeocoderConfig,
    pub images: ImageStoreConfig,
    pub moderation: ModerationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub gateway_webhook_secret: String,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub api_key: String,
    /// Each geocoding attempt (primary and fallback) is bounded by this.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageStoreConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Operator-designated super-admin. Never demotable; role is
    /// normalized to admin lazily on profile read.
    pub primary_admin_email: String,
    /// Hard cap on accounts holding the admin role at once.
    pub max_admins: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECT_TIMEOUT_SECS") {
            self.database.connect_timeout_secs = v.parse().unwrap_or(self.database.connect_timeout_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("GATEWAY_WEBHOOK_SECRET") {
            self.security.gateway_webhook_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Geocoder overrides
        if let Ok(v) = env::var("GEOCODER_BASE_URL") {
            self.geocoder.base_url = v;
        }
        if let Ok(v) = env::var("GEOCODER_API_KEY") {
            self.geocoder.api_key = v;
        }
        if let Ok(v) = env::var("GEOCODER_TIMEOUT_SECS") {
            self.geocoder.timeout_secs = v.parse().unwrap_or(self.geocoder.timeout_secs);
        }

        // Image store overrides
        if let Ok(v) = env::var("IMAGE_STORE_BASE_URL") {
            self.images.base_url = v;
        }
        if let Ok(v) = env::var("IMAGE_STORE_API_KEY") {
            self.images.api_key = v;
        }
        if let Ok(v) = env::var("IMAGE_STORE_TIMEOUT_SECS") {
            self.images.timeout_secs = v.parse().unwrap_or(self.images.timeout_secs);
        }

        // Moderation overrides
        if let Ok(v) = env::var("PRIMARY_ADMIN_EMAIL") {
            self.moderation.primary_admin_email = v;
        }
        if let Ok(v) = env::var("MAX_ADMIN_ACCOUNTS") {
            self.moderation.max_admins = v.parse().unwrap_or(self.moderation.max_admins);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connect_timeout_secs: 30,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                gateway_webhook_secret: String::new(),
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            geocoder: GeocoderConfig {
                base_url: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
                api_key: String::new(),
                timeout_secs: 10,
            },
            images: ImageStoreConfig {
                base_url: String::new(),
                api_key: String::new(),
                timeout_secs: 30,
            },
            moderation: ModerationConfig {
                primary_admin_email: String::new(),
                max_admins: 3,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connect_timeout_secs: 10,
            },
            ..Self::development()
        }
    }

    fn production() -> Self {
        let base = Self::development();
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connect_timeout_secs: 5,
            },
            security: SecurityConfig {
                cors_origins: vec![],
                ..base.security
            },
            geocoder: GeocoderConfig {
                timeout_secs: 5,
                ..base.geocoder
            },
            images: base.images,
            moderation: base.moderation,
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
