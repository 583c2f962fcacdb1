use std::env;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Which `Store` backend the server runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseProvider {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub provider: DatabaseProvider,
    /// Full connection URL; takes precedence over the individual DB_* parts
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub name: String,
    pub ssl_mode: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub bcrypt_cost: u32,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a non-empty value")]
    MissingJwtSecret,
    #[error("Unknown DB_PROVIDER '{0}' (expected 'postgres' or 'memory')")]
    UnknownProvider(String),
    #[error("Missing database setting: {0}")]
    MissingDatabaseSetting(&'static str),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").or_else(|_| env::var("ENVIRONMENT")).as_deref() {
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
        // Database overrides
        if let Ok(v) = env::var("DB_PROVIDER") {
            self.database.provider = match v.trim().to_ascii_lowercase().as_str() {
                "postgres" | "postgresql" => DatabaseProvider::Postgres,
                "memory" => DatabaseProvider::Memory,
                _ => return Err(ConfigError::UnknownProvider(v)),
            };
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|url| !url.trim().is_empty());
        }
        if let Ok(v) = env::var("DB_HOST") {
            self.database.host = v;
        }
        if let Ok(v) = env::var("DB_PORT") {
            self.database.port = v.parse().unwrap_or(self.database.port);
        }
        if let Ok(v) = env::var("DB_USERNAME") {
            self.database.username = v;
        }
        if let Ok(v) = env::var("DB_PASSWORD") {
            self.database.password = v;
        }
        if let Ok(v) = env::var("DB_NAME") {
            self.database.name = v;
        }
        if let Ok(v) = env::var("DB_SSLMODE") {
            self.database.ssl_mode = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("API_PORT").or_else(|_| env::var("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_BIND_ADDR") {
            self.api.bind_addr = v;
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(self)
    }

    /// Checks the settings a server cannot start without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }

        if self.database.provider == DatabaseProvider::Postgres && self.database.url.is_none() {
            if self.database.host.is_empty() {
                return Err(ConfigError::MissingDatabaseSetting("DB_HOST"));
            }
            if self.database.name.is_empty() {
                return Err(ConfigError::MissingDatabaseSetting("DB_NAME"));
            }
        }

        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                provider: DatabaseProvider::Postgres,
                url: None,
                host: "127.0.0.1".to_string(),
                port: 5432,
                username: "postgres".to_string(),
                password: "postgres".to_string(),
                name: "phone_review".to_string(),
                ssl_mode: "disable".to_string(),
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                bind_addr: "0.0.0.0".to_string(),
                port: 8080,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                bcrypt_cost: bcrypt::DEFAULT_COST,
                enable_cors: true,
                cors_origins: Vec::new(), // empty list means permissive
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                provider: DatabaseProvider::Postgres,
                url: None,
                host: String::new(),
                port: 5432,
                username: String::new(),
                password: String::new(),
                name: String::new(),
                ssl_mode: "require".to_string(),
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                bind_addr: "0.0.0.0".to_string(),
                port: 8080,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                bcrypt_cost: bcrypt::DEFAULT_COST,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                provider: DatabaseProvider::Postgres,
                url: None,
                host: String::new(),
                port: 5432,
                username: String::new(),
                password: String::new(),
                name: String::new(),
                ssl_mode: "require".to_string(),
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                bind_addr: "0.0.0.0".to_string(),
                port: 8080,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                bcrypt_cost: bcrypt::DEFAULT_COST,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}
