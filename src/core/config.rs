use std::{env, path::PathBuf, str::FromStr};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

const DEFAULT_CORS_ORIGINS: &[&str] =
    &["http://localhost:5173", "http://localhost:3000", "http://localhost:8080"];

/// Process configuration, read once from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    server: ServerSettings,
    runtime: RuntimeSettings,
    api: ApiSettings,
    security: SecuritySettings,
    cors: CorsSettings,
    database: DatabaseSettings,
    redis: RedisSettings,
    quiz: QuizSettings,
    invoice: InvoiceSettings,
    admin: AdminSettings,
    telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
struct ServerSettings {
    host: String,
    port: u16,
}

#[derive(Debug, Clone)]
pub(crate) struct ApiSettings {
    pub(crate) project_name: String,
    pub(crate) version: String,
    pub(crate) api_v1_str: String,
}

#[derive(Debug, Clone)]
pub(crate) struct SecuritySettings {
    pub(crate) secret_key: String,
    pub(crate) secret_key_generated: bool,
    pub(crate) access_token_expire_minutes: u64,
    pub(crate) algorithm: String,
    pub(crate) login_rate_limit: u64,
    pub(crate) login_rate_window_seconds: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct CorsSettings {
    pub(crate) origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct DatabaseSettings {
    pub(crate) postgres_server: String,
    pub(crate) postgres_port: u16,
    pub(crate) postgres_user: String,
    pub(crate) postgres_password: String,
    pub(crate) postgres_db: String,
    pub(crate) database_url: Option<String>,
    pub(crate) max_connections: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct RedisSettings {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) db: u16,
    pub(crate) password: String,
}

/// Background status worker.
#[derive(Debug, Clone)]
pub(crate) struct QuizSettings {
    pub(crate) status_interval_seconds: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct InvoiceSettings {
    /// Falls back to the built-in document when unset.
    pub(crate) template_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub(crate) struct AdminSettings {
    pub(crate) first_superuser_username: String,
    pub(crate) first_superuser_password: String,
}

#[derive(Debug, Clone)]
pub(crate) struct TelemetrySettings {
    pub(crate) log_level: String,
    pub(crate) json: bool,
    pub(crate) prometheus_enabled: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct RuntimeSettings {
    pub(crate) environment: Environment,
    pub(crate) strict_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Test => "test",
        }
    }

    fn from_name(value: Option<&str>) -> Self {
        match value.map(str::to_lowercase).as_deref() {
            Some("production" | "prod") => Environment::Production,
            Some("staging") => Environment::Staging,
            Some("test" | "testing") => Environment::Test,
            _ => Environment::Development,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("invalid cors origins: {0}")]
    InvalidCors(String),
    #[error("missing required secret for {0}")]
    MissingSecret(&'static str),
}

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let runtime = RuntimeSettings::from_env();
        let settings = Self {
            server: ServerSettings::from_env()?,
            api: ApiSettings {
                project_name: env_or_default("PROJECT_NAME", "Quizcomp API"),
                version: env_or_default("VERSION", env!("CARGO_PKG_VERSION")),
                api_v1_str: env_or_default("API_V1_STR", "/api/v1"),
            },
            security: SecuritySettings::from_env()?,
            cors: CorsSettings { origins: parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))? },
            database: DatabaseSettings::from_env()?,
            redis: RedisSettings::from_env()?,
            quiz: QuizSettings {
                status_interval_seconds: env_parse("QUIZ_STATUS_INTERVAL_SECONDS", 60)?,
            },
            invoice: InvoiceSettings {
                template_path: env_optional("INVOICE_TEMPLATE_PATH").map(PathBuf::from),
            },
            admin: AdminSettings {
                first_superuser_username: env_or_default("FIRST_SUPERUSER_USERNAME", "admin"),
                first_superuser_password: env_or_default("FIRST_SUPERUSER_PASSWORD", ""),
            },
            telemetry: TelemetrySettings {
                log_level: env_or_default("QUIZCOMP_LOG_LEVEL", "info"),
                json: env_flag("QUIZCOMP_LOG_JSON"),
                prometheus_enabled: env_flag("PROMETHEUS_ENABLED"),
            },
            runtime,
        };

        settings.validate()?;
        if settings.security.secret_key_generated {
            tracing::warn!("SECRET_KEY not set; issued tokens will not survive a restart");
        }

        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn quiz(&self) -> &QuizSettings {
        &self.quiz
    }

    pub(crate) fn invoice(&self) -> &InvoiceSettings {
        &self.invoice
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("QUIZ_STATUS_INTERVAL_SECONDS", self.quiz.status_interval_seconds)?;
        ensure_positive("DATABASE_MAX_CONNECTIONS", u64::from(self.database.max_connections))?;
        ensure_positive("ACCESS_TOKEN_EXPIRE_MINUTES", self.security.access_token_expire_minutes)?;

        if !self.runtime.strict_config {
            return Ok(());
        }

        if self.security.secret_key_generated {
            return Err(ConfigError::MissingSecret("SECRET_KEY"));
        }
        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.admin.first_superuser_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_SUPERUSER_PASSWORD"));
        }

        Ok(())
    }
}

impl RuntimeSettings {
    /// Production always runs strict.
    fn from_env() -> Self {
        let name = env_optional("QUIZCOMP_ENV").or_else(|| env_optional("ENVIRONMENT"));
        let environment = Environment::from_name(name.as_deref());
        let strict_config =
            env_flag("QUIZCOMP_STRICT_CONFIG") || environment == Environment::Production;
        Self { environment, strict_config }
    }
}

impl ServerSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("QUIZCOMP_HOST", "0.0.0.0");
        let port: u16 = env_parse("QUIZCOMP_PORT", 8000)?;
        if port == 0 {
            return Err(ConfigError::InvalidValue { field: "QUIZCOMP_PORT", value: "0".into() });
        }
        Ok(Self { host, port })
    }
}

impl SecuritySettings {
    fn from_env() -> Result<Self, ConfigError> {
        let (secret_key, secret_key_generated) = match env_optional("SECRET_KEY") {
            Some(value) => (value, false),
            None => (generate_secret_key(), true),
        };

        Ok(Self {
            secret_key,
            secret_key_generated,
            access_token_expire_minutes: env_parse("ACCESS_TOKEN_EXPIRE_MINUTES", 1440)?,
            algorithm: env_or_default("ALGORITHM", "HS256"),
            login_rate_limit: env_parse("LOGIN_RATE_LIMIT", 10)?,
            login_rate_window_seconds: env_parse("LOGIN_RATE_WINDOW_SECONDS", 60)?,
        })
    }
}

impl DatabaseSettings {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            postgres_server: env_or_default("POSTGRES_SERVER", "localhost"),
            postgres_port: env_parse("POSTGRES_PORT", 5432)?,
            postgres_user: env_or_default("POSTGRES_USER", "quizcomp"),
            postgres_password: env_or_default("POSTGRES_PASSWORD", ""),
            postgres_db: env_or_default("POSTGRES_DB", "quizcomp_db"),
            database_url: env_optional("DATABASE_URL"),
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 20)?,
        })
    }

    /// `DATABASE_URL` wins over the individual `POSTGRES_*` parts.
    pub(crate) fn database_url(&self) -> String {
        match &self.database_url {
            Some(url) => url.clone(),
            None => format!(
                "postgresql://{}:{}@{}:{}/{}",
                self.postgres_user,
                self.postgres_password,
                self.postgres_server,
                self.postgres_port,
                self.postgres_db
            ),
        }
    }
}

impl RedisSettings {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_or_default("REDIS_HOST", "localhost"),
            port: env_parse("REDIS_PORT", 6379)?,
            db: env_parse("REDIS_DB", 0)?,
            password: env_or_default("REDIS_PASSWORD", ""),
        })
    }

    pub(crate) fn redis_url(&self) -> String {
        let auth = if self.password.is_empty() { String::new() } else { format!(":{}@", self.password) };
        format!("redis://{auth}{}:{}/{}", self.host, self.port, self.db)
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

fn env_flag(key: &str) -> bool {
    env_optional(key).is_some_and(|value| parse_bool(&value))
}

fn env_parse<T: FromStr>(field: &'static str, default: T) -> Result<T, ConfigError> {
    match env_optional(field) {
        Some(value) => parse_value(field, value),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(field: &'static str, value: String) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn ensure_positive(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue { field, value: "0".into() });
    }
    Ok(())
}

/// Accepts a JSON array or a comma separated list; empty input keeps the defaults.
fn parse_cors_origins(value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let raw = value.unwrap_or_default();
    let origins: Vec<String> = if raw.trim_start().starts_with('[') {
        serde_json::from_str(&raw).map_err(|_| ConfigError::InvalidCors(raw.clone()))?
    } else {
        raw.split(',').map(str::trim).filter(|item| !item.is_empty()).map(String::from).collect()
    };

    if origins.is_empty() {
        return Ok(DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect());
    }
    Ok(origins)
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn generate_secret_key() -> String {
    let mut bytes = [0u8; 64];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_origins_accept_json_and_csv() {
        let json = parse_cors_origins(Some("[\"http://a\",\"http://b\"]".to_string())).expect("json");
        let csv = parse_cors_origins(Some("http://a, http://b".to_string())).expect("csv");
        assert_eq!(json, vec!["http://a".to_string(), "http://b".to_string()]);
        assert_eq!(json, csv);
    }

    #[test]
    fn cors_origins_fall_back_to_defaults() {
        assert_eq!(parse_cors_origins(None).expect("defaults").len(), DEFAULT_CORS_ORIGINS.len());
        assert_eq!(parse_cors_origins(Some(" , ".into())).expect("blank").len(), 3);
        let err = parse_cors_origins(Some("[\"http://a\"".to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCors(_)));
    }

    #[test]
    fn flags_and_environments() {
        assert!(parse_bool("Yes"));
        assert!(parse_bool("ON"));
        assert!(!parse_bool("0"));
        assert_eq!(Environment::from_name(Some("Prod")), Environment::Production);
        assert_eq!(Environment::from_name(Some("testing")), Environment::Test);
        assert_eq!(Environment::from_name(None), Environment::Development);
    }

    #[test]
    fn numeric_values_report_their_field() {
        let err = parse_value::<u16>("REDIS_PORT", "70000".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for REDIS_PORT: 70000");
        assert!(ensure_positive("QUIZ_STATUS_INTERVAL_SECONDS", 0).is_err());
    }

    #[test]
    fn redis_url_includes_password_when_set() {
        let mut settings = RedisSettings {
            host: "cache".to_string(),
            port: 6380,
            db: 2,
            password: "s3cret".to_string(),
        };
        assert_eq!(settings.redis_url(), "redis://:s3cret@cache:6380/2");
        settings.password.clear();
        assert_eq!(settings.redis_url(), "redis://cache:6380/2");
    }
}
