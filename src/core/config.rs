use std::{env, fs, path::PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

const DEFAULT_CORS_ORIGINS: &[&str] =
    &["http://localhost:5173", "http://localhost:3000", "http://localhost:8080"];

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    server: ServerSettings,
    runtime: RuntimeSettings,
    api: ApiSettings,
    security: SecuritySettings,
    cors: CorsSettings,
    database: DatabaseSettings,
    oracle: OracleSettings,
    callback: CallbackSettings,
    attempt: AttemptSettings,
    telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub(crate) struct ServerSettings {
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
    pub(crate) algorithm: String,
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
}

#[derive(Debug, Clone)]
pub(crate) struct OracleSettings {
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) model: String,
    pub(crate) max_tokens: u32,
    pub(crate) request_timeout: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct CallbackSettings {
    pub(crate) grade_recorder_url: String,
    pub(crate) request_timeout: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct AttemptSettings {
    /// Seconds past the attempt deadline during which a submission is still
    /// graded normally. Later arrivals are force-submitted with grade 0.
    pub(crate) expiry_grace_seconds: i64,
    pub(crate) url_fetch_timeout: u64,
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
            Self::Development => "development",
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Test => "test",
        }
    }

    fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("invalid CORS origins: {0}")]
    InvalidCors(String),
    #[error("missing required secret: {0}")]
    MissingSecret(&'static str),
}

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("GRADEFLOW_HOST", "0.0.0.0");
        let port = parse_u16("GRADEFLOW_PORT", env_or_default("GRADEFLOW_PORT", "8000"))?;

        let environment = parse_environment(
            env_optional("GRADEFLOW_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("GRADEFLOW_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Gradeflow API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "gradeflow");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "gradeflow_db");
        let database_url = env_optional("DATABASE_URL");

        let oracle_api_key = env_or_default("ORACLE_API_KEY", "");
        let oracle_base_url = env_or_default("ORACLE_BASE_URL", "");
        let oracle_model = env_or_default("ORACLE_MODEL", "gpt-4o");
        let oracle_max_tokens =
            parse_u32("ORACLE_MAX_TOKENS", env_or_default("ORACLE_MAX_TOKENS", "4096"))?;
        let oracle_request_timeout =
            parse_u64("ORACLE_REQUEST_TIMEOUT", env_or_default("ORACLE_REQUEST_TIMEOUT", "300"))?;

        let grade_recorder_url = env_or_default("GRADE_RECORDER_URL", "");
        let grade_recorder_timeout = parse_u64(
            "GRADE_RECORDER_TIMEOUT",
            env_or_default("GRADE_RECORDER_TIMEOUT", "30"),
        )?;

        let expiry_grace_seconds = parse_u64(
            "ATTEMPT_EXPIRY_GRACE_SECONDS",
            env_or_default("ATTEMPT_EXPIRY_GRACE_SECONDS", "300"),
        )? as i64;
        let url_fetch_timeout =
            parse_u64("URL_FETCH_TIMEOUT", env_or_default("URL_FETCH_TIMEOUT", "30"))?;

        let log_level = env_or_default("GRADEFLOW_LOG_LEVEL", "info");
        let json = env_optional("GRADEFLOW_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings { host, port },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { secret_key, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            oracle: OracleSettings {
                api_key: oracle_api_key,
                base_url: oracle_base_url,
                model: oracle_model,
                max_tokens: oracle_max_tokens,
                request_timeout: oracle_request_timeout,
            },
            callback: CallbackSettings {
                grade_recorder_url,
                request_timeout: grade_recorder_timeout,
            },
            attempt: AttemptSettings { expiry_grace_seconds, url_fetch_timeout },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
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

    pub(crate) fn oracle(&self) -> &OracleSettings {
        &self.oracle
    }

    pub(crate) fn callback(&self) -> &CallbackSettings {
        &self.callback
    }

    pub(crate) fn attempt(&self) -> &AttemptSettings {
        &self.attempt
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.attempt.expiry_grace_seconds < 0 {
            return Err(ConfigError::InvalidValue {
                field: "ATTEMPT_EXPIRY_GRACE_SECONDS",
                value: self.attempt.expiry_grace_seconds.to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.oracle.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("ORACLE_API_KEY"));
        }
        if self.oracle.base_url.is_empty() {
            return Err(ConfigError::MissingSecret("ORACLE_BASE_URL"));
        }
        if self.callback.grade_recorder_url.is_empty() {
            return Err(ConfigError::MissingSecret("GRADE_RECORDER_URL"));
        }

        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            server: ServerSettings { host: "127.0.0.1".to_string(), port: 8000 },
            runtime: RuntimeSettings { environment: Environment::Test, strict_config: false },
            api: ApiSettings {
                project_name: "Gradeflow API".to_string(),
                version: "0.0.0".to_string(),
                api_v1_str: "/api/v1".to_string(),
            },
            security: SecuritySettings {
                secret_key: "test-secret".to_string(),
                algorithm: "HS256".to_string(),
            },
            cors: CorsSettings {
                origins: DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect(),
            },
            database: DatabaseSettings {
                postgres_server: "localhost".to_string(),
                postgres_port: 5432,
                postgres_user: "gradeflow".to_string(),
                postgres_password: String::new(),
                postgres_db: "gradeflow_test".to_string(),
                database_url: None,
            },
            oracle: OracleSettings {
                api_key: String::new(),
                base_url: "http://localhost:9900".to_string(),
                model: "test-model".to_string(),
                max_tokens: 256,
                request_timeout: 5,
            },
            callback: CallbackSettings {
                grade_recorder_url: "http://localhost:9901".to_string(),
                request_timeout: 5,
            },
            attempt: AttemptSettings { expiry_grace_seconds: 300, url_fetch_timeout: 5 },
            telemetry: TelemetrySettings {
                log_level: "info".to_string(),
                json: false,
                prometheus_enabled: false,
            },
        }
    }
}

impl DatabaseSettings {
    pub(crate) fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }

        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.postgres_user,
            self.postgres_password,
            self.postgres_server,
            self.postgres_port,
            self.postgres_db
        )
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_u16(field: &'static str, value: String) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_u32(field: &'static str, value: String) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

fn parse_environment(value: Option<String>) -> Environment {
    match value.as_deref().map(|item| item.to_lowercase()) {
        Some(ref val) if val == "production" || val == "prod" => Environment::Production,
        Some(ref val) if val == "staging" => Environment::Staging,
        Some(ref val) if val == "test" || val == "testing" => Environment::Test,
        _ => Environment::Development,
    }
}

fn parse_cors_origins(value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let Some(raw) = value else {
        return Ok(default_cors_origins());
    };

    if raw.trim().is_empty() {
        return Ok(default_cors_origins());
    }

    if raw.trim_start().starts_with('[') {
        let parsed: Vec<String> =
            serde_json::from_str(&raw).map_err(|_| ConfigError::InvalidCors(raw.clone()))?;
        if parsed.is_empty() {
            return Ok(default_cors_origins());
        }
        return Ok(parsed);
    }

    let items: Vec<String> =
        raw.split(',').map(|item| item.trim().to_string()).filter(|item| !item.is_empty()).collect();

    if items.is_empty() {
        return Ok(default_cors_origins());
    }

    Ok(items)
}

fn default_cors_origins() -> Vec<String> {
    DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect()
}

fn load_or_create_secret_key() -> String {
    let path = secret_key_path();

    if let Ok(existing) = fs::read_to_string(&path) {
        let trimmed = existing.trim().to_string();
        if !trimmed.is_empty() {
            return trimmed;
        }
    }

    let mut bytes = [0_u8; 48];
    OsRng.fill_bytes(&mut bytes);
    let key = URL_SAFE_NO_PAD.encode(bytes);

    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Err(err) = fs::write(&path, &key) {
        tracing::warn!(error = %err, "Failed to persist generated secret key");
    }

    key
}

fn secret_key_path() -> PathBuf {
    env_optional("SECRET_KEY_FILE").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".secret_key"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cors_origins_json() {
        let raw = "[\"http://a\",\"http://b\"]".to_string();
        let parsed = parse_cors_origins(Some(raw)).expect("cors json");
        assert_eq!(parsed, vec!["http://a".to_string(), "http://b".to_string()]);
    }

    #[test]
    fn parse_cors_origins_csv() {
        let raw = "http://a, http://b".to_string();
        let parsed = parse_cors_origins(Some(raw)).expect("cors csv");
        assert_eq!(parsed, vec!["http://a".to_string(), "http://b".to_string()]);
    }

    #[test]
    fn parse_cors_origins_defaults_on_empty() {
        let parsed = parse_cors_origins(Some(" ".to_string())).expect("cors empty");
        assert_eq!(parsed, default_cors_origins());
    }

    #[test]
    fn parse_environment_recognizes_aliases() {
        assert_eq!(parse_environment(Some("prod".to_string())), Environment::Production);
        assert_eq!(parse_environment(Some("testing".to_string())), Environment::Test);
        assert_eq!(parse_environment(None), Environment::Development);
    }

    #[test]
    fn parse_bool_accepts_common_truthy_values() {
        assert!(parse_bool("1"));
        assert!(parse_bool("yes"));
        assert!(!parse_bool("off"));
    }
}
