use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the portal.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub messaging: MessagingConfig,
    pub session: SessionConfig,
    pub seed_admin: SeedAdminConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));

        let host = var_or("APP_HOST", "127.0.0.1");
        let port = var_or("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = var_or("APP_LOG_LEVEL", "info");

        let database_url = var_or("APP_DATABASE_URL", "sqlite://student_housing.db");
        if !database_url.starts_with("sqlite:") {
            return Err(ConfigError::InvalidDatabaseUrl);
        }

        let app_name = var_or("APP_NAME", "Harambee Student Living");
        let mail_from = var_or("APP_MAIL_FROM", "noreply@harambee.com");
        let sms_enabled = parse_flag("APP_SMS_ENABLED", &var_or("APP_SMS_ENABLED", "false"))?;

        let idle_timeout_secs = var_or("APP_SESSION_TIMEOUT_SECS", "7200")
            .parse::<u32>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidSessionTimeout)?;

        let seed_admin = SeedAdminConfig {
            username: var_or("APP_ADMIN_USERNAME", "admin"),
            email: var_or("APP_ADMIN_EMAIL", "admin@example.com"),
            password: var_or("APP_ADMIN_PASSWORD", "admin123"),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage: StorageConfig { database_url },
            messaging: MessagingConfig {
                app_name,
                mail_from,
                sms_enabled,
            },
            session: SessionConfig { idle_timeout_secs },
            seed_admin,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { key }),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location of the SQLite database backing the portal.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_url: String,
}

/// Branding and delivery switches for outbound notices.
#[derive(Debug, Clone)]
pub struct MessagingConfig {
    pub app_name: String,
    pub mail_from: String,
    pub sms_enabled: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub idle_timeout_secs: u32,
}

/// Master admin account created when the user table is empty.
#[derive(Debug, Clone)]
pub struct SeedAdminConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSessionTimeout,
    InvalidDatabaseUrl,
    InvalidFlag { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSessionTimeout => {
                write!(f, "APP_SESSION_TIMEOUT_SECS must be a positive number of seconds")
            }
            ConfigError::InvalidDatabaseUrl => {
                write!(f, "APP_DATABASE_URL must be a sqlite: connection string")
            }
            ConfigError::InvalidFlag { key } => {
                write!(f, "{key} must be one of true/false, yes/no, on/off, 1/0")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidSessionTimeout
            | ConfigError::InvalidDatabaseUrl
            | ConfigError::InvalidFlag { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_DATABASE_URL",
            "APP_NAME",
            "APP_MAIL_FROM",
            "APP_SMS_ENABLED",
            "APP_SESSION_TIMEOUT_SECS",
            "APP_ADMIN_USERNAME",
            "APP_ADMIN_EMAIL",
            "APP_ADMIN_PASSWORD",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.storage.database_url, "sqlite://student_housing.db");
        assert_eq!(config.messaging.app_name, "Harambee Student Living");
        assert!(!config.messaging.sms_enabled);
        assert_eq!(config.session.idle_timeout_secs, 7200);
        assert_eq!(config.seed_admin.username, "admin");
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn parses_sms_flag_and_rejects_garbage() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_SMS_ENABLED", "yes");
        assert!(AppConfig::load().expect("config loads").messaging.sms_enabled);

        env::set_var("APP_SMS_ENABLED", "sometimes");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidFlag {
                key: "APP_SMS_ENABLED"
            })
        ));
        reset_env();
    }

    #[test]
    fn rejects_zero_session_timeout() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_SESSION_TIMEOUT_SECS", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidSessionTimeout)
        ));
        reset_env();
    }

    #[test]
    fn database_url_must_name_sqlite() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_DATABASE_URL", "sqlite::memory:");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.storage.database_url, "sqlite::memory:");

        env::set_var("APP_DATABASE_URL", "postgres://localhost/housing");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidDatabaseUrl)
        ));
        reset_env();
    }
}
