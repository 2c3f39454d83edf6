use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Which stage the housing desk is running in. Controls log defaults only;
/// the pipeline behaves the same everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "test" | "ci" => Self::Test,
            "prod" | "production" => Self::Production,
            _ => Self::Development,
        }
    }
}

/// Everything the binary reads from the environment, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub roster: RosterConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&env_or("APP_ENV", "development"));

        let host = env_or("APP_HOST", "127.0.0.1");
        let port = env_or("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env_or("APP_LOG_LEVEL", "info");
        let ansi = matches!(
            env_or("APP_LOG_ANSI", "").trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes"
        );

        let inventory_csv = env::var("APP_ROSTER_INVENTORY").ok().map(PathBuf::from);
        let students_csv = env::var("APP_ROSTER_STUDENTS").ok().map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, ansi },
            roster: RosterConfig {
                inventory_csv,
                students_csv,
            },
        })
    }
}

/// Bind address for the HTTP listener.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// `APP_HOST` accepts an IP literal or the word `localhost`; hostnames
    /// beyond that are not resolved.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok((Ipv4Addr::LOCALHOST, self.port).into());
        }

        let ip = self
            .host
            .parse::<IpAddr>()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Log filter and output styling.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Optional CSV exports to seed dormitories, rooms, and students at startup.
#[derive(Debug, Clone, Default)]
pub struct RosterConfig {
    pub inventory_csv: Option<PathBuf>,
    pub students_csv: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT is not a valid port number"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST is neither an IP address nor localhost")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    // Env vars are process-global; serialize the tests that touch them.
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
            "APP_LOG_ANSI",
            "APP_ROSTER_INVENTORY",
            "APP_ROSTER_STUDENTS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(!config.telemetry.ansi);
        assert!(config.roster.inventory_csv.is_none());
        assert!(config.roster.students_csv.is_none());
    }

    #[test]
    fn localhost_resolves_to_loopback() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::from((Ipv4Addr::LOCALHOST, 3000)));
    }

    #[test]
    fn rejects_a_non_numeric_port() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_PORT", "not-a-port");
        match AppConfig::load() {
            Err(ConfigError::InvalidPort) => {}
            other => panic!("expected invalid port error, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn roster_paths_read_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ROSTER_INVENTORY", "/srv/exports/rooms.csv");
        env::set_var("APP_ROSTER_STUDENTS", "/srv/exports/students.csv");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.roster.inventory_csv,
            Some(PathBuf::from("/srv/exports/rooms.csv"))
        );
        assert_eq!(
            config.roster.students_csv,
            Some(PathBuf::from("/srv/exports/students.csv"))
        );
        reset_env();
    }
}
