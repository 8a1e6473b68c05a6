//! Request factory defaults and environment configuration.
//!
//! [`FactoryDefaults`] describes the simulated server environment every
//! request is built against. The defaults can be overridden in code or read
//! from `VIEWTEST_*` environment variables (and a `.env` file).

use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::str::FromStr;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::uri::Scheme;

pub const SERVER_NAME_VAR: &str = "VIEWTEST_SERVER_NAME";
pub const SERVER_PORT_VAR: &str = "VIEWTEST_SERVER_PORT";
pub const SCHEME_VAR: &str = "VIEWTEST_SCHEME";
pub const REMOTE_ADDR_VAR: &str = "VIEWTEST_REMOTE_ADDR";

/// Load environment variables from a `.env` file if one exists.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Load environment variables from the given file. Variables already set win.
pub fn load_dotenv_from(path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    dotenvy::from_path(path).map_err(|e| ConfigError::File {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Get a required environment variable.
pub fn get_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key.to_string()))
}

/// Get an optional environment variable with a default value.
pub fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get and parse an environment variable.
pub fn get_env_parsed<T: FromStr>(key: &str) -> Result<T, ConfigError> {
    let value = get_env(key)?;
    value.parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value,
    })
}

/// Get and parse an environment variable, falling back on absence or parse failure.
pub fn get_env_parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Configuration loading errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Environment variable is not set.
    Missing(String),
    /// Environment variable value is invalid.
    Invalid { key: String, value: String },
    /// Environment file could not be read or parsed.
    File { path: String, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => {
                write!(f, "Missing required environment variable '{}'", key)
            }
            ConfigError::Invalid { key, value } => {
                write!(
                    f,
                    "Invalid value '{}' for environment variable '{}'",
                    value, key
                )
            }
            ConfigError::File { path, reason } => {
                write!(f, "Failed to load environment file '{}': {}", path, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// The simulated server environment applied to every built request.
#[derive(Debug, Clone)]
pub struct FactoryDefaults {
    /// Host name used for the `Host` header.
    pub server_name: String,
    /// Port appended to the `Host` header unless it is the scheme's default.
    /// `None` means the scheme's default port.
    pub server_port: Option<u16>,
    pub scheme: Scheme,
    /// Address recorded as the client's address.
    pub remote_addr: IpAddr,
    /// Headers applied before any per-call header.
    pub headers: HeaderMap,
}

impl Default for FactoryDefaults {
    fn default() -> Self {
        Self {
            server_name: "testserver".to_string(),
            server_port: None,
            scheme: Scheme::HTTP,
            remote_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            headers: HeaderMap::new(),
        }
    }
}

impl FactoryDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads defaults from the environment and `.env`, ignoring unparsable values.
    pub fn from_env() -> Self {
        load_dotenv();
        Self::read_env()
    }

    /// Like [`from_env`](Self::from_env), loading variables from `path` instead of `.env`.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_dotenv_from(path)?;
        Ok(Self::read_env())
    }

    /// Reads defaults from the environment and `.env`, failing on any invalid value.
    pub fn from_env_strict() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::read_env_strict()
    }

    fn read_env() -> Self {
        let fallback = Self::default();
        Self {
            server_name: get_env_or(SERVER_NAME_VAR, &fallback.server_name),
            server_port: get_env_parsed(SERVER_PORT_VAR).ok(),
            scheme: get_env(SCHEME_VAR)
                .ok()
                .and_then(|s| parse_scheme(&s))
                .unwrap_or(fallback.scheme),
            remote_addr: get_env_parsed_or(REMOTE_ADDR_VAR, fallback.remote_addr),
            headers: fallback.headers,
        }
    }

    fn read_env_strict() -> Result<Self, ConfigError> {
        let mut defaults = Self::default();

        if let Ok(name) = get_env(SERVER_NAME_VAR) {
            defaults.server_name = name;
        }
        if env::var(SERVER_PORT_VAR).is_ok() {
            defaults.server_port = Some(get_env_parsed(SERVER_PORT_VAR)?);
        }
        if let Ok(scheme) = get_env(SCHEME_VAR) {
            defaults.scheme = parse_scheme(&scheme).ok_or(ConfigError::Invalid {
                key: SCHEME_VAR.to_string(),
                value: scheme,
            })?;
        }
        if env::var(REMOTE_ADDR_VAR).is_ok() {
            defaults.remote_addr = get_env_parsed(REMOTE_ADDR_VAR)?;
        }

        Ok(defaults)
    }

    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    pub fn server_port(mut self, port: u16) -> Self {
        self.server_port = Some(port);
        self
    }

    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn remote_addr(mut self, addr: IpAddr) -> Self {
        self.remote_addr = addr;
        self
    }

    /// Adds a default header sent with every request.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The `Host` header value for a request built with `scheme`.
    pub fn host(&self, scheme: &Scheme) -> String {
        match self.server_port {
            Some(port) if port != default_port(scheme) => {
                format!("{}:{}", self.server_name, port)
            }
            _ => self.server_name.clone(),
        }
    }
}

fn default_port(scheme: &Scheme) -> u16 {
    if *scheme == Scheme::HTTPS { 443 } else { 80 }
}

fn parse_scheme(value: &str) -> Option<Scheme> {
    match value.to_ascii_lowercase().as_str() {
        "http" => Some(Scheme::HTTP),
        "https" => Some(Scheme::HTTPS),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_vars() {
        // SAFETY: tests touching the environment run serially.
        unsafe {
            env::remove_var(SERVER_NAME_VAR);
            env::remove_var(SERVER_PORT_VAR);
            env::remove_var(SCHEME_VAR);
            env::remove_var(REMOTE_ADDR_VAR);
        }
    }

    #[test]
    fn test_get_env_missing() {
        let result = get_env("VIEWTEST_TEST_MISSING_VAR_12345");
        assert_eq!(
            result,
            Err(ConfigError::Missing(
                "VIEWTEST_TEST_MISSING_VAR_12345".to_string()
            ))
        );
    }

    #[test]
    fn test_get_env_parsed_or_default() {
        let value: u16 = get_env_parsed_or("VIEWTEST_TEST_MISSING_VAR_12345", 8000);
        assert_eq!(value, 8000);
    }

    #[test]
    fn test_defaults() {
        let defaults = FactoryDefaults::default();
        assert_eq!(defaults.server_name, "testserver");
        assert_eq!(defaults.server_port, None);
        assert_eq!(defaults.scheme, Scheme::HTTP);
        assert_eq!(defaults.remote_addr.to_string(), "127.0.0.1");
        assert!(defaults.headers.is_empty());
    }

    #[test]
    fn test_host_omits_default_port() {
        let defaults = FactoryDefaults::new().server_port(80);
        assert_eq!(defaults.host(&Scheme::HTTP), "testserver");
        assert_eq!(defaults.host(&Scheme::HTTPS), "testserver:80");

        let defaults = FactoryDefaults::new().server_name("example.com").server_port(8443);
        assert_eq!(defaults.host(&Scheme::HTTPS), "example.com:8443");
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_vars();
        unsafe {
            env::set_var(SERVER_NAME_VAR, "api.local");
            env::set_var(SERVER_PORT_VAR, "8080");
            env::set_var(SCHEME_VAR, "HTTPS");
        }

        let defaults = FactoryDefaults::from_env();
        assert_eq!(defaults.server_name, "api.local");
        assert_eq!(defaults.server_port, Some(8080));
        assert_eq!(defaults.scheme, Scheme::HTTPS);
        assert_eq!(defaults.host(&defaults.scheme), "api.local:8080");

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_invalid_values() {
        clear_vars();
        unsafe {
            env::set_var(SERVER_PORT_VAR, "not-a-port");
            env::set_var(SCHEME_VAR, "ftp");
        }

        let defaults = FactoryDefaults::from_env();
        assert_eq!(defaults.server_port, None);
        assert_eq!(defaults.scheme, Scheme::HTTP);

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_strict_rejects_invalid_scheme() {
        clear_vars();
        unsafe {
            env::set_var(SCHEME_VAR, "ftp");
        }

        let err = FactoryDefaults::from_env_strict().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value 'ftp' for environment variable 'VIEWTEST_SCHEME'"
        );

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_strict_rejects_invalid_port() {
        clear_vars();
        unsafe {
            env::set_var(SERVER_PORT_VAR, "99999");
        }

        let err = FactoryDefaults::from_env_strict().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == SERVER_PORT_VAR));

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_file() {
        clear_vars();
        let path = env::temp_dir().join(format!("viewtest-{}.env", std::process::id()));
        std::fs::write(
            &path,
            "VIEWTEST_SERVER_NAME=dotenv.test\nVIEWTEST_REMOTE_ADDR=10.0.0.7\n",
        )
        .unwrap();

        let defaults = FactoryDefaults::from_env_file(&path).unwrap();
        assert_eq!(defaults.server_name, "dotenv.test");
        assert_eq!(defaults.remote_addr.to_string(), "10.0.0.7");

        std::fs::remove_file(&path).unwrap();
        clear_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_file_keeps_existing_vars() {
        clear_vars();
        unsafe {
            env::set_var(SERVER_NAME_VAR, "from-env");
        }
        let path = env::temp_dir().join(format!("viewtest-keep-{}.env", std::process::id()));
        std::fs::write(&path, "VIEWTEST_SERVER_NAME=from-file\n").unwrap();

        let defaults = FactoryDefaults::from_env_file(&path).unwrap();
        assert_eq!(defaults.server_name, "from-env");

        std::fs::remove_file(&path).unwrap();
        clear_vars();
    }

    #[test]
    fn test_from_env_file_missing() {
        let err = FactoryDefaults::from_env_file("/nonexistent/viewtest.env").unwrap_err();
        assert!(matches!(err, ConfigError::File { ref path, .. } if path == "/nonexistent/viewtest.env"));
    }
}
