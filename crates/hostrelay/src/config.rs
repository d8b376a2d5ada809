//! Server configuration.

use hostrelay_session::SessionConfig;

use crate::HostrelayError;

/// Everything the binary can tune at startup.
///
/// [`ServerConfig::from_env`] reads:
///
/// | Variable                     | Default          |
/// |------------------------------|------------------|
/// | `HOSTRELAY_HTTP_ADDR`        | `127.0.0.1:8080` |
/// | `HOSTRELAY_REALTIME_ADDR`    | `127.0.0.1:8081` |
/// | `HOSTRELAY_SESSION_TTL_SECS` | `3600`           |
/// | `HOSTRELAY_SECURE_COOKIES`   | `true`           |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address of the REST API.
    pub http_addr: String,
    /// Address of the WebSocket listener serving `/hubs/lobby` and
    /// `/hubs/game`.
    pub realtime_addr: String,
    pub session: SessionConfig,
    /// Adds `Secure` to the session cookie. Turn off only for plain-HTTP
    /// local development.
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:8080".to_string(),
            realtime_addr: "127.0.0.1:8081".to_string(),
            session: SessionConfig::default(),
            secure_cookies: true,
        }
    }
}

impl ServerConfig {
    /// Builds a config from the process environment, falling back to the
    /// defaults for unset variables.
    ///
    /// # Errors
    /// [`HostrelayError::Config`] if a variable is set but unparsable.
    pub fn from_env() -> Result<Self, HostrelayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, HostrelayError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("HOSTRELAY_HTTP_ADDR") {
            config.http_addr = addr;
        }
        if let Some(addr) = lookup("HOSTRELAY_REALTIME_ADDR") {
            config.realtime_addr = addr;
        }
        if let Some(ttl) = lookup("HOSTRELAY_SESSION_TTL_SECS") {
            config.session.session_ttl_secs = ttl
                .trim()
                .parse::<u32>()
                .map(i64::from)
                .map_err(|e| {
                    HostrelayError::Config(format!("HOSTRELAY_SESSION_TTL_SECS={ttl:?}: {e}"))
                })?;
        }
        if let Some(flag) = lookup("HOSTRELAY_SECURE_COOKIES") {
            config.secure_cookies = parse_bool(&flag).ok_or_else(|| {
                HostrelayError::Config(format!("HOSTRELAY_SECURE_COOKIES={flag:?}"))
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
