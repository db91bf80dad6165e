//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use supabase_client::{SupabaseConfig, SupabaseError};

/// Dashboard server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// External base URL, used for OAuth and recovery redirects.
    pub public_url: String,
    /// Backend connection settings.
    pub supabase: SupabaseConfig,
    /// Size of the initial recent-activity batch.
    pub recent_activity_limit: usize,
    /// Entries per history page.
    pub history_page_size: usize,
    /// How often liveness is re-evaluated without new heartbeats.
    pub liveness_tick: Duration,
    /// Sign-in sessions unused for this long are dropped.
    pub session_idle: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `DASHBOARD_ADDR` | Server bind address | `127.0.0.1:8790` |
    /// | `DASHBOARD_PUBLIC_URL` | External base URL | `http://<DASHBOARD_ADDR>` |
    /// | `SUPABASE_URL` | Backend base URL | (required) |
    /// | `SUPABASE_ANON_KEY` | Backend public anon key | (required) |
    /// | `RECENT_ACTIVITY_LIMIT` | Initial live feed size | `20` |
    /// | `HISTORY_PAGE_SIZE` | History page size | `50` |
    /// | `LIVENESS_TICK_SECS` | Liveness re-evaluation period | `60` |
    /// | `SESSION_IDLE_MINUTES` | Idle time before a sign-in expires | `720` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("DASHBOARD_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8790".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let public_url = env::var("DASHBOARD_PUBLIC_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| format!("http://{}", addr));

        let supabase = SupabaseConfig::from_env().map_err(ConfigError::Supabase)?;

        let recent_activity_limit = parse_positive("RECENT_ACTIVITY_LIMIT", 20)?;
        let history_page_size = parse_positive("HISTORY_PAGE_SIZE", 50)?;
        let liveness_tick = Duration::from_secs(parse_positive("LIVENESS_TICK_SECS", 60)?);
        let session_idle =
            Duration::from_secs(parse_positive::<u64>("SESSION_IDLE_MINUTES", 720)?.saturating_mul(60));

        Ok(Self {
            addr,
            public_url,
            supabase,
            recent_activity_limit,
            history_page_size,
            liveness_tick,
            session_idle,
        })
    }

    /// Session cookies are marked `Secure` when the dashboard is served
    /// over HTTPS.
    pub fn secure_cookies(&self) -> bool {
        self.public_url.starts_with("https://")
    }

    /// Absolute URL for a dashboard path.
    pub fn public_link(&self, path: &str) -> String {
        format!("{}{}", self.public_url, path)
    }
}

fn parse_positive<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    let Ok(raw) = env::var(name) else {
        return Ok(default);
    };

    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(ConfigError::InvalidNumber { name, value: raw }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid DASHBOARD_ADDR format")]
    InvalidAddr,

    #[error("{name} must be a positive number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error(transparent)]
    Supabase(SupabaseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positive_default_when_unset() {
        assert_eq!(
            parse_positive::<usize>("DASHBOARD_TEST_UNSET_NUMBER", 20).unwrap(),
            20
        );
    }

    #[test]
    fn test_parse_positive_rejects_zero_and_garbage() {
        env::set_var("DASHBOARD_TEST_ZERO", "0");
        env::set_var("DASHBOARD_TEST_GARBAGE", "many");
        env::set_var("DASHBOARD_TEST_VALID", " 35 ");

        assert!(matches!(
            parse_positive::<usize>("DASHBOARD_TEST_ZERO", 20),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_positive::<u64>("DASHBOARD_TEST_GARBAGE", 60),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert_eq!(parse_positive::<usize>("DASHBOARD_TEST_VALID", 20).unwrap(), 35);
    }

    #[test]
    fn test_public_link() {
        let config = Config {
            addr: "127.0.0.1:8790".parse().unwrap(),
            public_url: "https://blocker.example.com".to_string(),
            supabase: SupabaseConfig::new("https://project.supabase.co", "anon"),
            recent_activity_limit: 20,
            history_page_size: 50,
            liveness_tick: Duration::from_secs(60),
            session_idle: Duration::from_secs(3600),
        };

        assert_eq!(
            config.public_link("/auth/callback"),
            "https://blocker.example.com/auth/callback"
        );
        assert!(config.secure_cookies());
    }
}
