use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub upstream: UpstreamConfig,
    pub auth: AuthConfig,
    pub snapshots: SnapshotConfig,
    pub scheduler: SchedulerConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub auth_url: String,
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Client credential document posted to the upstream auth endpoint
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "companyName")]
    pub company_name: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
    #[serde(rename = "ownerName")]
    pub owner_name: String,
    #[serde(rename = "ownerEmail")]
    pub owner_email: String,
    #[serde(rename = "rollNo")]
    pub roll_no: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("company_name", &self.company_name)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("owner_name", &self.owner_name)
            .field("owner_email", &self.owner_email)
            .field("roll_no", &self.roll_no)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    pub user_ranking_path: String,
    pub post_ranking_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub user_interval_secs: u64,
    pub post_interval_secs: u64,
    pub initial_delay_secs: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueryConfig {
    pub top_users_limit: usize,
    pub latest_posts_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_users_limit: 5,
            latest_posts_limit: 5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let base_url = var("UPSTREAM_BASE_URL", "http://20.244.56.144/test");
        let auth_url = lookup("UPSTREAM_AUTH_URL")
            .unwrap_or_else(|| format!("{}/auth", base_url.trim_end_matches('/')));

        Ok(Config {
            app: AppConfig {
                env: var("APP_ENV", "development"),
                host: var("APP_HOST", "0.0.0.0"),
                port: parse_var(&lookup, "APP_PORT", 3000)?,
                log_level: var("LOG_LEVEL", "info"),
            },
            upstream: UpstreamConfig {
                base_url,
                auth_url,
                timeout_secs: parse_var(
                    &lookup,
                    "UPSTREAM_TIMEOUT_SECS",
                    default_upstream_timeout_secs(),
                )?,
            },
            auth: AuthConfig {
                company_name: var("AUTH_COMPANY_NAME", ""),
                client_id: lookup("AUTH_CLIENT_ID").ok_or(ConfigError::Missing("AUTH_CLIENT_ID"))?,
                client_secret: lookup("AUTH_CLIENT_SECRET")
                    .ok_or(ConfigError::Missing("AUTH_CLIENT_SECRET"))?,
                owner_name: var("AUTH_OWNER_NAME", ""),
                owner_email: var("AUTH_OWNER_EMAIL", ""),
                roll_no: var("AUTH_ROLL_NO", ""),
            },
            snapshots: SnapshotConfig {
                user_ranking_path: var("USER_SNAPSHOT_PATH", "heap.json"),
                post_ranking_path: var("POST_SNAPSHOT_PATH", "popular_posts.json"),
            },
            scheduler: SchedulerConfig {
                enabled: parse_var(&lookup, "REFRESH_SCHEDULER_ENABLED", true)?,
                user_interval_secs: parse_var(&lookup, "USER_REFRESH_INTERVAL_SECS", 30 * 60)?,
                post_interval_secs: parse_var(&lookup, "POST_REFRESH_INTERVAL_SECS", 15 * 60)?,
                initial_delay_secs: parse_var(&lookup, "REFRESH_INITIAL_DELAY_SECS", 5)?,
            },
            query: QueryConfig {
                top_users_limit: parse_var(&lookup, "TOP_USERS_LIMIT", 5)?,
                latest_posts_limit: parse_var(&lookup, "LATEST_POSTS_LIMIT", 5)?,
            },
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn default_upstream_timeout_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const CREDENTIALS: [(&str, &str); 2] = [
        ("AUTH_CLIENT_ID", "client-1"),
        ("AUTH_CLIENT_SECRET", "s3cret"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&CREDENTIALS)).unwrap();

        assert_eq!(config.app.port, 3000);
        assert_eq!(config.upstream.base_url, "http://20.244.56.144/test");
        assert_eq!(config.upstream.auth_url, "http://20.244.56.144/test/auth");
        assert_eq!(config.upstream.timeout(), Duration::from_secs(10));
        assert_eq!(config.snapshots.user_ranking_path, "heap.json");
        assert_eq!(config.snapshots.post_ranking_path, "popular_posts.json");
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.user_interval_secs, 1800);
        assert_eq!(config.scheduler.post_interval_secs, 900);
        assert_eq!(config.query.top_users_limit, 5);
        assert_eq!(config.query.latest_posts_limit, 5);
    }

    #[test]
    fn test_auth_url_follows_base_url() {
        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("UPSTREAM_BASE_URL", "http://localhost:9000/api/"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.upstream.auth_url, "http://localhost:9000/api/auth");
    }

    #[test]
    fn test_missing_secret() {
        let err = Config::from_lookup(lookup_from(&[("AUTH_CLIENT_ID", "x")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("AUTH_CLIENT_SECRET")));
    }

    #[test]
    fn test_invalid_port() {
        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("APP_PORT", "eighty"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "APP_PORT", .. }));
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let config = Config::from_lookup(lookup_from(&CREDENTIALS)).unwrap();
        let rendered = format!("{:?}", config.auth);
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("client-1"));
    }

    #[test]
    fn test_credentials_wire_names() {
        let config = Config::from_lookup(lookup_from(&CREDENTIALS)).unwrap();
        let body = serde_json::to_value(&config.auth).unwrap();
        assert_eq!(body["clientID"], "client-1");
        assert_eq!(body["clientSecret"], "s3cret");
        assert!(body.get("companyName").is_some());
        assert!(body.get("rollNo").is_some());
    }
}
