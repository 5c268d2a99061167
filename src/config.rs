// Runtime configuration.
// Defaults match the portfolio site; environment variables override them.

use std::time::Duration;

/// Default GitHub account whose pinned repositories are showcased.
pub const DEFAULT_USERNAME: &str = "smpsandro1239";

/// Default number of projects rendered by callers.
pub const DEFAULT_MAX_PROJECTS: usize = 6;

/// Cache entries are considered fresh for 5 minutes.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// GitHub account name (public, unauthenticated identity).
    pub username: String,
    /// Upper bound on projects handed to rendering callers.
    pub max_projects: usize,
    /// Freshness window for cached data.
    pub cache_ttl: Duration,
    /// Optional bearer token. Anonymous access works, with a lower quota.
    pub token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            max_projects: DEFAULT_MAX_PROJECTS,
            cache_ttl: DEFAULT_CACHE_TTL,
            token: None,
        }
    }
}

impl Config {
    /// Build a configuration from the environment.
    /// `MONTRA_USER` overrides the account; `GITHUB_TOKEN` enables auth.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(username) = std::env::var("MONTRA_USER") {
            if !username.is_empty() {
                config.username = username;
            }
        }
        config.token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.username, DEFAULT_USERNAME);
        assert_eq!(config.max_projects, 6);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert!(config.token.is_none());
    }
}
