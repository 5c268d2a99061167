// Caching GitHub client.
// Cache-first reads with a network fetch on miss and a stale-cache fallback
// on failure. Repositories propagate unrecoverable errors to the caller;
// user stats degrade to a zero record instead.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{CacheStats, CacheStore, FileStorage, Storage};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::Result;

use super::fetcher::RepositoryFetcher;
use super::gateway::{Gateway, HttpGateway};
use super::rate_limit::RateLimiter;
use super::types::{Project, UserStats};

/// Namespace prefix for every cache key this client writes.
pub const CACHE_PREFIX: &str = "github-api";

/// Client facade over the cache store, rate limiter, and fetcher.
pub struct GitHubClient {
    config: Config,
    cache: CacheStore,
    fetcher: RepositoryFetcher,
}

impl GitHubClient {
    /// Build a client with the default capabilities: HTTPS transport,
    /// file-backed cache, system clock.
    pub fn new(config: Config) -> Result<Self> {
        let gateway = HttpGateway::new(config.token.as_deref())?;
        let storage = FileStorage::open_default()?;
        Ok(Self::with_parts(
            config,
            Box::new(gateway),
            Box::new(storage),
            Arc::new(SystemClock),
        ))
    }

    /// Assemble a client from explicit capabilities.
    pub fn with_parts(
        config: Config,
        gateway: Box<dyn Gateway>,
        storage: Box<dyn Storage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(clock.clone()));
        let cache = CacheStore::new(storage, clock, CACHE_PREFIX, config.cache_ttl);
        let fetcher = RepositoryFetcher::new(gateway, limiter);
        Self {
            config,
            cache,
            fetcher,
        }
    }

    pub fn username(&self) -> &str {
        &self.config.username
    }

    pub fn max_projects(&self) -> usize {
        self.config.max_projects
    }

    /// Get up to `limit` showcase projects.
    ///
    /// The cache always holds the full normalized list, so a small `limit`
    /// never starves a later call asking for more.
    pub async fn get_repositories(&self, limit: usize) -> Result<Vec<Project>> {
        let key = self.repos_key();

        if let Some(projects) = self.cache.get::<Vec<Project>>(&key) {
            debug!("using cached repository data");
            return Ok(trim(projects, limit));
        }

        debug!("fetching repositories from GitHub API");
        match self.fetcher.fetch_projects(&self.config.username).await {
            Ok(projects) => {
                self.cache.set(&key, &projects);
                Ok(trim(projects, limit))
            }
            Err(err) => {
                warn!(error = %err, "repository fetch failed");
                if let Some(stale) = self.cache.get_stale::<Vec<Project>>(&key) {
                    debug!("using stale cache data as fallback");
                    return Ok(trim(stale, limit));
                }
                Err(err)
            }
        }
    }

    /// Get the profile statistics record.
    ///
    /// Never fails: stats are decorative, so total failure collapses to the
    /// zero-valued default instead of an error.
    pub async fn get_user_stats(&self) -> UserStats {
        let key = self.user_key();

        if let Some(stats) = self.cache.get::<UserStats>(&key) {
            debug!("using cached user stats");
            return stats;
        }

        match self.fetcher.fetch_user_stats(&self.config.username).await {
            Ok(stats) => {
                self.cache.set(&key, &stats);
                stats
            }
            Err(err) => {
                warn!(error = %err, "user stats fetch failed");
                self.cache
                    .get_stale::<UserStats>(&key)
                    .unwrap_or_default()
            }
        }
    }

    /// Whether the project list needs a refresh.
    /// Deliberately consults only the repos key; the stats record rides
    /// along on the next repository refresh.
    pub fn is_cache_stale(&self) -> bool {
        self.cache.get::<Vec<Project>>(&self.repos_key()).is_none()
    }

    /// Drop this user's cache entries.
    pub fn clear_cache(&self) {
        self.cache.clear(&self.repos_key());
        self.cache.clear(&self.user_key());
        debug!(username = %self.config.username, "cleared cache");
    }

    /// Entry counts and sizes for this client's cache namespace.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn repos_key(&self) -> String {
        format!("{}-repos-{}", CACHE_PREFIX, self.config.username)
    }

    fn user_key(&self) -> String {
        format!("{}-user-{}", CACHE_PREFIX, self.config.username)
    }
}

fn trim(mut projects: Vec<Project>, limit: usize) -> Vec<Project> {
    projects.truncate(limit);
    projects
}
