// GitHub API integration.
// Transport, rate limiting, fetch/normalization, and the caching client.

#![allow(dead_code, unused_imports)]

pub mod client;
pub mod fetcher;
pub mod gateway;
pub mod rate_limit;
pub mod types;

pub use client::GitHubClient;
pub use fetcher::{PINNED_REPOS, RepositoryFetcher};
pub use gateway::{Gateway, GatewayReply, HttpGateway};
pub use rate_limit::{RateLimitHeaders, RateLimiter};
pub use types::{Project, ProjectId, RawRepository, RawUser, UserStats, Visibility};
