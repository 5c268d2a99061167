// GitHub API response and domain types.
// Raw structs mirror the REST API payloads; Project and UserStats are the
// normalized records handed to rendering callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository descriptor as returned by the repositories listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRepository {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Repository size in KiB.
    pub size: u64,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub private: bool,
}

/// User profile as returned by the user endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawUser {
    pub public_repos: u32,
    pub followers: u32,
    pub following: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub blog: Option<String>,
}

/// Project identity: a real repository id, or a synthetic one for
/// placeholder entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectId {
    Repo(u64),
    Placeholder(String),
}

/// Repository visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "Public",
            Visibility::Private => "Private",
        }
    }
}

/// Normalized showcase project.
/// Built once per fetch cycle, then handed to the cache and callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub html_url: String,
    pub language: Option<String>,
    pub topics: Vec<String>,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Repository size in KiB (zero for placeholders).
    pub size: u64,
    pub visibility: Visibility,
    #[serde(default)]
    pub is_placeholder: bool,
}

/// Profile statistics shown alongside the project list.
/// `Default` is the zero-valued record used when no data is available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub public_repos: u32,
    pub followers: u32,
    pub following: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub blog: Option<String>,
}

impl From<RawUser> for UserStats {
    fn from(user: RawUser) -> Self {
        Self {
            public_repos: user.public_repos,
            followers: user.followers,
            following: user.following,
            created_at: user.created_at,
            updated_at: user.updated_at,
            bio: user.bio,
            location: user.location,
            blog: user.blog,
        }
    }
}
