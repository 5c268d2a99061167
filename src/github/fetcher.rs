// Repository fetching and normalization.
// Gates on the rate limiter, issues the listing request, and shapes the raw
// payload into the fixed six-slot pinned project list.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::error::{MontraError, Result};

use super::gateway::{Gateway, GatewayReply};
use super::rate_limit::RateLimiter;
use super::types::{Project, ProjectId, RawRepository, RawUser, UserStats, Visibility};

/// Pinned repository names, in display priority order.
/// Only these survive filtering; pinned names absent from the live response
/// get placeholder entries.
pub const PINNED_REPOS: [&str; 6] = [
    "IOT",
    "empregabilidade-amar-terra-verde",
    "IOTCNT",
    "TimeAdministrator",
    "portfolio-dev-senior",
    "curso-js-2026-pt",
];

/// Placeholder entries link here.
const PROJECT_URL_BASE: &str = "https://github.com/smpsandro1239";

/// Issues the two API requests and owns response normalization.
pub struct RepositoryFetcher {
    gateway: Box<dyn Gateway>,
    limiter: Arc<RateLimiter>,
}

impl RepositoryFetcher {
    pub fn new(gateway: Box<dyn Gateway>, limiter: Arc<RateLimiter>) -> Self {
        Self { gateway, limiter }
    }

    /// Fetch and normalize the pinned project list.
    pub async fn fetch_projects(&self, username: &str) -> Result<Vec<Project>> {
        let params = [
            ("sort", "updated"),
            ("direction", "desc"),
            ("per_page", "20"),
            ("type", "owner"),
        ];
        let reply = self
            .request(&format!("/users/{}/repos", username), &params)
            .await?;

        let repositories: Vec<RawRepository> = serde_json::from_str(&reply.body)?;
        debug!(count = repositories.len(), "fetched repositories");
        Ok(normalize_projects(repositories))
    }

    /// Fetch the profile statistics record.
    pub async fn fetch_user_stats(&self, username: &str) -> Result<UserStats> {
        let reply = self.request(&format!("/users/{}", username), &[]).await?;
        let user: RawUser = serde_json::from_str(&reply.body)?;
        Ok(user.into())
    }

    /// Gate, round-trip, record limits, check status.
    async fn request(&self, path: &str, query: &[(&str, &str)]) -> Result<GatewayReply> {
        if self.limiter.is_limited() {
            let reset_at = self
                .limiter
                .resets_at()
                .map(|dt| dt.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            return Err(MontraError::RateLimited { reset_at });
        }

        let reply = self.gateway.get(path, query).await?;

        // Limits are recorded before the status check: the 403 quota
        // response is the one carrying remaining = 0.
        self.limiter.record_headers(&reply.rate);

        if !(200..300).contains(&reply.status) {
            return Err(MontraError::Status(reply.status));
        }
        Ok(reply)
    }
}

/// Shape a raw listing into the pinned project list: filter out forks,
/// archived, and unpinned repositories; map the survivors; pad missing
/// pinned names with placeholders; order by pinned index; truncate.
///
/// Total and deterministic: any successful response yields exactly
/// `PINNED_REPOS.len()` entries.
pub(crate) fn normalize_projects(repositories: Vec<RawRepository>) -> Vec<Project> {
    let mut projects: Vec<Project> = repositories
        .into_iter()
        .filter(|repo| !repo.fork && !repo.archived && pinned_index(&repo.name).is_some())
        .map(project_from_raw)
        .collect();

    for name in PINNED_REPOS {
        if !projects.iter().any(|project| project.name == name) {
            projects.push(placeholder_project(name));
        }
    }

    projects.sort_by_key(|project| pinned_index(&project.name).unwrap_or(usize::MAX));
    projects.truncate(PINNED_REPOS.len());
    projects
}

fn pinned_index(name: &str) -> Option<usize> {
    PINNED_REPOS.iter().position(|pinned| *pinned == name)
}

fn project_from_raw(repo: RawRepository) -> Project {
    let description = match repo.description.as_deref() {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => default_description(&repo.name).to_string(),
    };
    let visibility = if repo.private {
        Visibility::Private
    } else {
        Visibility::Public
    };

    Project {
        id: ProjectId::Repo(repo.id),
        description,
        html_url: repo.html_url,
        language: repo.language,
        topics: repo.topics,
        stargazers_count: repo.stargazers_count,
        forks_count: repo.forks_count,
        updated_at: repo.updated_at,
        created_at: repo.created_at,
        size: repo.size,
        visibility,
        is_placeholder: false,
        name: repo.name,
    }
}

/// Stand-in entry for a pinned repository absent from the live response.
fn placeholder_project(name: &str) -> Project {
    let now = Utc::now();
    Project {
        id: ProjectId::Placeholder(format!("placeholder-{}", name)),
        name: name.to_string(),
        description: default_description(name).to_string(),
        html_url: format!("{}/{}", PROJECT_URL_BASE, name),
        language: Some(default_language(name).to_string()),
        topics: Vec::new(),
        stargazers_count: 0,
        forks_count: 0,
        updated_at: now,
        created_at: now,
        size: 0,
        visibility: Visibility::Public,
        is_placeholder: true,
    }
}

fn default_description(name: &str) -> &'static str {
    match name {
        "IOT" => {
            "Solução empresarial para controlo de barreiras físicas e monitorização de \
             acesso veicular. Integra hardware ESP32 com backend Laravel, oferecendo \
             controlo operacional preciso, segurança baseada em endereços MAC e \
             atualizações em tempo real via LoRa"
        }
        "empregabilidade-amar-terra-verde" => {
            "Sistema web para gestão de empregabilidade e sustentabilidade ambiental"
        }
        "IOTCNT" => "Contador inteligente IoT com interface web e monitorização remota",
        "TimeAdministrator" => "Aplicação TypeScript para gestão e administração de tempo",
        "portfolio-dev-senior" => {
            "Portfolio profissional desenvolvido com HTML5, CSS3 e JavaScript vanilla"
        }
        "curso-js-2026-pt" => "Curso completo de JavaScript moderno em português europeu",
        _ => "Projeto de desenvolvimento de software",
    }
}

fn default_language(name: &str) -> &'static str {
    match name {
        "IOT" | "IOTCNT" => "C++",
        "TimeAdministrator" => "TypeScript",
        "portfolio-dev-senior" => "HTML",
        _ => "JavaScript",
    }
}
