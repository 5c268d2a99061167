// montra: prints a portfolio's pinned GitHub projects and profile stats.
// All interesting behavior lives in the github and cache modules; this is
// just the wiring and the plain-text rendering.

mod cache;
mod clock;
mod config;
mod error;
mod github;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::Config;
use github::GitHubClient;

#[tokio::main]
async fn main() -> error::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("montra=warn")),
        )
        .init();

    let config = Config::from_env();
    let max_projects = config.max_projects;
    let client = GitHubClient::new(config)?;

    if std::env::args().any(|arg| arg == "--refresh") {
        client.clear_cache();
    }

    let projects = client.get_repositories(max_projects).await?;

    println!("Projects: {}", client.username());
    for project in &projects {
        let language = project.language.as_deref().unwrap_or("?");
        let note = if project.is_placeholder {
            "  (not yet published)"
        } else {
            ""
        };
        println!();
        println!(
            "  {}  [{}]  ★ {}  ⑂ {}  {}{}",
            project.name,
            language,
            project.stargazers_count,
            project.forks_count,
            project.visibility.as_str(),
            note
        );
        println!("    {}", project.html_url);
        println!("    {}", project.description);
    }

    let stats = client.get_user_stats().await;
    println!();
    println!(
        "Profile: {} public repos · {} followers · {} following",
        stats.public_repos, stats.followers, stats.following
    );

    debug!(stats = ?client.cache_stats(), "cache state");

    Ok(())
}
