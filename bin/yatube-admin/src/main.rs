//! Out-of-band administration for Yatube.
//!
//! Groups are not created through the web interface; this tool manages them
//! directly in the configured database.
//!
//! ```bash
//! yatube-admin create-group --title "Cats" --slug cats --description "All about cats"
//! yatube-admin list-groups
//! yatube-admin delete-group cats
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use yt_config::Settings;
use yt_core::models::NewGroup;
use yt_core::traits::ContentRepo;
use yt_db_sqlite::SqliteRepo;

/// Yatube administration.
#[derive(Parser)]
#[command(name = "yatube-admin")]
#[command(about = "Manage Yatube groups", long_about = None)]
struct Cli {
    /// Database URL; defaults to `database.url` from the configuration
    #[arg(long, env = "YATUBE_ADMIN_DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a group posts can be filed under.
    CreateGroup {
        #[arg(long)]
        title: String,
        /// URL slug, e.g. `cats` for /group/cats/
        #[arg(long)]
        slug: String,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// List all groups.
    ListGroups,

    /// Delete a group. Its posts stay, without a group.
    DeleteGroup {
        slug: String,
    },
}

fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let settings = Settings::load().context("loading configuration")?;
    let url = cli.database_url.unwrap_or(settings.database.url);
    let repo = SqliteRepo::new(&url, 1)
        .await
        .with_context(|| format!("opening database {url}"))?;

    match cli.command {
        Commands::CreateGroup {
            title,
            slug,
            description,
        } => {
            if !is_valid_slug(&slug) {
                bail!("slug may only contain letters, digits, '-' and '_'");
            }
            if repo.get_group(&slug).await?.is_some() {
                bail!("a group with slug '{slug}' already exists");
            }
            let group = repo
                .create_group(NewGroup {
                    title,
                    slug,
                    description,
                })
                .await?;
            println!("created group #{} {} (/group/{}/)", group.id, group.title, group.slug);
        }
        Commands::ListGroups => {
            let groups = repo.list_groups().await?;
            if groups.is_empty() {
                println!("no groups");
            }
            for group in groups {
                println!("{:>4}  {:<24} {}", group.id, group.slug, group.title);
            }
        }
        Commands::DeleteGroup { slug } => {
            if !repo.delete_group(&slug).await? {
                bail!("no group with slug '{slug}'");
            }
            println!("deleted group '{slug}'");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn slugs() {
        assert!(is_valid_slug("cats"));
        assert!(is_valid_slug("big-cats_2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("no spaces"));
    }
}
