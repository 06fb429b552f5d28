//! Boards CLI: inspect and exercise cloud card limits.
//!
//! Runs against a JSON fixture (`--fixture`) or the Postgres database named by
//! DATABASE_URL. In Postgres mode the license is read from BOARDS_LICENSE_PATH
//! and no host API is available.

use anyhow::Context;
use boards_cli::{init_tracing, load_blocks, load_fixture, load_license, memory_service};
use boards_core::models::{BoardsLimits, Container, ProductLimits};
use boards_core::Config;
use boards_db::{setup_database, MemoryStore, PostgresStore};
use boards_services::CloudLimitsService;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "boards", about = "Boards cloud limits CLI")]
struct Cli {
    /// JSON fixture with license, blocks, teams and users (in-memory store)
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Whether the server runs with a cloud license
    IsCloud,
    /// Card and view limits
    Limits {
        #[command(subcommand)]
        sub: LimitsCommands,
    },
    /// Serve blocks with cloud limits applied
    Apply {
        /// Path to a JSON array of blocks
        #[arg(long)]
        blocks: PathBuf,
        /// Workspace the blocks belong to
        #[arg(long, default_value = "0")]
        workspace: String,
    },
    /// Check whether any block is, or belongs to, a limited card
    Check {
        /// Path to a JSON array of blocks
        #[arg(long)]
        blocks: PathBuf,
        /// Workspace the blocks belong to
        #[arg(long, default_value = "0")]
        workspace: String,
    },
    /// Ask every system administrator to upgrade the workspace
    NotifyAdmins {
        /// Workspace ID
        workspace_id: String,
    },
}

#[derive(Subcommand)]
enum LimitsCommands {
    /// Current limits, usage and card limit timestamp
    Show,
    /// Set product limits; with no flags the limits are cleared
    Set {
        /// Card limit; 0 removes it
        #[arg(long)]
        cards: Option<i32>,
        /// Views per board; only accepted together with --cards
        #[arg(long, requires = "cards")]
        views: Option<i32>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// The service, plus the in-memory store when running from a fixture.
async fn build_service(
    cli: &Cli,
    config: &Config,
) -> anyhow::Result<(CloudLimitsService, Option<MemoryStore>)> {
    if let Some(path) = &cli.fixture {
        let fixture = load_fixture(path)?;
        tracing::debug!(path = %path.display(), "Using in-memory store");
        let (service, store) = memory_service(fixture, config);
        return Ok((service, Some(store)));
    }

    let pool = setup_database(config)
        .await
        .context("Set DATABASE_URL or pass --fixture")?;
    let license = config
        .license_path
        .as_deref()
        .map(load_license)
        .transpose()?;
    if license.is_none() {
        tracing::warn!("BOARDS_LICENSE_PATH not set, running without a license");
    }

    let service = CloudLimitsService::new(Arc::new(PostgresStore::new(pool, license)))
        .with_admin_page_size(config.admin_page_size);
    if let Some(card_limit) = config.card_limit {
        service.set_card_limit(card_limit);
    }
    Ok((service, None))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let (service, memory_store) = build_service(&cli, &config).await?;

    match cli.command {
        Commands::IsCloud => {
            print_json(&serde_json::json!({
                "isCloud": service.is_cloud().await,
                "cloudLimited": service.is_cloud_limited().await,
            }))?;
        }
        Commands::Limits { sub } => {
            if let LimitsCommands::Set { cards, views } = sub {
                let limits = (cards.is_some() || views.is_some()).then(|| ProductLimits {
                    boards: Some(BoardsLimits { cards, views }),
                });
                service.set_cloud_limits(limits.as_ref()).await?;
            }
            print_json(&service.get_boards_cloud_limits().await?)?;
        }
        Commands::Apply { blocks, workspace } => {
            let blocks = load_blocks(&blocks)?;
            let blocks = service
                .apply_cloud_limits(&Container::new(workspace), blocks)
                .await?;
            print_json(&blocks)?;
        }
        Commands::Check { blocks, workspace } => {
            let blocks = load_blocks(&blocks)?;
            let contains = service
                .contains_limited_blocks(&Container::new(workspace), &blocks)
                .await?;
            print_json(&serde_json::json!({ "containsLimitedBlocks": contains }))?;
        }
        Commands::NotifyAdmins { workspace_id } => {
            service
                .notify_portal_admins_upgrade_request(&workspace_id)
                .await
                .context("Failed to notify system administrators")?;
            let sent = memory_store.map(|store| store.sent_messages());
            print_json(&serde_json::json!({
                "success": true,
                "message": format!("Upgrade request sent for workspace {}", workspace_id),
                "sentMessages": sent,
            }))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_set_views_requires_cards() {
        let err = Cli::try_parse_from(["boards", "limits", "set", "--views", "3"]);
        assert!(err.is_err());

        let cli = Cli::try_parse_from(["boards", "limits", "set", "--cards", "10", "--views", "3"])
            .unwrap();
        match cli.command {
            Commands::Limits {
                sub: LimitsCommands::Set { cards, views },
            } => {
                assert_eq!(cards, Some(10));
                assert_eq!(views, Some(3));
            }
            _ => panic!("expected limits set"),
        }
    }

    #[test]
    fn fixture_flag_is_global() {
        let cli = Cli::try_parse_from(["boards", "is-cloud", "--fixture", "fixture.json"]).unwrap();
        assert_eq!(cli.fixture, Some(PathBuf::from("fixture.json")));
    }
}
