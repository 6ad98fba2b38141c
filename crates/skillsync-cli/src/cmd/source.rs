use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use skillsync_core::{GitFetcher, RegistryManager};
use std::path::Path;

#[derive(Subcommand)]
pub enum SourceSubcommand {
    /// Register a source repository
    Add {
        /// Git repository URL
        url: String,
        /// Alias for the source (default: owner/repo from the URL)
        #[arg(long)]
        name: Option<String>,
        /// Branch or tag to track
        #[arg(long = "ref", value_name = "REF")]
        git_ref: Option<String>,
        /// Target platforms (repeatable: --platform claude --platform vscode)
        #[arg(long = "platform")]
        platforms: Vec<String>,
    },
    /// Remove a source and its cached clone
    Remove { name: String },
    /// List registered sources
    List,
    /// Fetch the latest snapshot of a source
    Sync { name: String },
}

pub fn run(home: &Path, subcommand: SourceSubcommand, json: bool) -> anyhow::Result<()> {
    let registry = RegistryManager::new(home);

    match subcommand {
        SourceSubcommand::Add {
            url,
            name,
            git_ref,
            platforms,
        } => {
            let platforms = if platforms.is_empty() {
                None
            } else {
                Some(platforms)
            };
            let source = registry
                .add_source(&url, name.as_deref(), git_ref.as_deref(), platforms)
                .context("failed to add source")?;
            if json {
                print_json(&source)?;
            } else {
                println!("Added source '{}' ({})", source.name, source.url);
            }
        }
        SourceSubcommand::Remove { name } => {
            let removed = registry.remove_source(&name)?;
            if !removed {
                anyhow::bail!("no source named '{name}'");
            }
            GitFetcher::new(home).remove_cached(&name)?;
            if json {
                print_json(&serde_json::json!({ "removed": name }))?;
            } else {
                println!("Removed source '{name}'");
            }
        }
        SourceSubcommand::List => {
            let sources = registry.list_sources()?;
            if json {
                print_json(&sources)?;
            } else if sources.is_empty() {
                println!("No sources registered");
            } else {
                let rows = sources
                    .iter()
                    .map(|s| {
                        vec![
                            s.name.clone(),
                            s.url.clone(),
                            s.git_ref.clone(),
                            s.last_sync
                                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                                .unwrap_or_else(|| "never".to_string()),
                            if s.auto_update { "yes" } else { "no" }.to_string(),
                        ]
                    })
                    .collect();
                print_table(&["NAME", "URL", "REF", "LAST SYNC", "AUTO"], rows);
            }
        }
        SourceSubcommand::Sync { name } => {
            let source = registry
                .get_source(&name)?
                .with_context(|| format!("no source named '{name}'"))?;
            let path = GitFetcher::new(home)
                .clone_or_fetch(&source.url, &source.name, &source.git_ref)
                .context("failed to fetch source")?;
            registry.update_source_sync_time(&name)?;
            if json {
                print_json(&serde_json::json!({
                    "source": name,
                    "path": path.display().to_string(),
                }))?;
            } else {
                println!("Synced '{}' to {}", name, path.display());
            }
        }
    }

    Ok(())
}
