mod cmd;
mod output;
mod root;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cmd::{platform::PlatformSubcommand, source::SourceSubcommand};
use skillsync_core::{ItemType, Platform, Scope};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "skillsync",
    about = "Install AI assistant skills, agents, and commands across platforms",
    version,
    propagate_version = true
)]
struct Cli {
    /// Registry and cache directory (default: ~/.skillsync)
    #[arg(long, global = true, env = "SKILLSYNC_HOME")]
    home: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage source repositories
    Source {
        #[command(subcommand)]
        subcommand: SourceSubcommand,
    },

    /// List installable items in a source
    Discover {
        /// Source name
        source: String,
        /// Only items compatible with this platform
        #[arg(long)]
        platform: Option<String>,
    },

    /// Install an item from a source
    Install {
        /// Source name
        source: String,
        /// Item name or repository-relative path
        item: String,
        /// Disambiguate by item type
        #[arg(long = "type", value_name = "TYPE")]
        item_type: Option<ItemType>,
        /// Target platforms (repeatable; default: the source's configured platforms)
        #[arg(long = "platform")]
        platforms: Vec<Platform>,
        /// Source format (default: auto-detected)
        #[arg(long)]
        source_platform: Option<Platform>,
        /// Install scope
        #[arg(long, default_value = "user")]
        scope: Scope,
        /// Project root for --scope project (default: nearest .git ancestor)
        #[arg(long)]
        project_root: Option<PathBuf>,
    },

    /// Remove an installed item
    Uninstall {
        /// Item id as shown by `installed`
        item_id: String,
        /// Only remove the copy on this platform
        #[arg(long)]
        platform: Option<String>,
    },

    /// List installed items
    Installed {
        /// Filter by source
        #[arg(long)]
        source: Option<String>,
        /// Filter by platform
        #[arg(long)]
        platform: Option<String>,
    },

    /// Reinstall items whose source content changed
    Update {
        /// Only check items from this source
        #[arg(long)]
        source: Option<String>,
    },

    /// Inspect supported platforms
    Platform {
        #[command(subcommand)]
        subcommand: PlatformSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    if let Err(e) = run(cli) {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let home = match cli.home {
        Some(home) => home,
        None => skillsync_core::paths::default_skillsync_home()
            .context("cannot resolve home directory; pass --home or set SKILLSYNC_HOME")?,
    };

    match cli.command {
        Commands::Source { subcommand } => cmd::source::run(&home, subcommand, cli.json),
        Commands::Discover { source, platform } => {
            cmd::discover::run(&home, &source, platform.as_deref(), cli.json)
        }
        Commands::Install {
            source,
            item,
            item_type,
            platforms,
            source_platform,
            scope,
            project_root,
        } => cmd::install::run(
            &home,
            &source,
            &item,
            item_type,
            &platforms,
            source_platform,
            scope,
            project_root.as_deref(),
            cli.json,
        ),
        Commands::Uninstall { item_id, platform } => {
            cmd::uninstall::run(&home, &item_id, platform.as_deref(), cli.json)
        }
        Commands::Installed { source, platform } => {
            cmd::installed::run(&home, source.as_deref(), platform.as_deref(), cli.json)
        }
        Commands::Update { source } => cmd::update::run(&home, source.as_deref(), cli.json),
        Commands::Platform { subcommand } => cmd::platform::run(subcommand, cli.json),
    }
}
