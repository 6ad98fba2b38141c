use crate::output::{print_json, print_table};
use clap::Subcommand;
use skillsync_core::{ItemType, Platform};

#[derive(Subcommand)]
pub enum PlatformSubcommand {
    /// Show supported platforms and what each accepts
    List,
}

pub fn run(subcommand: PlatformSubcommand, json: bool) -> anyhow::Result<()> {
    match subcommand {
        PlatformSubcommand::List => list(json),
    }
}

fn list(json: bool) -> anyhow::Result<()> {
    let platforms: Vec<_> = Platform::all()
        .iter()
        .map(|&p| {
            let types: Vec<&str> = ItemType::all()
                .iter()
                .filter(|&&t| p.supports(t))
                .map(|t| t.as_str())
                .collect();
            (p, types, p.is_available())
        })
        .collect();

    if json {
        let entries: Vec<serde_json::Value> = platforms
            .iter()
            .map(|(p, types, available)| {
                serde_json::json!({
                    "id": p.as_str(),
                    "itemTypes": types,
                    "requiredFields": p.required_fields(),
                    "agentExtension": p.agent_extension(),
                    "available": available,
                })
            })
            .collect();
        print_json(&entries)?;
    } else {
        let rows = platforms
            .iter()
            .map(|(p, types, available)| {
                vec![
                    p.as_str().to_string(),
                    types.join(","),
                    p.required_fields().join(","),
                    p.agent_extension().to_string(),
                    if *available { "yes" } else { "no" }.to_string(),
                ]
            })
            .collect();
        print_table(
            &["PLATFORM", "ITEM TYPES", "REQUIRED", "AGENT EXT", "AVAILABLE"],
            rows,
        );
    }
    Ok(())
}
