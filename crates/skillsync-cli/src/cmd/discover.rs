use crate::output::{print_json, print_table};
use anyhow::Context;
use skillsync_core::{discovery, DiscoveredItem, GitFetcher, RegistryManager, Source};
use std::path::Path;

/// Fetch a source's snapshot and discover its items. Shared by the
/// discover, install, and update commands.
pub fn fetch_and_discover(
    home: &Path,
    registry: &RegistryManager,
    source_name: &str,
    platform_filter: Option<&str>,
) -> anyhow::Result<(Source, Vec<DiscoveredItem>)> {
    let source = registry
        .get_source(source_name)?
        .with_context(|| format!("no source named '{source_name}'"))?;
    let repo_path = GitFetcher::new(home)
        .clone_or_fetch(&source.url, &source.name, &source.git_ref)
        .context("failed to fetch source")?;
    registry.update_source_sync_time(source_name)?;
    let items = discovery::discover_all(&repo_path, platform_filter)?;
    Ok((source, items))
}

pub fn run(home: &Path, source_name: &str, platform: Option<&str>, json: bool) -> anyhow::Result<()> {
    let registry = RegistryManager::new(home);
    let (_, items) = fetch_and_discover(home, &registry, source_name, platform)?;

    if json {
        let entries: Vec<serde_json::Value> = items
            .iter()
            .map(|item| {
                serde_json::json!({
                    "id": item.item_id(source_name),
                    "name": item.name,
                    "type": item.item_type.as_str(),
                    "description": item.description,
                    "platforms": item.platforms,
                    "relativePath": item.relative_path,
                })
            })
            .collect();
        print_json(&entries)?;
    } else if items.is_empty() {
        println!("No items found in '{source_name}'");
    } else {
        let rows = items
            .iter()
            .map(|item| {
                vec![
                    item.name.clone(),
                    item.item_type.to_string(),
                    item.platforms.join(","),
                    item.relative_path.clone(),
                    item.description.clone(),
                ]
            })
            .collect();
        print_table(&["NAME", "TYPE", "PLATFORMS", "PATH", "DESCRIPTION"], rows);
    }

    Ok(())
}
