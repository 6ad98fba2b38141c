use crate::cmd::discover::fetch_and_discover;
use crate::output::{print_json, print_table};
use crate::root::resolve_project_root;
use skillsync_core::{InstallResult, Installer, ItemType, Platform, RegistryManager, Scope};
use std::path::Path;

#[allow(clippy::too_many_arguments)]
pub fn run(
    home: &Path,
    source_name: &str,
    item_name: &str,
    item_type: Option<ItemType>,
    targets: &[Platform],
    source_platform: Option<Platform>,
    scope: Scope,
    project_root: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let registry = RegistryManager::new(home);
    let (source, items) = fetch_and_discover(home, &registry, source_name, None)?;

    let matches: Vec<_> = items
        .iter()
        .filter(|item| item.name == item_name || item.item_key() == item_name)
        .filter(|item| item_type.map(|t| item.item_type == t).unwrap_or(true))
        .collect();
    let item = match matches.as_slice() {
        [] => anyhow::bail!("no item '{item_name}' in source '{source_name}'"),
        [item] => *item,
        many => anyhow::bail!(
            "'{item_name}' is ambiguous in '{source_name}'; candidates: {} (disambiguate with the relative path or --type)",
            many.iter()
                .map(|i| i.item_key())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };

    // Without explicit targets, install to every platform the source is
    // registered for.
    let targets: Vec<Platform> = if targets.is_empty() {
        source
            .platforms
            .iter()
            .filter_map(|tag| tag.parse().ok())
            .collect()
    } else {
        targets.to_vec()
    };
    if targets.is_empty() {
        anyhow::bail!("no target platforms given and source '{source_name}' has none configured");
    }

    let project_root = match scope {
        Scope::Project => Some(resolve_project_root(project_root)),
        Scope::User => None,
    };

    let installer = Installer::new(&registry);
    let results: Vec<InstallResult> = targets
        .iter()
        .map(|&target| {
            installer.install_item(
                item,
                source_name,
                target,
                source_platform,
                scope,
                project_root.as_deref(),
            )
        })
        .collect();

    report_results(&results, json)?;
    let failures = results.iter().filter(|r| !r.success()).count();
    if failures > 0 {
        anyhow::bail!("{failures} of {} install(s) failed", results.len());
    }
    Ok(())
}

pub fn report_results(results: &[InstallResult], json: bool) -> anyhow::Result<()> {
    if json {
        print_json(&results)?;
    } else {
        let rows = results
            .iter()
            .map(|r| {
                vec![
                    r.item_id().to_string(),
                    r.platform().to_string(),
                    if r.success() { "ok" } else { "failed" }.to_string(),
                    r.installed_path()
                        .map(|p| p.to_string())
                        .or_else(|| r.error().map(|e| e.to_string()))
                        .unwrap_or_default(),
                ]
            })
            .collect();
        print_table(&["ITEM", "PLATFORM", "RESULT", "DETAIL"], rows);
    }
    Ok(())
}
