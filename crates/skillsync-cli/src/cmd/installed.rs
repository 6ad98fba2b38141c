use crate::output::{print_json, print_table};
use skillsync_core::RegistryManager;
use std::path::Path;

pub fn run(
    home: &Path,
    source: Option<&str>,
    platform: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let registry = RegistryManager::new(home);
    let items = registry.list_installed(source, platform)?;

    if json {
        print_json(&items)?;
    } else if items.is_empty() {
        println!("No items installed");
    } else {
        let rows = items
            .iter()
            .map(|item| {
                vec![
                    item.id.clone(),
                    item.item_type.clone(),
                    item.platform.clone(),
                    item.scope.to_string(),
                    item.installed_at.format("%Y-%m-%d %H:%M").to_string(),
                    item.installed_path.clone(),
                ]
            })
            .collect();
        print_table(
            &["ID", "TYPE", "PLATFORM", "SCOPE", "INSTALLED", "PATH"],
            rows,
        );
    }

    Ok(())
}
