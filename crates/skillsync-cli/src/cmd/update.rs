use crate::cmd::discover::fetch_and_discover;
use crate::output::{print_json, print_table};
use skillsync_core::{Installer, Platform, RegistryManager, Scope};
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// Per-item outcome of an update pass.
#[derive(serde::Serialize)]
struct UpdateOutcome {
    id: String,
    platform: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

/// Re-check every installed item against its source and reinstall the ones
/// whose source content drifted since install time.
pub fn run(home: &Path, source_filter: Option<&str>, json: bool) -> anyhow::Result<()> {
    let registry = RegistryManager::new(home);
    let installer = Installer::new(&registry);

    let records = registry.list_installed(source_filter, None)?;
    let sources: BTreeSet<String> = records.iter().map(|r| r.source.clone()).collect();

    let mut outcomes = Vec::new();
    for source_name in sources {
        let items = match fetch_and_discover(home, &registry, &source_name, None) {
            Ok((_, items)) => items,
            Err(e) => {
                for record in records.iter().filter(|r| r.source == source_name) {
                    outcomes.push(UpdateOutcome {
                        id: record.id.clone(),
                        platform: record.platform.clone(),
                        status: "error".to_string(),
                        detail: Some(format!("source fetch failed: {e:#}")),
                    });
                }
                continue;
            }
        };

        for record in records.iter().filter(|r| r.source == source_name) {
            let Some(item) = items.iter().find(|i| i.item_id(&source_name) == record.id) else {
                outcomes.push(UpdateOutcome {
                    id: record.id.clone(),
                    platform: record.platform.clone(),
                    status: "missing".to_string(),
                    detail: Some("item no longer exists in source".to_string()),
                });
                continue;
            };
            let Ok(platform) = Platform::from_str(&record.platform) else {
                outcomes.push(UpdateOutcome {
                    id: record.id.clone(),
                    platform: record.platform.clone(),
                    status: "error".to_string(),
                    detail: Some("unknown platform in registry".to_string()),
                });
                continue;
            };

            match installer.check_update_needed(item, &source_name, platform) {
                Ok(false) => outcomes.push(UpdateOutcome {
                    id: record.id.clone(),
                    platform: record.platform.clone(),
                    status: "current".to_string(),
                    detail: None,
                }),
                Ok(true) => {
                    // Project-scoped installs are bound to a project tree the
                    // update pass cannot locate from the registry alone.
                    if record.scope == Scope::Project {
                        warn!(item = %record.id, "skipping project-scoped install, re-run install from the project");
                        outcomes.push(UpdateOutcome {
                            id: record.id.clone(),
                            platform: record.platform.clone(),
                            status: "skipped".to_string(),
                            detail: Some("project scope, reinstall manually".to_string()),
                        });
                        continue;
                    }
                    let result = installer.install_item(
                        item,
                        &source_name,
                        platform,
                        None,
                        Scope::User,
                        None,
                    );
                    outcomes.push(UpdateOutcome {
                        id: record.id.clone(),
                        platform: record.platform.clone(),
                        status: if result.success() { "updated" } else { "error" }.to_string(),
                        detail: result.error().map(|e| e.to_string()),
                    });
                }
                Err(e) => outcomes.push(UpdateOutcome {
                    id: record.id.clone(),
                    platform: record.platform.clone(),
                    status: "error".to_string(),
                    detail: Some(e.to_string()),
                }),
            }
        }
    }

    if json {
        print_json(&outcomes)?;
    } else if outcomes.is_empty() {
        println!("No items installed");
    } else {
        let rows = outcomes
            .iter()
            .map(|o| {
                vec![
                    o.id.clone(),
                    o.platform.clone(),
                    o.status.clone(),
                    o.detail.clone().unwrap_or_default(),
                ]
            })
            .collect();
        print_table(&["ID", "PLATFORM", "STATUS", "DETAIL"], rows);
    }

    let errors = outcomes.iter().filter(|o| o.status == "error").count();
    if errors > 0 {
        anyhow::bail!("{errors} update(s) failed");
    }
    Ok(())
}
