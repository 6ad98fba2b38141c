use crate::cmd::install::report_results;
use skillsync_core::{Installer, RegistryManager};
use std::path::Path;

pub fn run(home: &Path, item_id: &str, platform: Option<&str>, json: bool) -> anyhow::Result<()> {
    let registry = RegistryManager::new(home);
    let installer = Installer::new(&registry);

    let results = installer.uninstall_item(item_id, platform);
    if results.is_empty() {
        if json {
            crate::output::print_json(&results)?;
        } else {
            println!("Nothing installed under '{item_id}'");
        }
        return Ok(());
    }

    report_results(&results, json)?;
    let failures = results.iter().filter(|r| !r.success()).count();
    if failures > 0 {
        anyhow::bail!("{failures} of {} uninstall(s) failed", results.len());
    }
    Ok(())
}
