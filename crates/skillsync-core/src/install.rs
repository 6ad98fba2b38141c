use crate::discovery;
use crate::error::{Result, SkillsyncError};
use crate::hash;
use crate::io;
use crate::item::DiscoveredItem;
use crate::platform::Platform;
use crate::registry::RegistryManager;
use crate::transform::TransformEngine;
use crate::types::Scope;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

// ---------------------------------------------------------------------------
// InstallResult
// ---------------------------------------------------------------------------

/// Outcome of one install or uninstall attempt. Construction enforces the
/// record's consistency: success carries no error, failure always carries
/// one, and the item id is never empty. Fields are private so no
/// inconsistent value can exist.
#[derive(Debug, Clone, Serialize)]
pub struct InstallResult {
    success: bool,
    item_id: String,
    platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    installed_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl InstallResult {
    pub fn new(
        success: bool,
        item_id: String,
        platform: String,
        installed_path: Option<String>,
        error: Option<String>,
    ) -> Result<Self> {
        if item_id.is_empty() {
            return Err(SkillsyncError::InconsistentResult(
                "item_id must not be empty".to_string(),
            ));
        }
        if success && error.is_some() {
            return Err(SkillsyncError::InconsistentResult(
                "successful result cannot carry an error".to_string(),
            ));
        }
        if !success && error.is_none() {
            return Err(SkillsyncError::InconsistentResult(
                "failed result must carry an error".to_string(),
            ));
        }
        Ok(Self {
            success,
            item_id,
            platform,
            installed_path,
            error,
        })
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn installed_path(&self) -> Option<&str> {
        self.installed_path.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn succeeded(item_id: String, platform: String, installed_path: String) -> Self {
        Self {
            success: true,
            item_id,
            platform,
            installed_path: Some(installed_path),
            error: None,
        }
    }

    fn failed(item_id: String, platform: String, error: String) -> Self {
        Self {
            success: false,
            item_id,
            platform,
            installed_path: None,
            error: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// Installer
// ---------------------------------------------------------------------------

/// Linear install pipeline: validate, transform when formats differ, write,
/// hash, register. One pass per attempt, no retry, no rollback of a write
/// that preceded a later failure. Every failure mode is folded into the
/// returned `InstallResult`; nothing escapes as an error.
pub struct Installer<'a> {
    registry: &'a RegistryManager,
    engine: TransformEngine,
}

impl<'a> Installer<'a> {
    pub fn new(registry: &'a RegistryManager) -> Self {
        Self {
            registry,
            engine: TransformEngine::new(),
        }
    }

    pub fn install_item(
        &self,
        item: &DiscoveredItem,
        source_name: &str,
        target: Platform,
        source_platform: Option<Platform>,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> InstallResult {
        let item_id = item.item_id(source_name);
        match self.try_install(item, source_name, &item_id, target, source_platform, scope, project_root)
        {
            Ok(path) => {
                debug!(item = %item_id, platform = %target, path = %path.display(), "installed");
                InstallResult::succeeded(
                    item_id,
                    target.as_str().to_string(),
                    path.display().to_string(),
                )
            }
            Err(e) => InstallResult::failed(item_id, target.as_str().to_string(), e.to_string()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn try_install(
        &self,
        item: &DiscoveredItem,
        source_name: &str,
        item_id: &str,
        target: Platform,
        source_platform: Option<Platform>,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<PathBuf> {
        let project_root = match scope {
            Scope::Project => Some(project_root.ok_or(SkillsyncError::ProjectRootRequired)?),
            Scope::User => {
                target.ensure_dirs()?;
                None
            }
        };

        let source_platform =
            source_platform.unwrap_or_else(|| self.detect_source_platform(item));
        let mut content = discovery::item_content(item)?;

        if source_platform != target {
            content = self.engine.transform(&content, source_platform, target)?;
        }

        let errors = target.validate(&content);
        if !errors.is_empty() {
            return Err(SkillsyncError::ValidationFailed(errors.join("; ")));
        }

        let install_path = match project_root {
            Some(root) => target.project_install_path(root, item.item_type, &item.name)?,
            None => target.install_path(item.item_type, &item.name)?,
        };

        if item.item_type.is_directory() {
            io::remove_path(&install_path)?;
            if let Some(parent) = install_path.parent() {
                io::ensure_dir(parent)?;
            }
            io::copy_dir_all(&item.path, &install_path)?;
        } else {
            if let Some(parent) = install_path.parent() {
                io::ensure_dir(parent)?;
            }
            std::fs::write(&install_path, &content)?;
        }

        let source_hash = hash::tree_hash(&item.path)?;
        self.registry.add_installed(
            item_id,
            source_name,
            item.item_type.as_str(),
            &item.name,
            target.as_str(),
            scope,
            &install_path.display().to_string(),
            &source_hash,
        )?;

        Ok(install_path)
    }

    /// Source format when the caller gives none: the item's first platform
    /// tag, then filename convention, then content sniffing, defaulting to
    /// claude (the plain-markdown format).
    pub fn detect_source_platform(&self, item: &DiscoveredItem) -> Platform {
        if let Some(platform) = item
            .platforms
            .iter()
            .find_map(|tag| Platform::from_str(tag).ok())
        {
            return platform;
        }

        let file_name = item
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if file_name.ends_with(".agent.md") || file_name.ends_with(".prompt.md") {
            return Platform::Vscode;
        }

        discovery::item_content(item)
            .ok()
            .and_then(|content| self.engine.detect_platform(&content))
            .unwrap_or(Platform::Claude)
    }

    /// Remove every installed copy of an item, or just the one on
    /// `platform`. The registry record is always dropped; a missing on-disk
    /// path is tolerated. Nothing registered under the id yields an empty
    /// list, not an error.
    pub fn uninstall_item(&self, item_id: &str, platform: Option<&str>) -> Vec<InstallResult> {
        let records = match self.registry.get_installed(item_id, platform) {
            Ok(records) => records,
            Err(e) => {
                return vec![InstallResult::failed(
                    item_id.to_string(),
                    platform.unwrap_or("all").to_string(),
                    e.to_string(),
                )]
            }
        };

        let mut results = Vec::with_capacity(records.len());
        for record in records {
            let outcome = io::remove_path(Path::new(&record.installed_path))
                .and_then(|_| self.registry.remove_installed(item_id, Some(&record.platform)));
            results.push(match outcome {
                Ok(_) => {
                    debug!(item = item_id, platform = %record.platform, "uninstalled");
                    InstallResult::succeeded(
                        item_id.to_string(),
                        record.platform.clone(),
                        record.installed_path.clone(),
                    )
                }
                Err(e) => InstallResult::failed(
                    item_id.to_string(),
                    record.platform.clone(),
                    e.to_string(),
                ),
            });
        }
        results
    }

    /// True when the item is absent from the registry for this platform or
    /// its current source content no longer matches the hash recorded at
    /// install time. Read-only.
    pub fn check_update_needed(
        &self,
        item: &DiscoveredItem,
        source_name: &str,
        platform: Platform,
    ) -> Result<bool> {
        let item_id = item.item_id(source_name);
        let records = self
            .registry
            .get_installed(&item_id, Some(platform.as_str()))?;
        let Some(record) = records.first() else {
            return Ok(true);
        };
        Ok(hash::tree_hash(&item.path)? != record.source_hash)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemType;
    use tempfile::TempDir;

    fn agent_item(dir: &Path, rel: &str, content: &str) -> DiscoveredItem {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        let (fm, _) = crate::frontmatter::parse_lenient(content);
        let name = crate::frontmatter::get_str(&fm, "name")
            .unwrap_or("unnamed")
            .to_string();
        DiscoveredItem {
            name,
            item_type: ItemType::Agent,
            path,
            description: String::new(),
            platforms: vec!["claude".to_string()],
            frontmatter: fm,
            relative_path: rel.to_string(),
        }
    }

    fn skill_item(dir: &Path, rel: &str, content: &str) -> DiscoveredItem {
        let path = dir.join(rel);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("SKILL.md"), content).unwrap();
        let (fm, _) = crate::frontmatter::parse_lenient(content);
        let name = crate::frontmatter::get_str(&fm, "name")
            .unwrap_or("unnamed")
            .to_string();
        DiscoveredItem {
            name,
            item_type: ItemType::Skill,
            path,
            description: String::new(),
            platforms: vec!["claude".to_string()],
            frontmatter: fm,
            relative_path: rel.to_string(),
        }
    }

    #[test]
    fn result_construction_rejects_inconsistency() {
        let err = InstallResult::new(
            true,
            "s/agent/a".to_string(),
            "claude".to_string(),
            None,
            Some("boom".to_string()),
        )
        .unwrap_err();
        assert!(matches!(err, SkillsyncError::InconsistentResult(_)));

        let err =
            InstallResult::new(false, "s/agent/a".to_string(), "claude".to_string(), None, None)
                .unwrap_err();
        assert!(matches!(err, SkillsyncError::InconsistentResult(_)));

        let err = InstallResult::new(true, String::new(), "claude".to_string(), None, None)
            .unwrap_err();
        assert!(matches!(err, SkillsyncError::InconsistentResult(_)));
    }

    #[test]
    fn install_agent_to_project_scope() {
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let registry = RegistryManager::new(home.path());
        let installer = Installer::new(&registry);

        let item = agent_item(
            repo.path(),
            "agents/analyst.md",
            "---\nname: analyst\n---\n\n# Analyst\n",
        );
        let result = installer.install_item(
            &item,
            "acme/skills",
            Platform::Claude,
            None,
            Scope::Project,
            Some(project.path()),
        );

        assert!(result.success(), "install failed: {:?}", result.error());
        let installed = project.path().join(".claude/agents/analyst.md");
        assert!(installed.is_file());
        assert_eq!(
            result.item_id(),
            "acme/skills/agent/agents/analyst.md"
        );

        let records = registry.get_installed(result.item_id(), Some("claude")).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].scope, Scope::Project);
        assert!(!records[0].source_hash.is_empty());
    }

    #[test]
    fn install_skill_copies_directory_and_replaces_prior() {
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let registry = RegistryManager::new(home.path());
        let installer = Installer::new(&registry);

        let item = skill_item(
            repo.path(),
            "skills/github",
            "---\nname: github\n---\n\nskill body\n",
        );
        std::fs::write(item.path.join("helper.py"), "print('hi')\n").unwrap();

        let result = installer.install_item(
            &item,
            "acme/skills",
            Platform::Claude,
            None,
            Scope::Project,
            Some(project.path()),
        );
        assert!(result.success(), "install failed: {:?}", result.error());
        let installed = project.path().join(".claude/skills/github");
        assert!(installed.join("SKILL.md").is_file());
        assert!(installed.join("helper.py").is_file());

        // A stale file from a previous install must not survive reinstall.
        std::fs::write(installed.join("stale.txt"), "old").unwrap();
        let result = installer.install_item(
            &item,
            "acme/skills",
            Platform::Claude,
            None,
            Scope::Project,
            Some(project.path()),
        );
        assert!(result.success());
        assert!(!installed.join("stale.txt").exists());
        assert_eq!(registry.list_installed(None, None).unwrap().len(), 1);
    }

    #[test]
    fn skill_to_skill_less_platform_fails_without_writing() {
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let registry = RegistryManager::new(home.path());
        let installer = Installer::new(&registry);

        let item = skill_item(repo.path(), "skills/github", "---\nname: github\n---\nx\n");
        let result = installer.install_item(
            &item,
            "acme/skills",
            Platform::Vscode,
            Some(Platform::Claude),
            Scope::Project,
            Some(project.path()),
        );

        assert!(!result.success());
        assert!(result.error().unwrap().contains("does not support"));
        assert!(registry.list_installed(None, None).unwrap().is_empty());
        assert!(!project.path().join(".github").exists());
    }

    #[test]
    fn project_scope_without_root_fails() {
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let registry = RegistryManager::new(home.path());
        let installer = Installer::new(&registry);

        let item = agent_item(repo.path(), "a.md", "---\nname: a\n---\nx\n");
        let result = installer.install_item(
            &item,
            "s",
            Platform::Claude,
            None,
            Scope::Project,
            None,
        );
        assert!(!result.success());
        assert!(result.error().unwrap().contains("project_root"));
    }

    #[test]
    fn claude_to_vscode_transform_injects_tools() {
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let registry = RegistryManager::new(home.path());
        let installer = Installer::new(&registry);

        let item = agent_item(
            repo.path(),
            "agents/analyst.md",
            "---\nname: analyst\nmodel: sonnet\n---\n\nUse Task(subagent_type=\"helper\", prompt=\"dig\") here.\n",
        );
        let result = installer.install_item(
            &item,
            "acme/skills",
            Platform::Vscode,
            None,
            Scope::Project,
            Some(project.path()),
        );
        assert!(result.success(), "install failed: {:?}", result.error());

        let installed = project.path().join(".github/prompts/analyst.agent.md");
        let content = std::fs::read_to_string(installed).unwrap();
        assert!(content.contains("tools:"));
        assert!(content.contains("#runSubagent helper \"dig\""));
        assert!(!content.contains("Task(subagent_type"));
    }

    #[test]
    fn validation_failure_aborts_before_write() {
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let registry = RegistryManager::new(home.path());
        let installer = Installer::new(&registry);

        let mut item = agent_item(repo.path(), "a.md", "---\ndescription: nameless\n---\nx\n");
        item.name = "a".to_string();
        let result = installer.install_item(
            &item,
            "s",
            Platform::Claude,
            None,
            Scope::Project,
            Some(project.path()),
        );
        assert!(!result.success());
        assert!(result.error().unwrap().contains("'name'"));
        assert!(!project.path().join(".claude/agents/a.md").exists());
    }

    #[test]
    fn uninstall_unknown_id_returns_empty_list() {
        let home = TempDir::new().unwrap();
        let registry = RegistryManager::new(home.path());
        let installer = Installer::new(&registry);
        assert!(installer.uninstall_item("nobody/agent/none", None).is_empty());
    }

    #[test]
    fn uninstall_removes_file_and_record() {
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let registry = RegistryManager::new(home.path());
        let installer = Installer::new(&registry);

        let item = agent_item(repo.path(), "a.md", "---\nname: a\n---\nx\n");
        let result = installer.install_item(
            &item,
            "s",
            Platform::Claude,
            None,
            Scope::Project,
            Some(project.path()),
        );
        assert!(result.success());
        let installed = PathBuf::from(result.installed_path().unwrap());
        assert!(installed.exists());

        let results = installer.uninstall_item(result.item_id(), None);
        assert_eq!(results.len(), 1);
        assert!(results[0].success());
        assert!(!installed.exists());
        assert!(registry.list_installed(None, None).unwrap().is_empty());
    }

    #[test]
    fn uninstall_tolerates_missing_path() {
        let home = TempDir::new().unwrap();
        let registry = RegistryManager::new(home.path());
        let installer = Installer::new(&registry);
        registry
            .add_installed(
                "s/agent/a",
                "s",
                "agent",
                "a",
                "claude",
                Scope::User,
                "/nonexistent/agents/a.md",
                "h",
            )
            .unwrap();

        let results = installer.uninstall_item("s/agent/a", Some("claude"));
        assert_eq!(results.len(), 1);
        assert!(results[0].success());
        assert!(registry.list_installed(None, None).unwrap().is_empty());
    }

    #[test]
    fn update_needed_lifecycle() {
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let registry = RegistryManager::new(home.path());
        let installer = Installer::new(&registry);

        let item = agent_item(repo.path(), "a.md", "---\nname: a\n---\noriginal\n");
        assert!(installer
            .check_update_needed(&item, "s", Platform::Claude)
            .unwrap());

        let result = installer.install_item(
            &item,
            "s",
            Platform::Claude,
            None,
            Scope::Project,
            Some(project.path()),
        );
        assert!(result.success());
        assert!(!installer
            .check_update_needed(&item, "s", Platform::Claude)
            .unwrap());

        std::fs::write(&item.path, "---\nname: a\n---\nedited\n").unwrap();
        assert!(installer
            .check_update_needed(&item, "s", Platform::Claude)
            .unwrap());
    }
}
