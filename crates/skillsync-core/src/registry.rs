use crate::error::{Result, SkillsyncError};
use crate::io::{atomic_write, ensure_dir};
use crate::paths::{INSTALLED_FILE, SOURCES_FILE};
use crate::types::Scope;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

// ---------------------------------------------------------------------------
// Registry records
// ---------------------------------------------------------------------------

fn default_ref() -> String {
    "main".to_string()
}

fn default_platforms() -> Vec<String> {
    vec!["claude".to_string(), "vscode".to_string()]
}

/// A registered source repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
    #[serde(default = "default_ref", rename = "ref")]
    pub git_ref: String,
    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,
    #[serde(default, rename = "lastSync", skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default, rename = "marketplaceEnabled")]
    pub marketplace_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, rename = "autoUpdate")]
    pub auto_update: bool,
}

const REGISTRY_VERSION: &str = "1.0";

fn default_version() -> String {
    REGISTRY_VERSION.to_string()
}

/// On-disk shape of `sources.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRegistry {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self {
            version: default_version(),
            sources: Vec::new(),
        }
    }
}

/// One installed copy of an item on one platform. Uniqueness is
/// (`id`, `platform`): installing the same item again on the same platform
/// replaces the record, the same item on another platform coexists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledItem {
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub name: String,
    pub platform: String,
    #[serde(default)]
    pub scope: Scope,
    #[serde(rename = "installedPath")]
    pub installed_path: String,
    #[serde(rename = "sourceHash")]
    pub source_hash: String,
    #[serde(rename = "installedAt")]
    pub installed_at: DateTime<Utc>,
}

/// On-disk shape of `installed.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledRegistry {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub items: Vec<InstalledItem>,
}

impl Default for InstalledRegistry {
    fn default() -> Self {
        Self {
            version: default_version(),
            items: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry manager
// ---------------------------------------------------------------------------

/// Whole-collection load/save over the two JSON registry files under the
/// skillsync home. Every mutator rewrites the affected file atomically;
/// there is no in-memory caching between operations.
pub struct RegistryManager {
    home: PathBuf,
}

impl RegistryManager {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    fn sources_file(&self) -> PathBuf {
        self.home.join(SOURCES_FILE)
    }

    fn installed_file(&self) -> PathBuf {
        self.home.join(INSTALLED_FILE)
    }

    // -- sources ------------------------------------------------------------

    /// A missing file is an empty registry, not an error.
    pub fn load_sources(&self) -> Result<SourceRegistry> {
        let path = self.sources_file();
        if !path.is_file() {
            return Ok(SourceRegistry::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_sources(&self, registry: &SourceRegistry) -> Result<()> {
        ensure_dir(&self.home)?;
        let json = serde_json::to_string_pretty(registry)?;
        atomic_write(&self.sources_file(), json.as_bytes())
    }

    /// Register a source. Without an explicit name, derives `owner/repo`
    /// from the URL tail. Duplicate names are rejected.
    pub fn add_source(
        &self,
        url: &str,
        name: Option<&str>,
        git_ref: Option<&str>,
        platforms: Option<Vec<String>>,
    ) -> Result<Source> {
        let mut registry = self.load_sources()?;

        let name = match name {
            Some(name) => name.to_string(),
            None => derive_source_name(url),
        };

        if registry.sources.iter().any(|s| s.name == name) {
            return Err(SkillsyncError::SourceExists(name));
        }

        let source = Source {
            name,
            url: url.to_string(),
            git_ref: git_ref.map(|r| r.to_string()).unwrap_or_else(default_ref),
            platforms: platforms.unwrap_or_else(default_platforms),
            last_sync: None,
            marketplace_enabled: false,
            license: None,
            auto_update: false,
        };
        registry.sources.push(source.clone());
        self.save_sources(&registry)?;
        debug!(source = %source.name, "source registered");
        Ok(source)
    }

    /// Returns true when a source was actually removed.
    pub fn remove_source(&self, name: &str) -> Result<bool> {
        let mut registry = self.load_sources()?;
        let before = registry.sources.len();
        registry.sources.retain(|s| s.name != name);
        if registry.sources.len() == before {
            return Ok(false);
        }
        self.save_sources(&registry)?;
        Ok(true)
    }

    pub fn get_source(&self, name: &str) -> Result<Option<Source>> {
        Ok(self
            .load_sources()?
            .sources
            .into_iter()
            .find(|s| s.name == name))
    }

    pub fn list_sources(&self) -> Result<Vec<Source>> {
        Ok(self.load_sources()?.sources)
    }

    pub fn update_source_sync_time(&self, name: &str) -> Result<()> {
        self.update_source(name, |source| source.last_sync = Some(Utc::now()))
    }

    pub fn update_source_license(&self, name: &str, license: Option<String>) -> Result<()> {
        self.update_source(name, |source| source.license = license)
    }

    /// Flip a source's auto-update flag, returning the new value. An unknown
    /// source leaves the registry untouched and reports false.
    pub fn toggle_source_auto_update(&self, name: &str) -> Result<bool> {
        let mut registry = self.load_sources()?;
        let Some(source) = registry.sources.iter_mut().find(|s| s.name == name) else {
            return Ok(false);
        };
        source.auto_update = !source.auto_update;
        let value = source.auto_update;
        self.save_sources(&registry)?;
        Ok(value)
    }

    /// Sources with auto-update enabled whose last sync is missing or older
    /// than `max_age_hours`.
    pub fn stale_auto_update_sources(&self, max_age_hours: i64) -> Result<Vec<Source>> {
        let cutoff = Utc::now() - Duration::hours(max_age_hours);
        Ok(self
            .load_sources()?
            .sources
            .into_iter()
            .filter(|s| s.auto_update && s.last_sync.map(|t| t < cutoff).unwrap_or(true))
            .collect())
    }

    fn update_source(&self, name: &str, apply: impl FnOnce(&mut Source)) -> Result<()> {
        let mut registry = self.load_sources()?;
        if let Some(source) = registry.sources.iter_mut().find(|s| s.name == name) {
            apply(source);
            self.save_sources(&registry)?;
        }
        Ok(())
    }

    // -- installed items ----------------------------------------------------

    pub fn load_installed(&self) -> Result<InstalledRegistry> {
        let path = self.installed_file();
        if !path.is_file() {
            return Ok(InstalledRegistry::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_installed(&self, registry: &InstalledRegistry) -> Result<()> {
        ensure_dir(&self.home)?;
        let json = serde_json::to_string_pretty(registry)?;
        atomic_write(&self.installed_file(), json.as_bytes())
    }

    /// Record an installation, replacing any existing record with the same
    /// (`id`, `platform`) pair.
    #[allow(clippy::too_many_arguments)]
    pub fn add_installed(
        &self,
        id: &str,
        source: &str,
        item_type: &str,
        name: &str,
        platform: &str,
        scope: Scope,
        installed_path: &str,
        source_hash: &str,
    ) -> Result<InstalledItem> {
        let mut registry = self.load_installed()?;
        registry
            .items
            .retain(|i| !(i.id == id && i.platform == platform));

        let item = InstalledItem {
            id: id.to_string(),
            source: source.to_string(),
            item_type: item_type.to_string(),
            name: name.to_string(),
            platform: platform.to_string(),
            scope,
            installed_path: installed_path.to_string(),
            source_hash: source_hash.to_string(),
            installed_at: Utc::now(),
        };
        registry.items.push(item.clone());
        self.save_installed(&registry)?;
        Ok(item)
    }

    /// Remove records for an item, on one platform or on all of them.
    /// Returns true when anything was removed.
    pub fn remove_installed(&self, item_id: &str, platform: Option<&str>) -> Result<bool> {
        let mut registry = self.load_installed()?;
        let before = registry.items.len();
        match platform {
            Some(platform) => registry
                .items
                .retain(|i| !(i.id == item_id && i.platform == platform)),
            None => registry.items.retain(|i| i.id != item_id),
        }
        if registry.items.len() == before {
            return Ok(false);
        }
        self.save_installed(&registry)?;
        Ok(true)
    }

    pub fn get_installed(
        &self,
        item_id: &str,
        platform: Option<&str>,
    ) -> Result<Vec<InstalledItem>> {
        Ok(self
            .load_installed()?
            .items
            .into_iter()
            .filter(|i| i.id == item_id)
            .filter(|i| platform.map(|p| i.platform == p).unwrap_or(true))
            .collect())
    }

    pub fn list_installed(
        &self,
        source: Option<&str>,
        platform: Option<&str>,
    ) -> Result<Vec<InstalledItem>> {
        Ok(self
            .load_installed()?
            .items
            .into_iter()
            .filter(|i| source.map(|s| i.source == s).unwrap_or(true))
            .filter(|i| platform.map(|p| i.platform == p).unwrap_or(true))
            .collect())
    }
}

/// `owner/repo` from the last two URL segments, with a trailing `.git`
/// stripped; a single-segment URL keeps just that segment.
fn derive_source_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/').trim_end_matches(".git");
    let parts: Vec<&str> = trimmed.split('/').filter(|p| !p.is_empty()).collect();
    match parts.as_slice() {
        [.., owner, repo] => format!("{owner}/{repo}"),
        [single] => single.to_string(),
        [] => trimmed.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
