use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Marketplace manifest
// ---------------------------------------------------------------------------

/// The `.claude-plugin/marketplace.json` file a repository may carry to
/// enumerate its installable content explicitly. When present, discovery
/// trusts it instead of sweeping the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceManifest {
    pub name: String,
    #[serde(default)]
    pub owner: Option<ManifestOwner>,
    #[serde(default)]
    pub metadata: Option<ManifestMetadata>,
    #[serde(default)]
    pub plugins: Vec<ManifestPlugin>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestOwner {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// One plugin entry: a named bundle of repo-relative content paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestPlugin {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub commands: Vec<String>,
}

impl MarketplaceManifest {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
