use crate::error::{Result, SkillsyncError};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Name constants
// ---------------------------------------------------------------------------

/// The file that defines a skill directory.
pub const SKILL_FILE: &str = "SKILL.md";

/// Marketplace manifest location, relative to the repository root.
pub const MARKETPLACE_MANIFEST: &str = ".claude-plugin/marketplace.json";

pub const SKILLSYNC_DIR: &str = ".skillsync";
pub const SOURCES_FILE: &str = "sources.json";
pub const INSTALLED_FILE: &str = "installed.json";
pub const CACHE_DIR: &str = "cache";

// ---------------------------------------------------------------------------
// Home resolution
// ---------------------------------------------------------------------------

pub fn home_dir() -> Result<PathBuf> {
    home::home_dir().ok_or(SkillsyncError::HomeNotFound)
}

/// Default skillsync home (`~/.skillsync`), holding the registry files and
/// the clone cache.
pub fn default_skillsync_home() -> Result<PathBuf> {
    Ok(home_dir()?.join(SKILLSYNC_DIR))
}
