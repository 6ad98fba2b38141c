use crate::frontmatter::Frontmatter;
use crate::types::ItemType;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// DiscoveredItem
// ---------------------------------------------------------------------------

/// One discoverable unit of content found in a source repository.
///
/// Constructed fresh on every discovery scan and read-only afterwards;
/// nothing here is persisted.
#[derive(Debug, Clone)]
pub struct DiscoveredItem {
    /// Display/lookup name, from the frontmatter `name` field or filename.
    pub name: String,
    pub item_type: ItemType,
    /// File for agents/commands/prompts; directory for skills.
    pub path: PathBuf,
    pub description: String,
    /// Platform identifiers whose format this item is compatible with.
    pub platforms: Vec<String>,
    pub frontmatter: Frontmatter,
    /// Path relative to the repository root; disambiguates items that share
    /// a name.
    pub relative_path: String,
}

impl DiscoveredItem {
    /// Stable identity within a repository: the relative path when known,
    /// falling back to the name.
    pub fn item_key(&self) -> &str {
        if self.relative_path.is_empty() {
            &self.name
        } else {
            &self.relative_path
        }
    }

    /// The unique handle used across discovery, installation, and the
    /// registry: `{source}/{type}/{key}`. Stable for the same file at the
    /// same path across repeated scans.
    pub fn item_id(&self, source_name: &str) -> String {
        format!("{}/{}/{}", source_name, self.item_type, self.item_key())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, relative_path: &str) -> DiscoveredItem {
        DiscoveredItem {
            name: name.to_string(),
            item_type: ItemType::Agent,
            path: PathBuf::from("/repo").join(relative_path),
            description: String::new(),
            platforms: vec!["claude".to_string()],
            frontmatter: Frontmatter::new(),
            relative_path: relative_path.to_string(),
        }
    }

    #[test]
    fn item_key_prefers_relative_path() {
        let i = item("analyst", "src/claude/analyst.md");
        assert_eq!(i.item_key(), "src/claude/analyst.md");
    }

    #[test]
    fn item_key_falls_back_to_name() {
        let i = item("analyst", "");
        assert_eq!(i.item_key(), "analyst");
    }

    #[test]
    fn item_id_is_source_type_key() {
        let i = item("analyst", "src/analyst.md");
        assert_eq!(i.item_id("acme/agents"), "acme/agents/agent/src/analyst.md");
    }

    #[test]
    fn item_id_stable_across_clones() {
        let a = item("analyst", "src/analyst.md");
        let b = a.clone();
        assert_eq!(a.item_id("s"), b.item_id("s"));
    }
}
