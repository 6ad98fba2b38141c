use crate::error::Result;
use crate::frontmatter;
use crate::item::DiscoveredItem;
use crate::manifest::MarketplaceManifest;
use crate::paths::{MARKETPLACE_MANIFEST, SKILL_FILE};
use crate::platform::Platform;
use crate::types::ItemType;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

// ---------------------------------------------------------------------------
// Sweep configuration
// ---------------------------------------------------------------------------

/// Directory names never descended into: version-control metadata,
/// dependency caches, build output.
const IGNORE_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "dist",
    "build",
    "__pycache__",
    ".venv",
    "venv",
];

/// Generic repository docs excluded from the agent candidate sweep,
/// compared case-insensitively against the file stem.
const SKIP_STEMS: &[&str] = &[
    "readme",
    "license",
    "changelog",
    "contributing",
    "code_of_conduct",
    "security",
];

const AGENT_SUFFIX: &str = ".agent.md";
const PROMPT_SUFFIX: &str = ".prompt.md";

/// Platform tags for files in the `.agent.md`/`.prompt.md` convention.
const VSCODE_FAMILY_TAGS: &[&str] = &["vscode", "copilot"];

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Discover all installable items in a repository tree.
///
/// Uses the marketplace manifest when the repository carries one at its
/// fixed location, otherwise auto-discovers by file-name convention and
/// frontmatter shape. Items whose platform tags do not intersect
/// `platform_filter` (after insiders normalization) are dropped; `None`
/// keeps everything.
pub fn discover_all(
    repo_path: &Path,
    platform_filter: Option<&str>,
) -> Result<Vec<DiscoveredItem>> {
    let manifest_path = repo_path.join(MARKETPLACE_MANIFEST);
    let items = if manifest_path.is_file() {
        match MarketplaceManifest::from_file(&manifest_path) {
            Ok(manifest) => discover_from_manifest(repo_path, &manifest),
            Err(e) => {
                warn!(path = %manifest_path.display(), error = %e, "unreadable marketplace manifest, falling back to auto-discovery");
                auto_discover(repo_path)?
            }
        }
    } else {
        auto_discover(repo_path)?
    };

    Ok(filter_by_platform(items, platform_filter))
}

/// Raw content of a discovered item: the defining `SKILL.md` for skills,
/// the file itself for everything else.
pub fn item_content(item: &DiscoveredItem) -> Result<String> {
    let path = if item.item_type == ItemType::Skill {
        item.path.join(SKILL_FILE)
    } else {
        item.path.clone()
    };
    Ok(std::fs::read_to_string(path)?)
}

// ---------------------------------------------------------------------------
// Manifest-driven discovery
// ---------------------------------------------------------------------------

/// Discover the items a marketplace manifest enumerates. Listed paths that
/// do not exist are skipped, not errors: manifests may reference optional
/// content.
fn discover_from_manifest(repo_path: &Path, manifest: &MarketplaceManifest) -> Vec<DiscoveredItem> {
    let mut items = Vec::new();

    for plugin in &manifest.plugins {
        for rel in &plugin.skills {
            let dir = repo_path.join(rel);
            if dir.is_dir() && dir.join(SKILL_FILE).is_file() {
                if let Some(item) = parse_skill_dir(repo_path, &dir) {
                    items.push(item);
                }
            } else {
                debug!(plugin = %plugin.name, path = %rel, "manifest skill path missing, skipped");
            }
        }
        for rel in &plugin.agents {
            let path = repo_path.join(rel);
            if path.is_file() {
                if let Some(item) = parse_markdown_file(repo_path, &path, ItemType::Agent, false) {
                    items.push(item);
                }
            } else {
                debug!(plugin = %plugin.name, path = %rel, "manifest agent path missing, skipped");
            }
        }
        for rel in &plugin.commands {
            let path = repo_path.join(rel);
            if path.is_file() {
                if let Some(item) = parse_markdown_file(repo_path, &path, ItemType::Command, false)
                {
                    items.push(item);
                }
            } else {
                debug!(plugin = %plugin.name, path = %rel, "manifest command path missing, skipped");
            }
        }
    }

    items
}

// ---------------------------------------------------------------------------
// Auto-discovery
// ---------------------------------------------------------------------------

fn auto_discover(repo_path: &Path) -> Result<Vec<DiscoveredItem>> {
    let mut items = Vec::new();
    // Files claimed by an earlier sweep are not re-considered by later ones.
    let mut visited: HashSet<PathBuf> = HashSet::new();

    sweep_suffixed(repo_path, &mut items, &mut visited);
    sweep_commands(repo_path, &mut items, &mut visited);
    sweep_generic_agents(repo_path, &mut items, &visited);
    sweep_skills(repo_path, &mut items);

    Ok(items)
}

fn markdown_files(repo_path: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(repo_path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir()
                && e.file_name()
                    .to_str()
                    .map(|n| IGNORE_DIRS.contains(&n))
                    .unwrap_or(false))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
}

/// Sweep 1: `*.agent.md` files are unconditionally agents, `*.prompt.md`
/// unconditionally prompts. Both carry the vscode-family format.
fn sweep_suffixed(repo_path: &Path, items: &mut Vec<DiscoveredItem>, visited: &mut HashSet<PathBuf>) {
    for path in markdown_files(repo_path) {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let item_type = if file_name.ends_with(AGENT_SUFFIX) {
            ItemType::Agent
        } else if file_name.ends_with(PROMPT_SUFFIX) {
            ItemType::Prompt
        } else {
            continue;
        };
        visited.insert(path.clone());
        if let Some(mut item) = parse_markdown_file(repo_path, &path, item_type, false) {
            item.platforms = VSCODE_FAMILY_TAGS.iter().map(|t| t.to_string()).collect();
            items.push(item);
        }
    }
}

/// Sweep 2: `*.md` files under a `.<tool>/commands/` directory pair are
/// commands; they always require parseable frontmatter.
fn sweep_commands(repo_path: &Path, items: &mut Vec<DiscoveredItem>, visited: &mut HashSet<PathBuf>) {
    for path in markdown_files(repo_path) {
        if visited.contains(&path) || !under_commands_dir(repo_path, &path) {
            continue;
        }
        visited.insert(path.clone());
        if let Some(item) = parse_markdown_file(repo_path, &path, ItemType::Command, true) {
            items.push(item);
        }
    }
}

/// A path qualifies as a command location when any ancestor pair is a
/// dot-prefixed tool directory followed by `commands`.
fn under_commands_dir(repo_path: &Path, path: &Path) -> bool {
    let Ok(rel) = path.strip_prefix(repo_path) else {
        return false;
    };
    let components: Vec<&str> = rel
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    components.windows(2).any(|pair| {
        pair[0].starts_with('.') && pair[0].len() > 1 && pair[1] == "commands"
    })
}

/// Sweep 3: remaining `*.md` files are agent candidates only when they
/// carry valid frontmatter with a `name` field (the strict gate); anything
/// else is silently excluded. Generic repo docs and `SKILL.md` never
/// qualify. Tagged claude-only.
fn sweep_generic_agents(
    repo_path: &Path,
    items: &mut Vec<DiscoveredItem>,
    visited: &HashSet<PathBuf>,
) {
    for path in markdown_files(repo_path) {
        if visited.contains(&path) {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if file_name == SKILL_FILE {
            continue;
        }
        let stem = file_name.trim_end_matches(".md").to_ascii_lowercase();
        if SKIP_STEMS.contains(&stem.as_str()) {
            continue;
        }
        if let Some(item) = parse_markdown_file(repo_path, &path, ItemType::Agent, true) {
            items.push(item);
        }
    }
}

/// Sweep 4: directories containing a `SKILL.md` are skills, keyed by the
/// containing directory. The repository root itself never counts.
fn sweep_skills(repo_path: &Path, items: &mut Vec<DiscoveredItem>) {
    for entry in WalkDir::new(repo_path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir()
                && e.file_name()
                    .to_str()
                    .map(|n| IGNORE_DIRS.contains(&n))
                    .unwrap_or(false))
        })
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_dir() || entry.path() == repo_path {
            continue;
        }
        if entry.path().join(SKILL_FILE).is_file() {
            if let Some(item) = parse_skill_dir(repo_path, entry.path()) {
                items.push(item);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Item parsing
// ---------------------------------------------------------------------------

/// Parse one markdown file into an item. Lenient throughout: unreadable
/// files and (unless gated) unparseable frontmatter skip the candidate
/// instead of erring, since most repository files are expected not to match.
fn parse_markdown_file(
    repo_path: &Path,
    path: &Path,
    item_type: ItemType,
    require_frontmatter: bool,
) -> Option<DiscoveredItem> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "unreadable file skipped");
            return None;
        }
    };

    let fm = if require_frontmatter {
        let (fm, _) = match frontmatter::parse_strict(&content) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no usable frontmatter, skipped");
                return None;
            }
        };
        if item_type == ItemType::Agent && frontmatter::get_str(&fm, "name").is_none() {
            debug!(path = %path.display(), "agent candidate without name field, skipped");
            return None;
        }
        fm
    } else {
        frontmatter::parse_lenient(&content).0
    };

    let name = frontmatter::get_str(&fm, "name")
        .map(|n| n.to_string())
        .unwrap_or_else(|| derive_name_from_path(path));
    let description = frontmatter::get_str(&fm, "description")
        .unwrap_or_default()
        .to_string();

    // Plain .md files carry the claude format; suffixed files are re-tagged
    // by their sweep.
    let platforms = default_platform_tags(path);

    Some(DiscoveredItem {
        name,
        item_type,
        path: path.to_path_buf(),
        description,
        platforms,
        frontmatter: fm,
        relative_path: relative_to(repo_path, path),
    })
}

fn parse_skill_dir(repo_path: &Path, dir: &Path) -> Option<DiscoveredItem> {
    let skill_file = dir.join(SKILL_FILE);
    let content = match std::fs::read_to_string(&skill_file) {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %skill_file.display(), error = %e, "unreadable SKILL.md skipped");
            return None;
        }
    };
    let (fm, _) = frontmatter::parse_lenient(&content);

    let name = frontmatter::get_str(&fm, "name")
        .map(|n| n.to_string())
        .or_else(|| dir.file_name().map(|n| n.to_string_lossy().into_owned()))?;
    let description = frontmatter::get_str(&fm, "description")
        .unwrap_or_default()
        .to_string();

    Some(DiscoveredItem {
        name,
        item_type: ItemType::Skill,
        path: dir.to_path_buf(),
        description,
        platforms: vec!["claude".to_string()],
        frontmatter: fm,
        relative_path: relative_to(repo_path, dir),
    })
}

/// Name from the filename stem, with a leftover `.agent`/`.prompt`
/// pseudo-suffix stripped.
fn derive_name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.trim_end_matches(".agent")
        .trim_end_matches(".prompt")
        .to_string()
}

fn default_platform_tags(path: &Path) -> Vec<String> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if name.ends_with(AGENT_SUFFIX) || name.ends_with(PROMPT_SUFFIX) {
        VSCODE_FAMILY_TAGS.iter().map(|t| t.to_string()).collect()
    } else {
        vec!["claude".to_string()]
    }
}

fn relative_to(repo_path: &Path, path: &Path) -> String {
    path.strip_prefix(repo_path)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

// ---------------------------------------------------------------------------
// Platform filtering
// ---------------------------------------------------------------------------

fn filter_by_platform(
    items: Vec<DiscoveredItem>,
    platform_filter: Option<&str>,
) -> Vec<DiscoveredItem> {
    let Some(filter) = platform_filter else {
        return items;
    };
    let wanted = Platform::normalize_tag(filter);
    items
        .into_iter()
        .filter(|item| {
            item.platforms
                .iter()
                .any(|tag| Platform::normalize_tag(tag) == wanted)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn single_claude_agent_discovered() {
        let repo = TempDir::new().unwrap();
        write(
            repo.path(),
            "src/claude/analyst.md",
            "---\nname: analyst\ndescription: digs\n---\n\n# Analyst\n",
        );

        let items = discover_all(repo.path(), None).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "analyst");
        assert_eq!(items[0].item_type, ItemType::Agent);
        assert_eq!(items[0].platforms, vec!["claude"]);
        assert_eq!(items[0].relative_path, "src/claude/analyst.md");
    }

    #[test]
    fn skill_directory_discovered() {
        let repo = TempDir::new().unwrap();
        write(
            repo.path(),
            ".claude/skills/github/SKILL.md",
            "---\nname: github\ndescription: GitHub ops\n---\n\n# Skill\n",
        );

        let items = discover_all(repo.path(), None).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "github");
        assert_eq!(items[0].item_type, ItemType::Skill);
        assert_eq!(items[0].platforms, vec!["claude"]);
        assert!(items[0].path.ends_with(".claude/skills/github"));
    }

    #[test]
    fn repo_root_is_never_a_skill() {
        let repo = TempDir::new().unwrap();
        write(repo.path(), "SKILL.md", "---\nname: rooted\n---\nbody\n");

        let items = discover_all(repo.path(), None).unwrap();
        assert!(items.iter().all(|i| i.item_type != ItemType::Skill));
    }

    #[test]
    fn suffixed_files_claimed_unconditionally() {
        let repo = TempDir::new().unwrap();
        write(repo.path(), "agents/helper.agent.md", "no frontmatter at all\n");
        write(repo.path(), "prompts/draft.prompt.md", "also bare\n");

        let items = discover_all(repo.path(), None).unwrap();
        let mut types: Vec<_> = items.iter().map(|i| i.item_type).collect();
        types.sort_by_key(|t| t.as_str());
        assert_eq!(types, vec![ItemType::Agent, ItemType::Prompt]);
        for item in &items {
            assert_eq!(item.platforms, vec!["vscode", "copilot"]);
        }
    }

    #[test]
    fn suffixed_agent_not_reclaimed_by_generic_sweep() {
        let repo = TempDir::new().unwrap();
        write(
            repo.path(),
            "a/helper.agent.md",
            "---\nname: helper\n---\nbody\n",
        );

        let items = discover_all(repo.path(), None).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn generic_md_requires_name_field() {
        let repo = TempDir::new().unwrap();
        write(repo.path(), "docs/notes.md", "# Plain markdown\n");
        write(repo.path(), "docs/other.md", "---\ndescription: nameless\n---\nx\n");
        write(repo.path(), "agents/named.md", "---\nname: named\n---\nx\n");

        let items = discover_all(repo.path(), None).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "named");
    }

    #[test]
    fn repo_docs_and_ignore_dirs_excluded() {
        let repo = TempDir::new().unwrap();
        write(repo.path(), "README.md", "---\nname: readme\n---\nx\n");
        write(repo.path(), "CHANGELOG.md", "---\nname: log\n---\nx\n");
        write(
            repo.path(),
            "node_modules/pkg/agent.md",
            "---\nname: dep\n---\nx\n",
        );
        write(
            repo.path(),
            ".git/objects/info.md",
            "---\nname: git\n---\nx\n",
        );

        let items = discover_all(repo.path(), None).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn commands_found_under_dot_tool_dir() {
        let repo = TempDir::new().unwrap();
        write(
            repo.path(),
            ".claude/commands/commit.md",
            "---\nname: commit\ndescription: commit helper\n---\nbody\n",
        );
        // Commands require frontmatter; bare files are skipped.
        write(repo.path(), ".claude/commands/bare.md", "no frontmatter\n");
        // Not under a dot-prefixed tool directory.
        write(repo.path(), "scripts/commands/deploy.md", "---\nname: d\n---\nx\n");

        let items = discover_all(repo.path(), None).unwrap();
        let commands: Vec<_> = items
            .iter()
            .filter(|i| i.item_type == ItemType::Command)
            .collect();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].name, "commit");
    }

    #[test]
    fn name_derived_from_stem_strips_pseudo_suffix() {
        let repo = TempDir::new().unwrap();
        write(repo.path(), "x/my-helper.agent.md", "just a body\n");

        let items = discover_all(repo.path(), None).unwrap();
        assert_eq!(items[0].name, "my-helper");
    }

    #[test]
    fn platform_filter_normalizes_insiders() {
        let repo = TempDir::new().unwrap();
        write(repo.path(), "a/h.agent.md", "body\n");
        write(repo.path(), "b/claude-only.md", "---\nname: c\n---\nx\n");

        let vscode = discover_all(repo.path(), Some("vscode-insiders")).unwrap();
        assert_eq!(vscode.len(), 1);
        assert_eq!(vscode[0].name, "h");

        let claude = discover_all(repo.path(), Some("claude")).unwrap();
        assert_eq!(claude.len(), 1);
        assert_eq!(claude[0].name, "c");

        let all = discover_all(repo.path(), None).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn manifest_drives_discovery_when_present() {
        let repo = TempDir::new().unwrap();
        write(
            repo.path(),
            ".claude-plugin/marketplace.json",
            r#"{
                "name": "acme",
                "plugins": [{
                    "name": "core",
                    "skills": ["skills/github", "skills/missing"],
                    "agents": ["agents/analyst.md"],
                    "commands": []
                }]
            }"#,
        );
        write(
            repo.path(),
            "skills/github/SKILL.md",
            "---\nname: github\n---\nbody\n",
        );
        write(
            repo.path(),
            "agents/analyst.md",
            "---\nname: analyst\n---\nbody\n",
        );
        // Present in the tree but not in the manifest: not discovered.
        write(repo.path(), "extra/unlisted.md", "---\nname: extra\n---\nx\n");

        let items = discover_all(repo.path(), None).unwrap();
        let mut names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["analyst", "github"]);
    }

    #[test]
    fn item_content_reads_skill_manifest() {
        let repo = TempDir::new().unwrap();
        write(
            repo.path(),
            "skills/gh/SKILL.md",
            "---\nname: gh\n---\nskill body\n",
        );
        let items = discover_all(repo.path(), None).unwrap();
        let content = item_content(&items[0]).unwrap();
        assert!(content.contains("skill body"));
    }
}
