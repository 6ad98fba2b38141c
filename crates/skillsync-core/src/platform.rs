use crate::error::{Result, SkillsyncError};
use crate::frontmatter;
use crate::io;
use crate::paths;
use crate::types::ItemType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Target platforms, as a closed enumeration. Each variant is configuration
/// data (paths, suffixes, required fields) consumed by one shared validation
/// and path-resolution algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Claude,
    Vscode,
    VscodeInsiders,
    Copilot,
    Codex,
}

impl Platform {
    pub fn all() -> &'static [Platform] {
        &[
            Platform::Claude,
            Platform::Vscode,
            Platform::VscodeInsiders,
            Platform::Copilot,
            Platform::Codex,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Claude => "claude",
            Platform::Vscode => "vscode",
            Platform::VscodeInsiders => "vscode-insiders",
            Platform::Copilot => "copilot",
            Platform::Codex => "codex",
        }
    }

    /// Collapse secondary variants onto their primary identifier for
    /// comparison purposes (insiders shares the vscode format and filter tag).
    pub fn normalize(self) -> Platform {
        match self {
            Platform::VscodeInsiders => Platform::Vscode,
            other => other,
        }
    }

    /// Normalize a platform tag string for filtering. Unknown tags pass
    /// through unchanged so they simply never match.
    pub fn normalize_tag(tag: &str) -> &str {
        if tag == "vscode-insiders" {
            "vscode"
        } else {
            tag
        }
    }

    // -----------------------------------------------------------------------
    // Per-variant configuration
    // -----------------------------------------------------------------------

    /// Filename suffix for installed agent files.
    pub fn agent_extension(self) -> &'static str {
        match self {
            Platform::Claude | Platform::Codex => ".md",
            Platform::Vscode | Platform::VscodeInsiders | Platform::Copilot => ".agent.md",
        }
    }

    pub fn supports_skills(self) -> bool {
        matches!(self, Platform::Claude | Platform::Codex)
    }

    /// Item types this platform can host.
    pub fn supports(self, item_type: ItemType) -> bool {
        match self {
            Platform::Claude => matches!(
                item_type,
                ItemType::Agent | ItemType::Skill | ItemType::Command
            ),
            Platform::Vscode | Platform::VscodeInsiders => {
                matches!(item_type, ItemType::Agent | ItemType::Prompt)
            }
            Platform::Copilot => matches!(item_type, ItemType::Agent),
            Platform::Codex => matches!(item_type, ItemType::Skill),
        }
    }

    /// Frontmatter fields that must be present for content to install here.
    /// Empty means no required fields.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Platform::Claude | Platform::Codex => &["name"],
            Platform::Vscode | Platform::VscodeInsiders | Platform::Copilot => &[],
        }
    }

    fn field_error_message(self, field: &str) -> String {
        match self {
            Platform::Copilot => format!("Copilot agents must include '{field}' field"),
            _ => format!("Frontmatter must include '{field}' field"),
        }
    }

    // -----------------------------------------------------------------------
    // Validation (shared template)
    // -----------------------------------------------------------------------

    /// Validate content against this platform's format rules. Strict
    /// frontmatter parsing; a parse failure is returned verbatim, otherwise
    /// each missing required field contributes one message. Empty = valid.
    pub fn validate(self, content: &str) -> Vec<String> {
        let parsed = match frontmatter::parse_strict(content) {
            Ok((mapping, _)) => mapping,
            Err(e) => return vec![e.to_string()],
        };

        self.required_fields()
            .iter()
            .filter(|field| !frontmatter::has_key(&parsed, field))
            .map(|field| self.field_error_message(field))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Install locations
    // -----------------------------------------------------------------------

    /// User-scope base directory. OS-dependent for the vscode family.
    pub fn base_dir(self) -> Result<PathBuf> {
        let home = paths::home_dir()?;
        Ok(match self {
            Platform::Claude => home.join(".claude"),
            Platform::Vscode => vscode_user_prompts(&home, false),
            Platform::VscodeInsiders => vscode_user_prompts(&home, true),
            Platform::Copilot => home.join(".copilot"),
            Platform::Codex => home.join(".config").join("opencode"),
        })
    }

    /// Create the user-scope directories this platform installs into.
    /// Idempotent.
    pub fn ensure_dirs(self) -> Result<()> {
        let base = self.base_dir()?;
        match self {
            Platform::Claude => {
                io::ensure_dir(&base.join("agents"))?;
                io::ensure_dir(&base.join("skills"))?;
                io::ensure_dir(&base.join("commands"))?;
            }
            Platform::Vscode | Platform::VscodeInsiders => io::ensure_dir(&base)?,
            Platform::Copilot => io::ensure_dir(&base.join("agents"))?,
            Platform::Codex => io::ensure_dir(&base.join("skill"))?,
        }
        Ok(())
    }

    /// User-scope install path for an item. Unsupported item types are a
    /// hard failure: silently writing a skill into a skill-less platform
    /// would corrupt its state.
    pub fn install_path(self, item_type: ItemType, name: &str) -> Result<PathBuf> {
        let base = self.base_dir()?;
        self.resolve_path(&base, item_type, name, false)
    }

    /// Project-scope install path under the given project root.
    pub fn project_install_path(
        self,
        project_root: &Path,
        item_type: ItemType,
        name: &str,
    ) -> Result<PathBuf> {
        self.resolve_path(project_root, item_type, name, true)
    }

    fn resolve_path(
        self,
        base: &Path,
        item_type: ItemType,
        name: &str,
        project: bool,
    ) -> Result<PathBuf> {
        if !self.supports(item_type) {
            return Err(SkillsyncError::UnsupportedItemType {
                platform: self.as_str().to_string(),
                item_type: item_type.to_string(),
            });
        }
        let ext = self.agent_extension();
        Ok(match self {
            Platform::Claude => {
                let root = if project { base.join(".claude") } else { base.to_path_buf() };
                match item_type {
                    ItemType::Agent => root.join("agents").join(format!("{name}{ext}")),
                    ItemType::Skill => root.join("skills").join(name),
                    ItemType::Command => root.join("commands").join(format!("{name}{ext}")),
                    ItemType::Prompt => unreachable!("filtered by supports()"),
                }
            }
            Platform::Vscode | Platform::VscodeInsiders => {
                let root = if project {
                    base.join(".github").join("prompts")
                } else {
                    base.to_path_buf()
                };
                match item_type {
                    ItemType::Agent => root.join(format!("{name}{ext}")),
                    ItemType::Prompt => root.join(format!("{name}.prompt.md")),
                    _ => unreachable!("filtered by supports()"),
                }
            }
            Platform::Copilot => {
                let root = if project {
                    base.join(".github").join("agents")
                } else {
                    base.join("agents")
                };
                root.join(format!("{name}{ext}"))
            }
            Platform::Codex => {
                if project {
                    base.join(".codex").join("skills").join(name)
                } else {
                    base.join("skill").join(name)
                }
            }
        })
    }

    // -----------------------------------------------------------------------
    // Availability probe
    // -----------------------------------------------------------------------

    /// Best-effort detection of whether the target application exists on
    /// this host. UI hinting only; installs do not depend on it.
    pub fn is_available(self) -> bool {
        let Ok(home) = paths::home_dir() else {
            return false;
        };
        match self {
            Platform::Claude | Platform::Codex => {
                self.base_dir().map(|d| d.exists()).unwrap_or(false)
            }
            Platform::Vscode | Platform::VscodeInsiders => {
                let insiders = self == Platform::VscodeInsiders;
                if cfg!(target_os = "macos") {
                    let app = if insiders {
                        "/Applications/Visual Studio Code - Insiders.app"
                    } else {
                        "/Applications/Visual Studio Code.app"
                    };
                    Path::new(app).exists()
                } else if cfg!(target_os = "windows") {
                    let dir = if insiders {
                        "C:/Program Files/Microsoft VS Code Insiders"
                    } else {
                        "C:/Program Files/Microsoft VS Code"
                    };
                    Path::new(dir).exists()
                } else {
                    let cmd = if insiders { "code-insiders" } else { "code" };
                    Path::new("/usr/bin").join(cmd).exists()
                }
            }
            Platform::Copilot => {
                let extensions = if cfg!(target_os = "windows") {
                    home.join("AppData/Local/GitHub CLI/extensions")
                } else {
                    home.join(".local/share/gh/extensions")
                };
                extensions.join("gh-copilot").exists()
            }
        }
    }
}

fn vscode_user_prompts(home: &Path, insiders: bool) -> PathBuf {
    let base = if cfg!(target_os = "macos") {
        home.join("Library").join("Application Support")
    } else if cfg!(target_os = "windows") {
        home.join("AppData").join("Roaming")
    } else {
        home.join(".config")
    };
    let product = if insiders { "Code - Insiders" } else { "Code" };
    base.join(product).join("User").join("prompts")
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = SkillsyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "claude" => Ok(Platform::Claude),
            "vscode" => Ok(Platform::Vscode),
            "vscode-insiders" => Ok(Platform::VscodeInsiders),
            "copilot" => Ok(Platform::Copilot),
            "codex" => Ok(Platform::Codex),
            _ => Err(SkillsyncError::UnknownPlatform(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
