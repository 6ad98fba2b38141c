use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ItemType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Agent,
    Skill,
    Command,
    Prompt,
}

impl ItemType {
    pub fn all() -> &'static [ItemType] {
        &[
            ItemType::Agent,
            ItemType::Skill,
            ItemType::Command,
            ItemType::Prompt,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Agent => "agent",
            ItemType::Skill => "skill",
            ItemType::Command => "command",
            ItemType::Prompt => "prompt",
        }
    }

    /// Skills are directories; everything else is a single file.
    pub fn is_directory(self) -> bool {
        matches!(self, ItemType::Skill)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemType {
    type Err = crate::error::SkillsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agent" => Ok(ItemType::Agent),
            "skill" => Ok(ItemType::Skill),
            "command" => Ok(ItemType::Command),
            "prompt" => Ok(ItemType::Prompt),
            _ => Err(crate::error::SkillsyncError::UnknownItemType(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    User,
    Project,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::Project => "project",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Scope {
    type Err = crate::error::SkillsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Scope::User),
            "project" => Ok(Scope::Project),
            _ => Err(crate::error::SkillsyncError::UnknownScope(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
