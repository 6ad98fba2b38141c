use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkillsyncError {
    #[error("content must start with YAML frontmatter")]
    MissingFrontmatter,

    #[error("invalid frontmatter: missing closing ---")]
    MalformedFrontmatter,

    #[error("invalid frontmatter: {0}")]
    InvalidFrontmatter(String),

    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("unknown item type: {0}")]
    UnknownItemType(String),

    #[error("unknown scope: {0}")]
    UnknownScope(String),

    #[error("{platform} does not support {item_type} items")]
    UnsupportedItemType { platform: String, item_type: String },

    #[error("cannot transform from {from} to {target}")]
    UnsupportedTransform { from: String, target: String },

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("project_root is required when scope is 'project'")]
    ProjectRootRequired,

    #[error("source '{0}' already exists")]
    SourceExists(String),

    #[error("inconsistent install result: {0}")]
    InconsistentResult(String),

    #[error("git operation failed: {0}")]
    Git(String),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SkillsyncError>;
