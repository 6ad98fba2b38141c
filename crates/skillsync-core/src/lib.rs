//! Core logic for skillsync: discovering AI assistant content (agents,
//! skills, commands, prompts) in source repositories, transforming it
//! between platform formats, and installing it with a registry that tracks
//! what went where.

pub mod discovery;
pub mod error;
pub mod frontmatter;
pub mod gitops;
pub mod hash;
pub mod install;
pub mod io;
pub mod item;
pub mod manifest;
pub mod paths;
pub mod platform;
pub mod registry;
pub mod transform;
pub mod types;

pub use error::{Result, SkillsyncError};
pub use gitops::GitFetcher;
pub use install::{InstallResult, Installer};
pub use item::DiscoveredItem;
pub use manifest::MarketplaceManifest;
pub use platform::Platform;
pub use registry::{InstalledItem, InstalledRegistry, RegistryManager, Source, SourceRegistry};
pub use transform::TransformEngine;
pub use types::{ItemType, Scope};
