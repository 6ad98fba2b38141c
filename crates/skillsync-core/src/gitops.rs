use crate::error::{Result, SkillsyncError};
use crate::io::ensure_dir;
use crate::paths::CACHE_DIR;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

// ---------------------------------------------------------------------------
// Git fetcher
// ---------------------------------------------------------------------------

/// Keeps shallow clones of source repositories under `<home>/cache/<name>`,
/// shelling out to the `git` binary. The clone is a throwaway snapshot:
/// discovery and installation read from it, nothing writes back.
pub struct GitFetcher {
    cache_root: PathBuf,
}

impl GitFetcher {
    pub fn new(home: impl AsRef<Path>) -> Self {
        Self {
            cache_root: home.as_ref().join(CACHE_DIR),
        }
    }

    /// Local checkout path for a source. Source names may contain `/`
    /// (owner/repo), which maps to a nested cache directory.
    pub fn repo_path(&self, name: &str) -> PathBuf {
        self.cache_root.join(name)
    }

    /// Clone the repository if absent, otherwise fetch and reset the
    /// existing clone to the requested ref. Idempotent; returns the
    /// checkout path.
    pub fn clone_or_fetch(&self, url: &str, name: &str, git_ref: &str) -> Result<PathBuf> {
        ensure_dir(&self.cache_root)?;
        let repo_path = self.repo_path(name);

        if repo_path.join(".git").exists() {
            debug!(name, git_ref, "refreshing cached clone");
            self.run_git(
                &repo_path,
                &["fetch", "--depth", "1", "origin", git_ref],
            )?;
            self.run_git(&repo_path, &["checkout", git_ref])?;
            self.run_git(
                &repo_path,
                &["reset", "--hard", &format!("origin/{git_ref}")],
            )?;
        } else {
            debug!(name, url, git_ref, "cloning source");
            if let Some(parent) = repo_path.parent() {
                ensure_dir(parent)?;
            }
            let repo_arg = repo_path.to_string_lossy();
            self.run_git(
                &self.cache_root,
                &["clone", "--depth", "1", "--branch", git_ref, url, &repo_arg],
            )?;
        }
        Ok(repo_path)
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.repo_path(name).exists()
    }

    /// Returns true when a cached clone was actually removed.
    pub fn remove_cached(&self, name: &str) -> Result<bool> {
        let repo_path = self.repo_path(name);
        if !repo_path.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(repo_path)?;
        Ok(true)
    }

    fn run_git(&self, cwd: &Path, args: &[&str]) -> Result<()> {
        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| SkillsyncError::Git(format!("failed to run git: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SkillsyncError::Git(format!(
                "git {} failed: {}",
                args.first().unwrap_or(&""),
                stderr.trim()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn repo_path_nests_owner_repo_names() {
        let home = TempDir::new().unwrap();
        let fetcher = GitFetcher::new(home.path());
        assert_eq!(
            fetcher.repo_path("acme/skills"),
            home.path().join(CACHE_DIR).join("acme/skills")
        );
    }

    #[test]
    fn cache_presence_and_removal() {
        let home = TempDir::new().unwrap();
        let fetcher = GitFetcher::new(home.path());
        assert!(!fetcher.is_cached("acme/skills"));
        assert!(!fetcher.remove_cached("acme/skills").unwrap());

        std::fs::create_dir_all(fetcher.repo_path("acme/skills")).unwrap();
        assert!(fetcher.is_cached("acme/skills"));
        assert!(fetcher.remove_cached("acme/skills").unwrap());
        assert!(!fetcher.is_cached("acme/skills"));
    }

    #[test]
    fn clone_from_local_repository() {
        // Skips silently when git is unavailable in the environment.
        if Command::new("git").arg("--version").output().is_err() {
            return;
        }

        let upstream = TempDir::new().unwrap();
        std::fs::write(upstream.path().join("agent.md"), "---\nname: a\n---\nx\n").unwrap();
        let git = |args: &[&str]| {
            Command::new("git")
                .args(args)
                .current_dir(upstream.path())
                .env("GIT_AUTHOR_NAME", "t")
                .env("GIT_AUTHOR_EMAIL", "t@t")
                .env("GIT_COMMITTER_NAME", "t")
                .env("GIT_COMMITTER_EMAIL", "t@t")
                .output()
                .unwrap()
        };
        git(&["init", "-b", "main"]);
        git(&["add", "."]);
        git(&["commit", "-m", "seed"]);

        let home = TempDir::new().unwrap();
        let fetcher = GitFetcher::new(home.path());
        let url = upstream.path().to_string_lossy().to_string();

        let path = fetcher.clone_or_fetch(&url, "local/seed", "main").unwrap();
        assert!(path.join("agent.md").is_file());

        // Second call takes the fetch path and stays idempotent.
        let again = fetcher.clone_or_fetch(&url, "local/seed", "main").unwrap();
        assert_eq!(path, again);
        assert!(again.join("agent.md").is_file());
    }
}
