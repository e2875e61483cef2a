//! Async Git working-tree manager built on the `git` CLI with Tokio.
//!
//! - Clones the target branch and the PR head into isolated temporary
//!   directories under one process-owned base.
//! - Every directory the store creates is tracked, so [`RepoStore::cleanup_all`]
//!   is total even after partial failures.
//! - Repository URLs are validated before any I/O; cloning into a non-empty
//!   directory is refused.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub mod errors;
pub mod git;
pub mod urls;

pub use errors::{RepoError, RepoResult};
pub use urls::RepoUrl;

use git::run_git;

/// Sentinel returned when HEAD cannot be resolved (not a repository, git
/// missing). Downstream cache validation treats it as never-valid.
pub const UNKNOWN_COMMIT: &str = "unknown";

const DEFAULT_CLONE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const PR_FETCH_TIMEOUT: Duration = Duration::from_secs(60);
const QUICK_GIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Knobs for one clone.
#[derive(Debug, Clone)]
pub struct CloneOptions {
    /// Shallow depth; `None` means a full clone.
    pub depth: Option<u32>,
    pub single_branch: bool,
    pub quiet: bool,
    pub timeout: Duration,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            depth: Some(1),
            single_branch: true,
            quiet: true,
            timeout: DEFAULT_CLONE_TIMEOUT,
        }
    }
}

/// One checked-out snapshot: `(repo, branch, commit, local path)`.
#[derive(Debug, Clone)]
pub struct WorkingTree {
    pub repo_url: String,
    pub branch: String,
    pub commit_hash: String,
    pub path: PathBuf,
}

/// Manager for temporary working trees.
///
/// Owns a base directory; every tree lives in a unique subdirectory and is
/// registered at creation time, before the clone can fail.
pub struct RepoStore {
    base_dir: PathBuf,
    created: Mutex<Vec<PathBuf>>,
}

impl RepoStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> RepoResult<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir,
            created: Mutex::new(Vec::new()),
        })
    }

    /// Clones `url` (optionally a specific branch) into a fresh directory.
    /// On failure the partial directory is removed before the error
    /// surfaces.
    #[instrument(skip_all, fields(repo = %url, branch = branch.unwrap_or("default")))]
    pub async fn clone(
        &self,
        url: &str,
        branch: Option<&str>,
        opts: &CloneOptions,
    ) -> RepoResult<WorkingTree> {
        let repo = RepoUrl::parse(url)?;
        let target = self.allocate_tree_dir(&repo.name)?;

        let depth_s;
        let mut args: Vec<&str> = vec!["clone"];
        if let Some(depth) = opts.depth {
            depth_s = depth.to_string();
            args.push("--depth");
            args.push(&depth_s);
        }
        if opts.single_branch {
            args.push("--single-branch");
        }
        if opts.quiet {
            args.push("--quiet");
        }
        if let Some(b) = branch {
            args.push("--branch");
            args.push(b);
        }
        let clone_url = repo.clone_url();
        args.push(&clone_url);
        let target_s = target.to_string_lossy().into_owned();
        args.push(&target_s);

        if let Err(e) = run_git(None, &args, "clone", opts.timeout).await {
            self.rollback_dir(&target);
            return Err(e);
        }

        let branch_name = match branch {
            Some(b) => b.to_string(),
            None => self.current_branch(&target).await,
        };
        let commit_hash = head_of(&target).await;
        info!(path = %target.display(), commit = %commit_hash, "clone completed");

        Ok(WorkingTree {
            repo_url: repo.slug(),
            branch: branch_name,
            commit_hash,
            path: target,
        })
    }

    /// Produces the two isolated trees a PR analysis needs: a shallow
    /// clone of the target branch, and an independent clone with the PR
    /// head ref fetched and checked out as local branch `pr-<n>`.
    #[instrument(skip_all, fields(repo = %url, pr = pr_number, target = target_branch))]
    pub async fn prepare_for_pr(
        &self,
        url: &str,
        pr_number: u64,
        target_branch: &str,
    ) -> RepoResult<(WorkingTree, WorkingTree)> {
        let main_tree = self
            .clone(url, Some(target_branch), &CloneOptions::default())
            .await?;

        // The PR clone starts from the default branch; the head ref is
        // fetched on top, so single-branch is fine.
        let pr_tree = match self.clone(url, None, &CloneOptions::default()).await {
            Ok(tree) => tree,
            Err(e) => {
                self.rollback_dir(&main_tree.path);
                return Err(e);
            }
        };

        let pr_ref = format!("pull/{pr_number}/head");
        let local_branch = format!("pr-{pr_number}");
        let refspec = format!("{pr_ref}:{local_branch}");
        let fetch = run_git(
            Some(&pr_tree.path),
            &["fetch", "origin", &refspec],
            "pr-fetch",
            PR_FETCH_TIMEOUT,
        )
        .await;
        if let Err(e) = fetch {
            self.rollback_dir(&main_tree.path);
            self.rollback_dir(&pr_tree.path);
            return Err(RepoError::PrFetch {
                pr_ref,
                detail: e.to_string(),
            });
        }

        let mut pr_tree = pr_tree;
        if let Err(e) = self.checkout(&mut pr_tree, &local_branch).await {
            self.rollback_dir(&main_tree.path);
            self.rollback_dir(&pr_tree.path);
            return Err(e);
        }

        Ok((main_tree, pr_tree))
    }

    /// Checks out `branch` and refreshes the tree's branch and commit.
    pub async fn checkout(&self, tree: &mut WorkingTree, branch: &str) -> RepoResult<()> {
        run_git(
            Some(&tree.path),
            &["checkout", "--quiet", branch],
            "checkout",
            QUICK_GIT_TIMEOUT,
        )
        .await?;
        tree.branch = branch.to_string();
        tree.commit_hash = head_of(&tree.path).await;
        Ok(())
    }

    /// `git diff --name-only base..head`, one relative path per entry.
    pub async fn changed_files(
        &self,
        tree: &WorkingTree,
        base: &str,
        head: &str,
    ) -> RepoResult<Vec<String>> {
        let range = format!("{base}..{head}");
        let out = run_git(
            Some(&tree.path),
            &["diff", "--name-only", &range],
            "diff",
            QUICK_GIT_TIMEOUT,
        )
        .await?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    /// Resolved HEAD of the tree, or [`UNKNOWN_COMMIT`].
    pub async fn commit_hash(&self, tree: &WorkingTree) -> String {
        head_of(&tree.path).await
    }

    /// Removes every directory this store created. Safe to call multiple
    /// times and after partial failures; returns how many were removed.
    pub async fn cleanup_all(&self) -> usize {
        let dirs: Vec<PathBuf> = {
            let mut created = self.created.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *created)
        };
        let mut removed = 0;
        for dir in dirs {
            if !dir.exists() {
                continue;
            }
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => {
                    debug!(path = %dir.display(), "removed working tree");
                    removed += 1;
                }
                Err(e) => warn!(path = %dir.display(), error = %e, "cleanup failed"),
            }
        }
        removed
    }

    /// Synchronous variant of [`RepoStore::cleanup_all`] for drop-time
    /// guards, where no executor is available.
    pub fn cleanup_all_blocking(&self) -> usize {
        let dirs: Vec<PathBuf> = {
            let mut created = self.created.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *created)
        };
        let mut removed = 0;
        for dir in dirs {
            if !dir.exists() {
                continue;
            }
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %dir.display(), error = %e, "cleanup failed"),
            }
        }
        removed
    }

    /// How many directories are currently registered (for diagnostics).
    pub fn tracked_dirs(&self) -> usize {
        self.created.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Reserves a unique, empty directory and registers it for cleanup
    /// **before** any git runs, so even an interrupted clone is swept.
    fn allocate_tree_dir(&self, repo_name: &str) -> RepoResult<PathBuf> {
        let suffix = Uuid::new_v4().simple().to_string();
        let dir = self
            .base_dir
            .join(format!("{repo_name}-{}", &suffix[..8]));
        if dir.exists() && std::fs::read_dir(&dir)?.next().is_some() {
            return Err(RepoError::TargetNotEmpty(dir));
        }
        self.created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(dir.clone());
        Ok(dir)
    }

    fn rollback_dir(&self, dir: &Path) {
        if dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(dir) {
                warn!(path = %dir.display(), error = %e, "rollback failed");
            }
        }
        let mut created = self.created.lock().unwrap_or_else(|e| e.into_inner());
        created.retain(|d| d != dir);
    }

    async fn current_branch(&self, path: &Path) -> String {
        match run_git(
            Some(path),
            &["rev-parse", "--abbrev-ref", "HEAD"],
            "current-branch",
            QUICK_GIT_TIMEOUT,
        )
        .await
        {
            Ok(out) => out.trim().to_string(),
            Err(_) => "HEAD".to_string(),
        }
    }
}

impl Drop for RepoStore {
    /// Working trees are ephemeral by contract; dropping the store (on any
    /// code path, cancellation included) sweeps whatever `cleanup_all` has
    /// not already removed.
    fn drop(&mut self) {
        self.cleanup_all_blocking();
    }
}

async fn head_of(path: &Path) -> String {
    match run_git(
        Some(path),
        &["rev-parse", "HEAD"],
        "rev-parse",
        QUICK_GIT_TIMEOUT,
    )
    .await
    {
        Ok(out) => out.trim().to_string(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "HEAD unresolved, using sentinel");
            UNKNOWN_COMMIT.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_unique_registered_dirs() {
        let base = tempfile::tempdir().unwrap();
        let store = RepoStore::new(base.path()).unwrap();
        let a = store.allocate_tree_dir("repo").unwrap();
        let b = store.allocate_tree_dir("repo").unwrap();
        assert_ne!(a, b);
        assert_eq!(store.tracked_dirs(), 2);
        assert!(a.starts_with(base.path()));
    }

    #[tokio::test]
    async fn cleanup_removes_everything_registered() {
        let base = tempfile::tempdir().unwrap();
        let store = RepoStore::new(base.path()).unwrap();
        let a = store.allocate_tree_dir("repo").unwrap();
        let b = store.allocate_tree_dir("repo").unwrap();
        std::fs::create_dir_all(&a).unwrap();
        std::fs::write(a.join("f.txt"), "x").unwrap();
        std::fs::create_dir_all(&b).unwrap();

        let removed = store.cleanup_all().await;
        assert_eq!(removed, 2);
        assert!(!a.exists());
        assert_eq!(store.tracked_dirs(), 0);

        // Idempotent.
        assert_eq!(store.cleanup_all().await, 0);
    }

    #[tokio::test]
    async fn cleanup_survives_never_created_dirs() {
        let base = tempfile::tempdir().unwrap();
        let store = RepoStore::new(base.path()).unwrap();
        // Registered but the clone never ran.
        store.allocate_tree_dir("repo").unwrap();
        assert_eq!(store.cleanup_all().await, 0);
        assert_eq!(store.tracked_dirs(), 0);
    }

    #[tokio::test]
    async fn invalid_url_is_rejected_before_io() {
        let base = tempfile::tempdir().unwrap();
        let store = RepoStore::new(base.path()).unwrap();
        let res = store
            .clone("https://gitlab.com/a/b", None, &CloneOptions::default())
            .await;
        assert!(matches!(res, Err(RepoError::InvalidUrl(_))));
        assert_eq!(store.tracked_dirs(), 0);
    }

    #[tokio::test]
    async fn head_of_non_repo_is_the_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(head_of(dir.path()).await, UNKNOWN_COMMIT);
    }

    #[test]
    fn rollback_unregisters_the_dir() {
        let base = tempfile::tempdir().unwrap();
        let store = RepoStore::new(base.path()).unwrap();
        let dir = store.allocate_tree_dir("repo").unwrap();
        std::fs::create_dir_all(&dir).unwrap();
        store.rollback_dir(&dir);
        assert!(!dir.exists());
        assert_eq!(store.tracked_dirs(), 0);
    }
}
