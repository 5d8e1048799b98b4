//! System git backend - zero crate dependencies
//!
//! Uses the system `git` binary for all VCS operations: reading history since
//! the last release tag, resolving the current branch and HEAD, and creating
//! the release tag. Commands run with an isolated working directory and every
//! failure maps to a structured git error.

use crate::commits::RawCommit;
use crate::core::context::LastRelease;
use crate::core::error::{GitError, SemrelError, SemrelResult, ResultExt};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Git backend using system git
pub struct SystemGit {
  work_tree: PathBuf,
}

impl SystemGit {
  /// Open a git repository
  pub fn open(path: &Path) -> SemrelResult<Self> {
    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(SemrelError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(SemrelError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(Self {
      work_tree: PathBuf::from(stdout.trim()),
    })
  }

  fn run(&self, args: &[&str]) -> SemrelResult<String> {
    let output = Command::new("git")
      .arg("-C")
      .arg(&self.work_tree)
      .args(args)
      .output()
      .with_context(|| format!("Failed to execute git {}", args.join(" ")))?;

    if !output.status.success() {
      return Err(SemrelError::Git(GitError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
  }

  /// Get the current branch name
  pub fn current_branch(&self) -> SemrelResult<String> {
    Ok(self.run(&["rev-parse", "--abbrev-ref", "HEAD"])?.trim().to_string())
  }

  /// Get HEAD commit SHA
  pub fn head_commit(&self) -> SemrelResult<String> {
    Ok(self.run(&["rev-parse", "HEAD"])?.trim().to_string())
  }

  /// Find the most recent release by scanning tags that match the tag format
  ///
  /// "Most recent" is semver order over the parsed versions, not tag creation
  /// time. Returns None when no tag matches (valid: no prior release).
  pub fn last_release(&self, tag_format: &str) -> SemrelResult<Option<LastRelease>> {
    let stdout = self.run(&["tag", "--list"])?;

    let mut best: Option<LastRelease> = None;
    for tag in stdout.lines().map(str::trim).filter(|t| !t.is_empty()) {
      let Some(version) = version_from_tag(tag, tag_format) else {
        continue;
      };
      if best.as_ref().is_none_or(|b| version > b.version) {
        let sha = self.run(&["rev-list", "-n", "1", tag])?.trim().to_string();
        best = Some(LastRelease {
          version,
          git_head: sha,
          tag: tag.to_string(),
        });
      }
    }

    Ok(best)
  }

  /// Get commits since a ref (exclusive), oldest first
  ///
  /// With `since` = None the full history is returned (first release).
  pub fn commits_since(&self, since: Option<&str>) -> SemrelResult<Vec<RawCommit>> {
    // %x1f separates sha from message, %x1e terminates the record
    let format = "--format=%H%x1f%B%x1e";
    let stdout = match since {
      Some(since) => self.run(&["log", &format!("{}..HEAD", since), format])?,
      None => self.run(&["log", format])?,
    };

    let mut commits = Vec::new();
    for record in stdout.split('\u{1e}') {
      let record = record.trim_start_matches(['\n', '\r']);
      if record.trim().is_empty() {
        continue;
      }
      let Some((sha, message)) = record.split_once('\u{1f}') else {
        continue;
      };
      commits.push(RawCommit {
        sha: sha.trim().to_string(),
        message: message.trim_end().to_string(),
      });
    }

    // git log is newest-first; the pipeline wants original commit order
    commits.reverse();
    Ok(commits)
  }

  /// Create an annotated tag at HEAD
  pub fn create_tag(&self, tag: &str, message: &str) -> SemrelResult<()> {
    self.run(&["tag", "-a", tag, "-m", message]).map_err(|e| {
      SemrelError::Git(GitError::TagError {
        tag: tag.to_string(),
        reason: e.to_string(),
      })
    })?;
    Ok(())
  }

  /// Stage the given paths and commit them with the message
  ///
  /// Paths that do not exist are skipped; when nothing is staged (no asset
  /// changed) the commit is skipped entirely instead of failing.
  pub fn commit_files(&self, paths: &[PathBuf], message: &str) -> SemrelResult<()> {
    let mut existing: Vec<&str> = Vec::new();
    for path in paths {
      if self.work_tree.join(path).exists() {
        let path = path.to_str().ok_or_else(|| {
          SemrelError::message(format!("Asset path is not valid UTF-8: {}", path.display()))
        })?;
        existing.push(path);
      }
    }
    if existing.is_empty() {
      return Ok(());
    }

    let mut add_args = vec!["add", "--"];
    add_args.extend(&existing);
    self.run(&add_args)?;

    let mut status_args = vec!["status", "--porcelain", "--"];
    status_args.extend(&existing);
    if self.run(&status_args)?.trim().is_empty() {
      return Ok(());
    }

    self.run(&["commit", "-m", message])?;
    Ok(())
  }
}

/// Parse a version out of a tag name given the tag format template
///
/// `version_from_tag("v1.2.3", "v{version}")` yields 1.2.3; tags that do not
/// match the template's prefix/suffix or whose middle is not valid semver
/// yield None.
pub fn version_from_tag(tag: &str, tag_format: &str) -> Option<semver::Version> {
  let (prefix, suffix) = tag_format.split_once("{version}")?;
  let rest = tag.strip_prefix(prefix)?;
  let middle = rest.strip_suffix(suffix)?;
  semver::Version::parse(middle).ok()
}
