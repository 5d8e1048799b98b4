//! Version analysis: reduce commits since the last release to a bump decision
//!
//! Pure functions over parsed commits. Identical commit sets always yield
//! identical bumps.

use crate::commits::{CommitRecord, CommitType};
use serde::{Deserialize, Serialize};

/// Initial version for repositories without a prior release
pub const INITIAL_VERSION: semver::Version = semver::Version::new(1, 0, 0);

/// Version bump type based on conventional commits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
  /// Major version bump (breaking changes)
  Major,
  /// Minor version bump (new features)
  Minor,
  /// Patch version bump (bug fixes, performance)
  Patch,
  /// No bump needed (no release-relevant changes)
  None,
}

impl VersionBump {
  /// Apply bump to a semver version
  pub fn apply(&self, version: &semver::Version) -> semver::Version {
    match self {
      VersionBump::Major => semver::Version::new(version.major + 1, 0, 0),
      VersionBump::Minor => semver::Version::new(version.major, version.minor + 1, 0),
      VersionBump::Patch => semver::Version::new(version.major, version.minor, version.patch + 1),
      VersionBump::None => version.clone(),
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      VersionBump::Major => "major",
      VersionBump::Minor => "minor",
      VersionBump::Patch => "patch",
      VersionBump::None => "none",
    }
  }
}

/// Determine the version bump from commits, taking the maximum severity
pub fn analyze(commits: &[CommitRecord]) -> VersionBump {
  if commits.is_empty() {
    return VersionBump::None;
  }

  if commits.iter().any(|c| c.is_breaking) {
    return VersionBump::Major;
  }

  if commits.iter().any(|c| c.commit_type == Some(CommitType::Feat)) {
    return VersionBump::Minor;
  }

  if commits
    .iter()
    .any(|c| matches!(c.commit_type, Some(CommitType::Fix) | Some(CommitType::Perf)))
  {
    return VersionBump::Patch;
  }

  VersionBump::None
}

/// Compute the next version
///
/// Without a prior release the result is the initial version (1.0.0) whenever
/// any commit exists, regardless of the computed bump. Returns None when no
/// release is warranted.
pub fn next_version(commits: &[CommitRecord], last: Option<&semver::Version>) -> Option<semver::Version> {
  if commits.is_empty() {
    return None;
  }

  match last {
    None => Some(INITIAL_VERSION),
    Some(last) => match analyze(commits) {
      VersionBump::None => None,
      bump => Some(bump.apply(last)),
    },
  }
}
