//! Release notes generation from parsed commits
//!
//! Groups classified commits by type into ordered sections and renders them
//! as markdown. A dedicated breaking-changes section is emitted first whenever
//! any breaking note exists, independent of the originating commit type.
//! Generation is pure: the same commits and version always produce an
//! identical document.

use crate::commits::{CommitRecord, CommitType};
use crate::core::config::SortKey;
use serde::{Deserialize, Serialize};

/// Section ordering for the changelog (feat before fix before perf, then the rest)
const SECTION_ORDER: [CommitType; 11] = [
  CommitType::Feat,
  CommitType::Fix,
  CommitType::Perf,
  CommitType::Refactor,
  CommitType::Docs,
  CommitType::Style,
  CommitType::Test,
  CommitType::Build,
  CommitType::Ci,
  CommitType::Chore,
  CommitType::Revert,
];

/// One changelog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEntry {
  pub scope: Option<String>,
  pub subject: String,
  pub sha: String,
}

/// One changelog section, keyed by commit type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSection {
  pub commit_type: CommitType,
  pub entries: Vec<NoteEntry>,
}

/// Structured release notes for one version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseNotes {
  pub version: String,
  /// Release date (ISO 8601)
  pub date: String,
  /// Breaking-change footers collected across all commits
  pub breaking: Vec<String>,
  pub sections: Vec<NoteSection>,
}

/// Generate release notes from commits
pub fn generate(
  commits: &[CommitRecord],
  version: &semver::Version,
  date: &str,
  sort_keys: &[SortKey],
) -> ReleaseNotes {
  // Breaking notes come from every commit, classified or not
  let breaking: Vec<String> = commits
    .iter()
    .flat_map(|c| c.breaking_notes.iter())
    .filter(|n| !n.is_empty())
    .cloned()
    .collect();

  let mut sections = Vec::new();
  for commit_type in SECTION_ORDER {
    let mut entries: Vec<NoteEntry> = commits
      .iter()
      .filter(|c| c.commit_type == Some(commit_type))
      .map(|c| NoteEntry {
        scope: c.scope.clone(),
        subject: c.subject.clone(),
        sha: c.sha.clone(),
      })
      .collect();

    if entries.is_empty() {
      continue;
    }

    // Stable sort: ties keep original commit order
    entries.sort_by(|a, b| compare_entries(a, b, sort_keys));
    sections.push(NoteSection { commit_type, entries });
  }

  ReleaseNotes {
    version: version.to_string(),
    date: date.to_string(),
    breaking,
    sections,
  }
}

fn compare_entries(a: &NoteEntry, b: &NoteEntry, sort_keys: &[SortKey]) -> std::cmp::Ordering {
  for key in sort_keys {
    let ord = match key {
      SortKey::Subject => a.subject.cmp(&b.subject),
      SortKey::Scope => a.scope.cmp(&b.scope),
    };
    if ord != std::cmp::Ordering::Equal {
      return ord;
    }
  }
  std::cmp::Ordering::Equal
}

impl ReleaseNotes {
  /// Check whether the document has any content
  pub fn is_empty(&self) -> bool {
    self.breaking.is_empty() && self.sections.is_empty()
  }

  /// Render as markdown
  pub fn to_markdown(&self) -> String {
    let mut output = String::new();

    output.push_str(&format!("## [{}] - {}\n\n", self.version, self.date));

    if !self.breaking.is_empty() {
      output.push_str("### BREAKING CHANGES\n\n");
      for note in &self.breaking {
        output.push_str(&format!("- {}\n", note));
      }
      output.push('\n');
    }

    for section in &self.sections {
      output.push_str(&format!("### {}\n\n", section.commit_type.display_name()));
      for entry in &section.entries {
        let scope_str = entry
          .scope
          .as_ref()
          .map(|s| format!("**{}**: ", s))
          .unwrap_or_default();
        let short_sha = &entry.sha[..7.min(entry.sha.len())];
        output.push_str(&format!("- {}{} ({})\n", scope_str, entry.subject, short_sha));
      }
      output.push('\n');
    }

    output
  }

  /// Render as pretty JSON
  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(self)
  }
}
