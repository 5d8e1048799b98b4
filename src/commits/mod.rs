//! Conventional commit parsing
//!
//! Turns raw VCS commits into structured records. Parsing is line-oriented
//! and never fails the run: commits without a recognizable `type(scope): `
//! header are kept as unclassified records (excluded from changelog sections)
//! but are still scanned for breaking-change footers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw commit as supplied by the VCS history collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommit {
  pub sha: String,
  pub message: String,
}

/// Conventional commit types (angular vocabulary)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
  Feat,
  Fix,
  Perf,
  Refactor,
  Docs,
  Style,
  Test,
  Build,
  Ci,
  Chore,
  Revert,
}

impl CommitType {
  /// Parse a type keyword; unknown keywords leave the commit unclassified
  pub fn from_keyword(s: &str) -> Option<Self> {
    match s.to_lowercase().as_str() {
      "feat" => Some(Self::Feat),
      "fix" => Some(Self::Fix),
      "perf" => Some(Self::Perf),
      "refactor" => Some(Self::Refactor),
      "docs" => Some(Self::Docs),
      "style" => Some(Self::Style),
      "test" => Some(Self::Test),
      "build" => Some(Self::Build),
      "ci" => Some(Self::Ci),
      "chore" => Some(Self::Chore),
      "revert" => Some(Self::Revert),
      _ => None,
    }
  }

  /// Get the changelog section heading for this commit type
  pub fn display_name(&self) -> &'static str {
    match self {
      Self::Feat => "Features",
      Self::Fix => "Bug Fixes",
      Self::Perf => "Performance Improvements",
      Self::Refactor => "Refactoring",
      Self::Docs => "Documentation",
      Self::Style => "Style",
      Self::Test => "Tests",
      Self::Build => "Build",
      Self::Ci => "CI",
      Self::Chore => "Chores",
      Self::Revert => "Reverts",
    }
  }
}

impl fmt::Display for CommitType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.display_name())
  }
}

/// Commit message grammar: which footer keywords declare a breaking change
#[derive(Debug, Clone)]
pub struct CommitGrammar {
  note_keywords: Vec<String>,
}

impl CommitGrammar {
  pub fn new(note_keywords: Vec<String>) -> Self {
    Self { note_keywords }
  }

  /// If the line is a breaking-change footer, return the text after the keyword
  fn match_note(&self, line: &str) -> Option<String> {
    for keyword in &self.note_keywords {
      if line.len() > keyword.len()
        && line.is_char_boundary(keyword.len())
        && line[..keyword.len()].eq_ignore_ascii_case(keyword)
      {
        let rest = &line[keyword.len()..];
        // Accept "KEYWORD: text" and "KEYWORD text"
        let text = rest.strip_prefix(':').unwrap_or(rest);
        if text.starts_with(|c: char| c.is_whitespace()) || rest.starts_with(':') {
          return Some(text.trim().to_string());
        }
      }
    }
    None
  }
}

impl Default for CommitGrammar {
  fn default() -> Self {
    Self::new(vec![
      "BREAKING CHANGE".to_string(),
      "BREAKING CHANGES".to_string(),
      "BREAKING".to_string(),
    ])
  }
}

/// A parsed commit record
///
/// Immutable once parsed. `commit_type` is None for commits whose header does
/// not match the configured grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
  pub sha: String,
  pub raw_message: String,
  pub commit_type: Option<CommitType>,
  pub scope: Option<String>,
  pub subject: String,
  pub body: Option<String>,
  pub breaking_notes: Vec<String>,
  pub is_breaking: bool,
}

/// Parse an ordered sequence of raw commits, preserving order
pub fn parse_commits(raw: &[RawCommit], grammar: &CommitGrammar) -> Vec<CommitRecord> {
  raw.iter().map(|c| parse_commit(c, grammar)).collect()
}

/// Parse one raw commit into a record
pub fn parse_commit(raw: &RawCommit, grammar: &CommitGrammar) -> CommitRecord {
  let (first_line, rest) = raw.message.split_once('\n').unwrap_or((raw.message.as_str(), ""));
  let first_line = first_line.trim_end();

  let header = parse_header(first_line);
  let (commit_type, scope, bang, subject) = match header {
    Some((t, s, b, subj)) => (Some(t), s, b, subj),
    None => (None, None, false, first_line.to_string()),
  };

  // Scan remaining lines for body text and breaking-change footers.
  // A footer entry extends over continuation lines until a blank line or
  // the next footer.
  let mut body_lines: Vec<&str> = Vec::new();
  let mut breaking_notes: Vec<String> = Vec::new();
  let mut current_note: Option<String> = None;

  for line in rest.lines() {
    let trimmed = line.trim_end();

    if trimmed.trim().is_empty() {
      if let Some(note) = current_note.take() {
        breaking_notes.push(note);
      }
      continue;
    }

    if let Some(text) = grammar.match_note(trimmed.trim_start()) {
      if let Some(note) = current_note.take() {
        breaking_notes.push(note);
      }
      current_note = Some(text);
      continue;
    }

    if let Some(note) = current_note.as_mut() {
      if note.is_empty() {
        *note = trimmed.trim().to_string();
      } else {
        note.push(' ');
        note.push_str(trimmed.trim());
      }
    } else {
      body_lines.push(trimmed);
    }
  }

  if let Some(note) = current_note.take() {
    breaking_notes.push(note);
  }

  let is_breaking = bang || !breaking_notes.is_empty();

  let body = if body_lines.is_empty() {
    None
  } else {
    Some(body_lines.join("\n"))
  };

  CommitRecord {
    sha: raw.sha.clone(),
    raw_message: raw.message.clone(),
    commit_type,
    scope,
    subject,
    body,
    breaking_notes,
    is_breaking,
  }
}

/// Parse a `type(scope)!: subject` header against the angular vocabulary
///
/// Returns None when the header is malformed or the type keyword is unknown.
fn parse_header(line: &str) -> Option<(CommitType, Option<String>, bool, String)> {
  let (head, subject) = line.split_once(':')?;
  let subject = subject.trim();
  if subject.is_empty() {
    return None;
  }

  let (head, bang) = match head.strip_suffix('!') {
    Some(h) => (h, true),
    None => (head, false),
  };

  let (type_word, scope) = match head.split_once('(') {
    Some((t, rest)) => {
      let scope = rest.strip_suffix(')')?;
      if scope.is_empty() {
        return None;
      }
      (t, Some(scope.to_string()))
    }
    None => (head, None),
  };

  let type_word = type_word.trim();
  if type_word.is_empty() || !type_word.chars().all(|c| c.is_ascii_alphanumeric()) {
    return None;
  }

  let commit_type = CommitType::from_keyword(type_word)?;
  Some((commit_type, scope, bang, subject.to_string()))
}
