//! Shared release context - built once per run, passed to every step
//!
//! The context is the append-only record of the in-progress release. The
//! executor is its sole mutator between stages; steps read a snapshot and
//! report outcomes back through the executor. `next_release.version` and
//! `next_release.notes` are write-once: the analyzer and notes generator set
//! them exactly once before any prepare step runs, and a second set attempt
//! is rejected as a configuration error.

use crate::core::error::{ConfigError, SemrelError, SemrelResult};
use crate::notes::ReleaseNotes;
use crate::pipeline::stage::PipelineStage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The most recent recognized release (absence is valid: no prior release)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastRelease {
  pub version: semver::Version,
  pub git_head: String,
  pub tag: String,
}

/// The in-progress release; version and notes are write-once
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NextRelease {
  version: Option<semver::Version>,
  notes: Option<ReleaseNotes>,
  tag: Option<String>,
  channel: Option<String>,
}

/// Outcome of one step invocation, recorded in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
  pub stage: PipelineStage,
  pub step: String,
  pub status: StepStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
  Completed,
  Skipped,
  Failed,
}

/// Mutable-but-append-only record shared across all steps of a single run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseContext {
  pub branch: String,
  pub dry_run: bool,
  pub last_release: Option<LastRelease>,
  next_release: NextRelease,
  /// Read-only snapshot of the process environment, captured at run start
  pub env: BTreeMap<String, String>,
  /// Ordered step outcomes
  pub step_log: Vec<StepOutcome>,
}

impl ReleaseContext {
  /// Create a context for one run; `env` is captured once and never refreshed
  pub fn new(
    branch: impl Into<String>,
    dry_run: bool,
    last_release: Option<LastRelease>,
    env: BTreeMap<String, String>,
  ) -> Self {
    Self {
      branch: branch.into(),
      dry_run,
      last_release,
      next_release: NextRelease::default(),
      env,
      step_log: Vec::new(),
    }
  }

  /// Set the next version (write-once)
  pub fn set_version(&mut self, version: semver::Version) -> SemrelResult<()> {
    if self.next_release.version.is_some() {
      return Err(SemrelError::Config(ConfigError::WriteOnce {
        field: "next_release.version".to_string(),
      }));
    }
    self.next_release.version = Some(version);
    Ok(())
  }

  /// Set the release notes (write-once)
  pub fn set_notes(&mut self, notes: ReleaseNotes) -> SemrelResult<()> {
    if self.next_release.notes.is_some() {
      return Err(SemrelError::Config(ConfigError::WriteOnce {
        field: "next_release.notes".to_string(),
      }));
    }
    self.next_release.notes = Some(notes);
    Ok(())
  }

  /// Set the rendered tag name (write-once)
  pub fn set_tag(&mut self, tag: impl Into<String>) -> SemrelResult<()> {
    if self.next_release.tag.is_some() {
      return Err(SemrelError::Config(ConfigError::WriteOnce {
        field: "next_release.tag".to_string(),
      }));
    }
    self.next_release.tag = Some(tag.into());
    Ok(())
  }

  /// Set the distribution channel (write-once)
  pub fn set_channel(&mut self, channel: impl Into<String>) -> SemrelResult<()> {
    if self.next_release.channel.is_some() {
      return Err(SemrelError::Config(ConfigError::WriteOnce {
        field: "next_release.channel".to_string(),
      }));
    }
    self.next_release.channel = Some(channel.into());
    Ok(())
  }

  pub fn version(&self) -> Option<&semver::Version> {
    self.next_release.version.as_ref()
  }

  pub fn notes(&self) -> Option<&ReleaseNotes> {
    self.next_release.notes.as_ref()
  }

  pub fn tag(&self) -> Option<&str> {
    self.next_release.tag.as_deref()
  }

  pub fn channel(&self) -> Option<&str> {
    self.next_release.channel.as_deref()
  }

  /// Get the computed version, or error if analysis has not run yet
  pub fn require_version(&self) -> SemrelResult<&semver::Version> {
    self
      .next_release
      .version
      .as_ref()
      .ok_or_else(|| SemrelError::message("next_release.version is not set; analyze-commits has not run"))
  }

  /// Get the generated notes, or error if generation has not run yet
  pub fn require_notes(&self) -> SemrelResult<&ReleaseNotes> {
    self
      .next_release
      .notes
      .as_ref()
      .ok_or_else(|| SemrelError::message("next_release.notes is not set; generate-notes has not run"))
  }

  /// Append a step outcome to the run log
  pub fn record(&mut self, outcome: StepOutcome) {
    self.step_log.push(outcome);
  }

  pub fn last_version(&self) -> Option<&semver::Version> {
    self.last_release.as_ref().map(|r| &r.version)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::config::SortKey;
  use crate::notes::generate;

  fn context() -> ReleaseContext {
    ReleaseContext::new("main", false, None, BTreeMap::new())
  }

  #[test]
  fn test_version_is_write_once() {
    let mut ctx = context();
    ctx.set_version(semver::Version::new(1, 3, 0)).unwrap();
    let err = ctx.set_version(semver::Version::new(9, 9, 9)).unwrap_err();
    assert!(matches!(
      err,
      SemrelError::Config(ConfigError::WriteOnce { ref field }) if field == "next_release.version"
    ));
    // First write is preserved
    assert_eq!(ctx.version().unwrap().to_string(), "1.3.0");
  }

  #[test]
  fn test_notes_are_write_once() {
    let mut ctx = context();
    let notes = generate(&[], &semver::Version::new(1, 0, 0), "2026-08-30", &[SortKey::Subject]);
    ctx.set_notes(notes.clone()).unwrap();
    assert!(ctx.set_notes(notes).is_err());
  }

  #[test]
  fn test_tag_is_write_once() {
    let mut ctx = context();
    ctx.set_tag("v1.3.0").unwrap();
    assert!(ctx.set_tag("v2.0.0").is_err());
    assert_eq!(ctx.tag(), Some("v1.3.0"));
  }

  #[test]
  fn test_require_version_before_analysis() {
    let ctx = context();
    assert!(ctx.require_version().is_err());
    assert!(ctx.require_notes().is_err());
  }

  #[test]
  fn test_step_log_preserves_order() {
    let mut ctx = context();
    for (i, stage) in [PipelineStage::VerifyConditions, PipelineStage::Prepare].iter().enumerate() {
      ctx.record(StepOutcome {
        stage: *stage,
        step: format!("step-{}", i),
        status: StepStatus::Completed,
        detail: None,
      });
    }
    assert_eq!(ctx.step_log.len(), 2);
    assert_eq!(ctx.step_log[0].step, "step-0");
    assert_eq!(ctx.step_log[1].stage, PipelineStage::Prepare);
  }

  #[test]
  fn test_env_snapshot_is_plain_data() {
    let mut env = BTreeMap::new();
    env.insert("PYPI_API_TOKEN".to_string(), "secret".to_string());
    let ctx = ReleaseContext::new("main", true, None, env);
    assert_eq!(ctx.env.get("PYPI_API_TOKEN").map(String::as_str), Some("secret"));
    assert!(ctx.dry_run);
  }
}
