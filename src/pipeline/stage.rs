//! Pipeline stages and run outcomes
//!
//! Stages execute strictly in the fixed total order below. No stage starts
//! until all steps of the previous stage have completed or the run aborted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named phase in the release pipeline's fixed execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStage {
  VerifyConditions,
  AnalyzeCommits,
  VerifyRelease,
  GenerateNotes,
  Prepare,
  Publish,
  AddChannel,
  Success,
  Fail,
}

impl PipelineStage {
  /// All stages in execution order
  pub const ORDER: [PipelineStage; 9] = [
    PipelineStage::VerifyConditions,
    PipelineStage::AnalyzeCommits,
    PipelineStage::VerifyRelease,
    PipelineStage::GenerateNotes,
    PipelineStage::Prepare,
    PipelineStage::Publish,
    PipelineStage::AddChannel,
    PipelineStage::Success,
    PipelineStage::Fail,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      PipelineStage::VerifyConditions => "verify-conditions",
      PipelineStage::AnalyzeCommits => "analyze-commits",
      PipelineStage::VerifyRelease => "verify-release",
      PipelineStage::GenerateNotes => "generate-notes",
      PipelineStage::Prepare => "prepare",
      PipelineStage::Publish => "publish",
      PipelineStage::AddChannel => "add-channel",
      PipelineStage::Success => "success",
      PipelineStage::Fail => "fail",
    }
  }

  /// Stages whose steps create externally visible side effects
  pub fn is_mutating(&self) -> bool {
    matches!(
      self,
      PipelineStage::Prepare | PipelineStage::Publish | PipelineStage::AddChannel
    )
  }
}

impl fmt::Display for PipelineStage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Sub-state of one stage within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageState {
  Pending,
  Running,
  Completed,
  Skipped,
  Failed,
}

/// Why a run ended without a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
  /// The normal, expected no-op path: no release-relevant commits
  NoReleaseNecessary,
  /// The current branch is not configured for release
  BranchNotConfigured { branch: String },
  /// A verify-conditions or verify-release step reported an unmet precondition
  Verification { step: String, message: String },
  /// Commit parsing or version computation failed
  Analysis { message: String },
  /// Notes generation failed
  Notes { message: String },
  /// A prepare step failed before any publish side effect
  Prepare { step: String, message: String },
  /// The first publish step failed before any publish side effect occurred
  Publish { step: String, message: String },
}

impl fmt::Display for AbortReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AbortReason::NoReleaseNecessary => write!(f, "no release necessary"),
      AbortReason::BranchNotConfigured { branch } => {
        write!(f, "branch '{}' is not configured for release", branch)
      }
      AbortReason::Verification { step, message } => {
        write!(f, "verification step '{}' failed: {}", step, message)
      }
      AbortReason::Analysis { message } => write!(f, "analysis failed: {}", message),
      AbortReason::Notes { message } => write!(f, "notes generation failed: {}", message),
      AbortReason::Prepare { step, message } => {
        write!(f, "prepare step '{}' failed: {}", step, message)
      }
      AbortReason::Publish { step, message } => {
        write!(f, "publish step '{}' failed: {}", step, message)
      }
    }
  }
}

/// Terminal state of a whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
  /// All stages through publish/add-channel completed
  Released,
  /// A stage before publish failed, or no release was needed
  Aborted { reason: AbortReason },
  /// A publish or later step failed after at least one publish side effect.
  /// The release is partially live; nothing is rolled back.
  ReleasedWithFailureNotification { step: String, message: String },
}

impl RunOutcome {
  pub fn is_failure(&self) -> bool {
    match self {
      RunOutcome::Released => false,
      RunOutcome::Aborted { reason } => !matches!(reason, AbortReason::NoReleaseNecessary),
      RunOutcome::ReleasedWithFailureNotification { .. } => true,
    }
  }
}
