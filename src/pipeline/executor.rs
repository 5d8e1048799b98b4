//! Pipeline executor: the release state machine
//!
//! Drives the fixed stage sequence over the configured steps. Guarantees:
//!
//! - stages run strictly in order; steps within a stage run sequentially in
//!   declaration order, never reordered or parallelized;
//! - a verify-conditions failure aborts before any mutation and before
//!   analyze-commits runs;
//! - a bump of none is the normal no-op path: the run ends as aborted with
//!   "no release necessary" and no notification stage runs;
//! - a prepare failure aborts with no publish side effect to undo;
//! - once one publish step succeeded, a later publish/add-channel failure
//!   does not roll anything back; the run reports a partial release and the
//!   fail stage still executes;
//! - exactly one of success/fail runs whenever verify-conditions passed and
//!   a release was warranted;
//! - dry-run routes prepare/publish/add-channel through a log-only path
//!   while earlier stages run fully against the in-memory context.

use crate::analyzer;
use crate::commits::{CommitGrammar, CommitRecord, parse_commits};
use crate::core::config::PipelineConfig;
use crate::core::context::{ReleaseContext, StepOutcome, StepStatus};
use crate::core::error::SemrelResult;
use crate::notes;
use crate::pipeline::exec::CommandRunner;
use crate::pipeline::stage::{AbortReason, PipelineStage, RunOutcome, StageState};
use crate::pipeline::step::run_step;
use crate::vcs::SystemGit;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Per-stage record in the run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
  pub stage: PipelineStage,
  pub state: StageState,
}

/// Full report of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
  /// Fingerprint of (config, head commit, branch)
  pub run_id: String,
  pub branch: String,
  pub dry_run: bool,
  #[serde(flatten)]
  pub outcome: RunOutcome,
  pub last_version: Option<String>,
  pub version: Option<String>,
  pub tag: Option<String>,
  pub notes_markdown: Option<String>,
  pub stages: Vec<StageRecord>,
  pub steps: Vec<StepOutcome>,
}

/// The release pipeline executor
pub struct Executor<'a> {
  config: &'a PipelineConfig,
  root: PathBuf,
  runner: &'a dyn CommandRunner,
}

/// Internal stage bookkeeping
struct StageTracker {
  states: BTreeMap<PipelineStage, StageState>,
}

impl StageTracker {
  fn new() -> Self {
    let states = PipelineStage::ORDER
      .iter()
      .map(|s| (*s, StageState::Pending))
      .collect();
    Self { states }
  }

  fn set(&mut self, stage: PipelineStage, state: StageState) {
    self.states.insert(stage, state);
  }

  /// Mark all still-pending stages as skipped (terminal transition)
  fn skip_pending(&mut self) {
    for state in self.states.values_mut() {
      if *state == StageState::Pending || *state == StageState::Running {
        *state = StageState::Skipped;
      }
    }
  }

  fn records(&self) -> Vec<StageRecord> {
    PipelineStage::ORDER
      .iter()
      .map(|s| StageRecord {
        stage: *s,
        state: self.states[s],
      })
      .collect()
  }
}

impl<'a> Executor<'a> {
  pub fn new(config: &'a PipelineConfig, root: impl Into<PathBuf>, runner: &'a dyn CommandRunner) -> Self {
    Self {
      config,
      root: root.into(),
      runner,
    }
  }

  /// Execute the full pipeline against the repository at `root`
  pub fn execute(&self, dry_run: bool) -> SemrelResult<RunReport> {
    let git = SystemGit::open(&self.root)?;
    let branch = git.current_branch()?;
    let head = git.head_commit()?;
    let run_id = run_id(self.config, &head, &branch);

    // Credentials and other process-wide state are captured once at run
    // start; steps only ever see this snapshot.
    let env: BTreeMap<String, String> = std::env::vars().collect();

    if !self.config.is_release_branch(&branch) {
      let mut tracker = StageTracker::new();
      tracker.skip_pending();
      return Ok(self.report(
        run_id,
        &ReleaseContext::new(branch.clone(), dry_run, None, env),
        tracker,
        RunOutcome::Aborted {
          reason: AbortReason::BranchNotConfigured { branch },
        },
      ));
    }

    let last_release = git.last_release(&self.config.tag_format)?;
    let since = last_release.as_ref().map(|r| r.tag.clone());
    let raw_commits = git.commits_since(since.as_deref())?;

    let grammar = CommitGrammar::new(self.config.analyzer.note_keywords.clone());
    let commits = parse_commits(&raw_commits, &grammar);

    let mut ctx = ReleaseContext::new(branch, dry_run, last_release, env);
    self.run_pipeline(&mut ctx, &commits, run_id)
  }

  /// The state machine proper; separated from environment setup so the
  /// sequencing and failure policy are testable with an injected runner.
  fn run_pipeline(
    &self,
    ctx: &mut ReleaseContext,
    commits: &[CommitRecord],
    run_id: String,
  ) -> SemrelResult<RunReport> {
    let mut tracker = StageTracker::new();

    // verify-conditions: the single point to fail fast before any mutation.
    // A failure here aborts the whole run; success/fail do NOT execute.
    if let Err((step, message)) = self.run_stage(PipelineStage::VerifyConditions, ctx, &mut tracker, None) {
      tracker.skip_pending();
      return Ok(self.report(
        run_id,
        ctx,
        tracker,
        RunOutcome::Aborted {
          reason: AbortReason::Verification { step, message },
        },
      ));
    }

    // analyze-commits: decide the bump; none is the expected no-op path
    tracker.set(PipelineStage::AnalyzeCommits, StageState::Running);
    let next_version = analyzer::next_version(commits, ctx.last_version());
    let Some(version) = next_version else {
      tracker.set(PipelineStage::AnalyzeCommits, StageState::Completed);
      tracker.skip_pending();
      return Ok(self.report(
        run_id,
        ctx,
        tracker,
        RunOutcome::Aborted {
          reason: AbortReason::NoReleaseNecessary,
        },
      ));
    };
    let tag = self.config.tag_for(&version);
    if let Err(e) = ctx.set_version(version).and_then(|()| ctx.set_tag(tag)) {
      tracker.set(PipelineStage::AnalyzeCommits, StageState::Failed);
      tracker.skip_pending();
      return Ok(self.report(
        run_id,
        ctx,
        tracker,
        RunOutcome::Aborted {
          reason: AbortReason::Analysis { message: e.to_string() },
        },
      ));
    }
    tracker.set(PipelineStage::AnalyzeCommits, StageState::Completed);

    // verify-release: release is warranted from here on, so the fail stage
    // runs on any later failure
    if let Err((step, message)) = self.run_stage(PipelineStage::VerifyRelease, ctx, &mut tracker, None) {
      let reason = AbortReason::Verification { step, message };
      return Ok(self.finish_failed(run_id, ctx, tracker, RunOutcome::Aborted { reason }));
    }

    // generate-notes: pure over (commits, version)
    tracker.set(PipelineStage::GenerateNotes, StageState::Running);
    let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let version = ctx.require_version()?.clone();
    let notes = notes::generate(commits, &version, &date, &self.config.notes.commits_sort);
    if let Err(e) = ctx.set_notes(notes) {
      tracker.set(PipelineStage::GenerateNotes, StageState::Failed);
      let reason = AbortReason::Notes { message: e.to_string() };
      return Ok(self.finish_failed(run_id, ctx, tracker, RunOutcome::Aborted { reason }));
    }
    tracker.set(PipelineStage::GenerateNotes, StageState::Completed);

    // prepare: working-state mutations; nothing published yet, so a failure
    // is fully recoverable
    if let Err((step, message)) = self.run_stage(PipelineStage::Prepare, ctx, &mut tracker, None) {
      let reason = AbortReason::Prepare { step, message };
      return Ok(self.finish_failed(run_id, ctx, tracker, RunOutcome::Aborted { reason }));
    }

    // publish + add-channel: externally visible, generally irreversible.
    // After the first successful publish step there is no rollback; a later
    // failure reports a partially live release.
    let mut published_any = false;
    for stage in [PipelineStage::Publish, PipelineStage::AddChannel] {
      if let Err((step, message)) = self.run_stage(stage, ctx, &mut tracker, Some(&mut published_any)) {
        let outcome = if published_any {
          RunOutcome::ReleasedWithFailureNotification { step, message }
        } else {
          RunOutcome::Aborted {
            reason: AbortReason::Publish { step, message },
          }
        };
        return Ok(self.finish_failed(run_id, ctx, tracker, outcome));
      }
    }

    // success: the mutually exclusive notification stage for a clean run
    let _ = self.run_notification(PipelineStage::Success, ctx, &mut tracker, "released");
    tracker.skip_pending();
    Ok(self.report(run_id, ctx, tracker, RunOutcome::Released))
  }

  /// Run the fail notification stage, then build the terminal report
  fn finish_failed(
    &self,
    run_id: String,
    ctx: &mut ReleaseContext,
    mut tracker: StageTracker,
    outcome: RunOutcome,
  ) -> RunReport {
    let _ = self.run_notification(PipelineStage::Fail, ctx, &mut tracker, "failed");
    tracker.skip_pending();
    self.report(run_id, ctx, tracker, outcome)
  }

  /// Run all steps of one stage in declaration order; first failure wins
  fn run_stage(
    &self,
    stage: PipelineStage,
    ctx: &mut ReleaseContext,
    tracker: &mut StageTracker,
    mut published: Option<&mut bool>,
  ) -> Result<(), (String, String)> {
    tracker.set(stage, StageState::Running);
    let timeout = Duration::from_secs(self.config.limits.step_timeout_secs);

    for step in &self.config.steps {
      if !step.participates_in(stage) {
        continue;
      }

      // Dry-run: mutating stages go through a log-only path; the in-memory
      // context is still fully populated by the earlier stages
      if ctx.dry_run && stage.is_mutating() {
        ctx.record(StepOutcome {
          stage,
          step: step.name.clone(),
          status: StepStatus::Skipped,
          detail: Some("dry-run".to_string()),
        });
        continue;
      }

      match run_step(step, stage, ctx, &self.root, self.runner, timeout, None) {
        Ok(report) => {
          ctx.record(StepOutcome {
            stage,
            step: step.name.clone(),
            status: StepStatus::Completed,
            detail: report.output.filter(|o| !o.trim().is_empty()),
          });
          if let Some(published) = published.as_deref_mut() {
            *published = true;
          }
        }
        Err(e) => {
          ctx.record(StepOutcome {
            stage,
            step: step.name.clone(),
            status: StepStatus::Failed,
            detail: Some(e.to_string()),
          });
          tracker.set(stage, StageState::Failed);
          return Err((step.name.clone(), e.to_string()));
        }
      }
    }

    tracker.set(stage, StageState::Completed);
    Ok(())
  }

  /// Run a success/fail stage; step failures are recorded but never change
  /// the run outcome
  fn run_notification(
    &self,
    stage: PipelineStage,
    ctx: &mut ReleaseContext,
    tracker: &mut StageTracker,
    outcome_label: &str,
  ) -> Result<(), ()> {
    tracker.set(stage, StageState::Running);
    let timeout = Duration::from_secs(self.config.limits.step_timeout_secs);
    let mut any_failed = false;

    for step in &self.config.steps {
      if !step.participates_in(stage) {
        continue;
      }

      if ctx.dry_run {
        ctx.record(StepOutcome {
          stage,
          step: step.name.clone(),
          status: StepStatus::Skipped,
          detail: Some("dry-run".to_string()),
        });
        continue;
      }

      match run_step(step, stage, ctx, &self.root, self.runner, timeout, Some(outcome_label)) {
        Ok(_) => ctx.record(StepOutcome {
          stage,
          step: step.name.clone(),
          status: StepStatus::Completed,
          detail: None,
        }),
        Err(e) => {
          any_failed = true;
          ctx.record(StepOutcome {
            stage,
            step: step.name.clone(),
            status: StepStatus::Failed,
            detail: Some(e.to_string()),
          });
        }
      }
    }

    tracker.set(
      stage,
      if any_failed {
        StageState::Failed
      } else {
        StageState::Completed
      },
    );
    Ok(())
  }

  fn report(&self, run_id: String, ctx: &ReleaseContext, tracker: StageTracker, outcome: RunOutcome) -> RunReport {
    RunReport {
      run_id,
      branch: ctx.branch.clone(),
      dry_run: ctx.dry_run,
      outcome,
      last_version: ctx.last_version().map(|v| v.to_string()),
      version: ctx.version().map(|v| v.to_string()),
      tag: ctx.tag().map(str::to_string),
      notes_markdown: ctx.notes().map(|n| n.to_markdown()),
      stages: tracker.records(),
      steps: ctx.step_log.clone(),
    }
  }
}

/// Fingerprint of one run: SHA256 over config, head commit and branch
fn run_id(config: &PipelineConfig, head: &str, branch: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(serde_json::to_vec(config).unwrap_or_default());
  hasher.update(head.as_bytes());
  hasher.update(branch.as_bytes());
  let digest = format!("{:x}", hasher.finalize());
  digest[..12].to_string()
}
