//! Run command implementation
//!
//! Executes the full release pipeline. The report is always printed, even
//! for failed runs; failures are then surfaced as errors so the process exit
//! code reflects the outcome. A "no release necessary" run and an ineligible
//! branch both exit zero: they are expected no-op paths, not failures.

use crate::core::config::PipelineConfig;
use crate::core::context::StepStatus;
use crate::core::error::{SemrelError, SemrelResult};
use crate::pipeline::exec::ShellRunner;
use crate::pipeline::executor::{Executor, RunReport};
use crate::pipeline::stage::{AbortReason, RunOutcome};
use std::env;

/// Run the release pipeline
pub fn run_release(dry_run: bool, json: bool) -> SemrelResult<()> {
  let cwd = env::current_dir()?;
  let config = PipelineConfig::load(&cwd)?;

  let runner = ShellRunner;
  let executor = Executor::new(&config, &cwd, &runner);
  let report = executor.execute(dry_run)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    print_report(&report);
  }

  outcome_to_result(&report)
}

/// Map a terminal outcome to the process result
fn outcome_to_result(report: &RunReport) -> SemrelResult<()> {
  match &report.outcome {
    RunOutcome::Released => Ok(()),
    RunOutcome::Aborted { reason } => match reason {
      AbortReason::NoReleaseNecessary | AbortReason::BranchNotConfigured { .. } => Ok(()),
      AbortReason::Verification { step, message } => Err(SemrelError::Verification {
        step: step.clone(),
        message: message.clone(),
      }),
      AbortReason::Analysis { message } | AbortReason::Notes { message } => Err(SemrelError::Analysis {
        message: message.clone(),
      }),
      AbortReason::Prepare { step, message } => Err(SemrelError::Prepare {
        step: step.clone(),
        message: message.clone(),
      }),
      AbortReason::Publish { step, message } => Err(SemrelError::Publish {
        step: step.clone(),
        message: message.clone(),
      }),
    },
    RunOutcome::ReleasedWithFailureNotification { step, message } => Err(SemrelError::Publish {
      step: step.clone(),
      message: format!("release is partially published; step '{}' failed: {}", step, message),
    }),
  }
}

fn print_report(report: &RunReport) {
  if report.dry_run {
    println!("🔍 Dry-run on '{}' (run {})", report.branch, report.run_id);
  } else {
    println!("🚀 Release run on '{}' (run {})", report.branch, report.run_id);
  }
  println!();

  for record in &report.steps {
    let icon = match record.status {
      StepStatus::Completed => "✅",
      StepStatus::Skipped => "⏭️ ",
      StepStatus::Failed => "❌",
    };
    println!("  {} [{}] {}", icon, record.stage, record.step);
    if record.status == StepStatus::Failed {
      if let Some(detail) = &record.detail {
        for line in detail.lines() {
          println!("       {}", line);
        }
      }
    }
  }
  if !report.steps.is_empty() {
    println!();
  }

  match &report.outcome {
    RunOutcome::Released => {
      let version = report.version.as_deref().unwrap_or("?");
      if report.dry_run {
        println!("✅ Would release {} (no changes applied)", version);
      } else {
        println!("✅ Released {} (tag {})", version, report.tag.as_deref().unwrap_or("?"));
      }
      if let Some(notes) = &report.notes_markdown {
        println!();
        println!("{}", notes.trim_end());
      }
    }
    RunOutcome::Aborted { reason } => match reason {
      AbortReason::NoReleaseNecessary => {
        println!("⚠️  No release necessary");
        if let Some(last) = &report.last_version {
          println!("   Current version: {}", last);
        }
      }
      AbortReason::BranchNotConfigured { branch } => {
        println!("⚠️  Branch '{}' is not configured for release; nothing to do", branch);
      }
      reason => println!("❌ Run aborted: {}", reason),
    },
    RunOutcome::ReleasedWithFailureNotification { step, message } => {
      let version = report.version.as_deref().unwrap_or("?");
      println!("⚠️  Release {} is partially published", version);
      println!("   Step '{}' failed after an earlier publish succeeded: {}", step, message);
      println!("   Nothing was rolled back; resolve the failed step manually");
    }
  }
}
