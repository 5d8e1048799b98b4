//! Step dispatch: what each configured step does in each stage
//!
//! A step participates in a stage when its kind defines work for it: exec
//! steps participate wherever they declare a command, the changelog and
//! version-file steps run at prepare, and the tag step runs at publish.
//! The executor owns ordering and failure policy; this module only performs
//! the work of a single (step, stage) pair.

use crate::core::config::{StepConfig, StepKind};
use crate::core::context::ReleaseContext;
use crate::core::error::{SemrelError, SemrelResult, ResultExt};
use crate::pipeline::exec::{CommandRequest, CommandRunner, render_command};
use crate::pipeline::stage::PipelineStage;
use crate::vcs::SystemGit;
use std::path::Path;
use std::time::Duration;

/// Result of one (step, stage) invocation
#[derive(Debug, Clone)]
pub struct StepReport {
  /// Captured stdout of an exec command, if any
  pub output: Option<String>,
}

impl StepConfig {
  /// Check whether this step has work to do in the given stage
  pub fn participates_in(&self, stage: PipelineStage) -> bool {
    match &self.kind {
      StepKind::Exec {
        verify_cmd,
        verify_release_cmd,
        prepare_cmd,
        publish_cmd,
        add_channel_cmd,
        success_cmd,
        fail_cmd,
      } => match stage {
        PipelineStage::VerifyConditions => verify_cmd.is_some(),
        PipelineStage::VerifyRelease => verify_release_cmd.is_some(),
        PipelineStage::Prepare => prepare_cmd.is_some(),
        PipelineStage::Publish => publish_cmd.is_some(),
        PipelineStage::AddChannel => add_channel_cmd.is_some(),
        PipelineStage::Success => success_cmd.is_some(),
        PipelineStage::Fail => fail_cmd.is_some(),
        _ => false,
      },
      StepKind::Changelog { .. } | StepKind::VersionFile { .. } | StepKind::Commit { .. } => {
        stage == PipelineStage::Prepare
      }
      StepKind::Tag => stage == PipelineStage::Publish,
    }
  }

  /// The exec command this step declares for a stage, if any
  pub fn command_for(&self, stage: PipelineStage) -> Option<&str> {
    let StepKind::Exec {
      verify_cmd,
      verify_release_cmd,
      prepare_cmd,
      publish_cmd,
      add_channel_cmd,
      success_cmd,
      fail_cmd,
    } = &self.kind
    else {
      return None;
    };
    match stage {
      PipelineStage::VerifyConditions => verify_cmd.as_deref(),
      PipelineStage::VerifyRelease => verify_release_cmd.as_deref(),
      PipelineStage::Prepare => prepare_cmd.as_deref(),
      PipelineStage::Publish => publish_cmd.as_deref(),
      PipelineStage::AddChannel => add_channel_cmd.as_deref(),
      PipelineStage::Success => success_cmd.as_deref(),
      PipelineStage::Fail => fail_cmd.as_deref(),
      _ => None,
    }
  }
}

/// Execute one step for one stage
///
/// The context is read-only here: steps observe the release but only the
/// executor mutates the context between stages.
pub fn run_step(
  step: &StepConfig,
  stage: PipelineStage,
  ctx: &ReleaseContext,
  root: &Path,
  runner: &dyn CommandRunner,
  timeout: Duration,
  notification: Option<&str>,
) -> SemrelResult<StepReport> {
  match &step.kind {
    StepKind::Exec { .. } => {
      let template = step
        .command_for(stage)
        .ok_or_else(|| SemrelError::message(format!("Step '{}' has no command for stage {}", step.name, stage)))?;
      let command = render_command(template, &step.name, ctx)?;

      let mut env = ctx.env.clone();
      env.insert("SEMREL_BRANCH".to_string(), ctx.branch.clone());
      env.insert("SEMREL_DRY_RUN".to_string(), ctx.dry_run.to_string());
      if let Some(version) = ctx.version() {
        env.insert("SEMREL_VERSION".to_string(), version.to_string());
      }
      if let Some(tag) = ctx.tag() {
        env.insert("SEMREL_TAG".to_string(), tag.to_string());
      }
      if let Some(last) = ctx.last_version() {
        env.insert("SEMREL_LAST_VERSION".to_string(), last.to_string());
      }
      // Success/fail notification payload for external systems
      if let Some(outcome) = notification {
        env.insert("SEMREL_OUTCOME".to_string(), outcome.to_string());
        if let Some(notes) = ctx.notes() {
          env.insert("SEMREL_NOTES".to_string(), notes.to_markdown());
        }
      }

      let output = runner.run(&CommandRequest {
        command: command.clone(),
        env,
        cwd: root.to_path_buf(),
        timeout,
      })?;

      if !output.success() {
        return Err(SemrelError::message(format!(
          "command exited with status {}: {}\n{}",
          output.status,
          command,
          output.stderr.trim()
        )));
      }

      Ok(StepReport {
        output: Some(output.stdout),
      })
    }

    StepKind::Changelog { changelog_file } => {
      let notes = ctx.require_notes()?;
      write_changelog(&root.join(changelog_file), &notes.to_markdown())?;
      Ok(StepReport { output: None })
    }

    StepKind::VersionFile { manifest } => {
      let version = ctx.require_version()?;
      update_manifest_version(&root.join(manifest), &version.to_string())?;
      Ok(StepReport { output: None })
    }

    StepKind::Commit { assets, message } => {
      let message = render_command(message, &step.name, ctx)?;
      let git = SystemGit::open(root)?;
      git.commit_files(assets, &message)?;
      Ok(StepReport { output: None })
    }

    StepKind::Tag => {
      let tag = ctx
        .tag()
        .ok_or_else(|| SemrelError::message("next_release.tag is not set; analyze-commits has not run"))?;
      let version = ctx.require_version()?;
      let git = SystemGit::open(root)?;
      git.create_tag(tag, &format!("Release {}", version))?;
      Ok(StepReport { output: None })
    }
  }
}

/// Prepend a release section to the changelog file, creating it with a header
/// when absent
///
/// The new section goes directly above the most recent release heading, so
/// the title and its description paragraph stay at the top of the file.
fn write_changelog(path: &Path, entry: &str) -> SemrelResult<()> {
  let existing = if path.exists() {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read changelog {}", path.display()))?
  } else {
    "# Changelog\n\nAll notable changes to this project will be documented in this file.\n\n".to_string()
  };

  let new_content = if existing.starts_with("## ") {
    format!("{}{}", entry, existing)
  } else if let Some(pos) = existing.find("\n## ") {
    format!("{}{}{}", &existing[..pos + 1], entry, &existing[pos + 1..])
  } else {
    // No release section yet: append below the header block
    let mut out = existing;
    if !out.ends_with("\n\n") {
      if !out.ends_with('\n') {
        out.push('\n');
      }
      out.push('\n');
    }
    out.push_str(entry);
    out
  };

  std::fs::write(path, new_content).with_context(|| format!("Failed to write changelog {}", path.display()))?;
  Ok(())
}

/// Rewrite `package.version` in a TOML manifest, preserving formatting
fn update_manifest_version(path: &Path, version: &str) -> SemrelResult<()> {
  let content =
    std::fs::read_to_string(path).with_context(|| format!("Failed to read manifest {}", path.display()))?;

  let mut doc: toml_edit::DocumentMut = content
    .parse()
    .with_context(|| format!("Failed to parse manifest {}", path.display()))?;

  if let Some(package) = doc.get_mut("package").and_then(|p| p.as_table_mut()) {
    package["version"] = toml_edit::value(version);
  } else {
    return Err(SemrelError::message(format!(
      "No [package] section in {}",
      path.display()
    )));
  }

  std::fs::write(path, doc.to_string()).with_context(|| format!("Failed to write manifest {}", path.display()))?;
  Ok(())
}
