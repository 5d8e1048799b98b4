//! Plan command implementation
//!
//! Analyzes the repository without mutating anything: parses commits since
//! the last release tag, computes the version bump and previews the release
//! notes. This is the read-only half of the pipeline; no step commands run.

use crate::analyzer;
use crate::commits::{CommitGrammar, parse_commits};
use crate::core::config::PipelineConfig;
use crate::core::error::SemrelResult;
use crate::notes;
use crate::vcs::SystemGit;
use serde::Serialize;
use std::env;

/// The computed plan for one repository state
#[derive(Debug, Serialize)]
pub struct ReleasePlan {
  pub branch: String,
  pub branch_eligible: bool,
  pub last_version: Option<String>,
  pub last_tag: Option<String>,
  pub commit_count: usize,
  pub breaking_count: usize,
  pub bump: String,
  pub next_version: Option<String>,
  pub tag: Option<String>,
  pub notes_markdown: Option<String>,
}

/// Run the plan command
pub fn run_plan(json: bool) -> SemrelResult<()> {
  let cwd = env::current_dir()?;
  let config = PipelineConfig::load(&cwd)?;
  let git = SystemGit::open(&cwd)?;

  let plan = analyze(&config, &git)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&plan)?);
  } else {
    print_plan(&plan);
  }

  Ok(())
}

/// Compute the plan: everything the pipeline would decide, nothing it would do
fn analyze(config: &PipelineConfig, git: &SystemGit) -> SemrelResult<ReleasePlan> {
  let branch = git.current_branch()?;
  let branch_eligible = config.is_release_branch(&branch);

  let last_release = git.last_release(&config.tag_format)?;
  let since = last_release.as_ref().map(|r| r.tag.clone());
  let raw = git.commits_since(since.as_deref())?;

  let grammar = CommitGrammar::new(config.analyzer.note_keywords.clone());
  let commits = parse_commits(&raw, &grammar);

  let bump = analyzer::analyze(&commits);
  let last_version = last_release.as_ref().map(|r| r.version.clone());
  let next_version = analyzer::next_version(&commits, last_version.as_ref());

  let (tag, notes_markdown) = match &next_version {
    Some(version) => {
      let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
      let notes = notes::generate(&commits, version, &date, &config.notes.commits_sort);
      (Some(config.tag_for(version)), Some(notes.to_markdown()))
    }
    None => (None, None),
  };

  Ok(ReleasePlan {
    branch,
    branch_eligible,
    last_version: last_version.map(|v| v.to_string()),
    last_tag: last_release.map(|r| r.tag),
    commit_count: commits.len(),
    breaking_count: commits.iter().filter(|c| c.is_breaking).count(),
    bump: bump.as_str().to_string(),
    next_version: next_version.map(|v| v.to_string()),
    tag,
    notes_markdown,
  })
}

fn print_plan(plan: &ReleasePlan) {
  println!("📦 Release Plan");
  println!();
  if plan.branch_eligible {
    println!("  Branch:   {}", plan.branch);
  } else {
    println!("  Branch:   {} (not configured for release)", plan.branch);
  }
  match (&plan.last_version, &plan.last_tag) {
    (Some(version), Some(tag)) => println!("  Current:  {} ({})", version, tag),
    _ => println!("  Current:  none (first release)"),
  }
  println!("  Commits:  {}", plan.commit_count);
  if plan.breaking_count > 0 {
    println!("  Breaking: {}", plan.breaking_count);
  }

  match &plan.next_version {
    Some(next) => {
      println!("  Bump:     {}", plan.bump);
      println!("  Proposed: {} (tag {})", next, plan.tag.as_deref().unwrap_or("?"));
      if let Some(notes) = &plan.notes_markdown {
        println!();
        println!("{}", notes.trim_end());
      }
    }
    None => {
      println!();
      println!("⚠️  No release necessary");
    }
  }

  if !plan.branch_eligible {
    println!();
    println!("⚠️  A run on this branch would abort without releasing");
  }
}
