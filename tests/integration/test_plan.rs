//! Tests for the plan command (read-only analysis)

use crate::helpers::{TestRepo, run_semrel, stdout_of};
use anyhow::Result;

const MINIMAL_CONFIG: &str = r#"
branches = ["main"]
tag_format = "v{version}"
"#;

#[test]
fn test_plan_minor_bump_from_feature() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(MINIMAL_CONFIG)?;
  repo.commit("chore: add config")?;
  repo.tag("v1.2.3")?;
  repo.commit("feat: add login endpoint")?;
  repo.commit("fix: handle empty password")?;

  let output = run_semrel(&repo.path, &["plan", "--json"])?;
  let plan: serde_json::Value = serde_json::from_str(&stdout_of(&output))?;

  assert_eq!(plan["last_version"], "1.2.3");
  assert_eq!(plan["bump"], "minor");
  assert_eq!(plan["next_version"], "1.3.0");
  assert_eq!(plan["tag"], "v1.3.0");
  assert_eq!(plan["commit_count"], 2);
  Ok(())
}

#[test]
fn test_plan_breaking_footer_bumps_major() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(MINIMAL_CONFIG)?;
  repo.commit("chore: add config")?;
  repo.tag("v1.2.3")?;
  repo.commit("fix: rework session storage\n\nBREAKING CHANGE: sessions are invalidated on upgrade")?;

  let output = run_semrel(&repo.path, &["plan", "--json"])?;
  let plan: serde_json::Value = serde_json::from_str(&stdout_of(&output))?;

  assert_eq!(plan["bump"], "major");
  assert_eq!(plan["next_version"], "2.0.0");
  assert_eq!(plan["breaking_count"], 1);
  let notes = plan["notes_markdown"].as_str().unwrap();
  assert!(notes.contains("BREAKING CHANGES"));
  assert!(notes.contains("sessions are invalidated on upgrade"));
  Ok(())
}

#[test]
fn test_plan_docs_only_means_no_release() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(MINIMAL_CONFIG)?;
  repo.commit("chore: add config")?;
  repo.tag("v1.2.3")?;
  repo.commit("docs: update readme")?;
  repo.commit("chore: bump ci image")?;

  let output = run_semrel(&repo.path, &["plan", "--json"])?;
  let plan: serde_json::Value = serde_json::from_str(&stdout_of(&output))?;

  assert_eq!(plan["bump"], "none");
  assert!(plan["next_version"].is_null());
  assert!(plan["tag"].is_null());

  let text = run_semrel(&repo.path, &["plan"])?;
  assert!(stdout_of(&text).contains("No release necessary"));
  Ok(())
}

#[test]
fn test_plan_first_release_proposes_initial_version() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(MINIMAL_CONFIG)?;
  repo.commit("chore: add config")?;

  let output = run_semrel(&repo.path, &["plan", "--json"])?;
  let plan: serde_json::Value = serde_json::from_str(&stdout_of(&output))?;

  assert!(plan["last_version"].is_null());
  assert_eq!(plan["next_version"], "1.0.0");
  Ok(())
}

#[test]
fn test_plan_never_mutates_the_repository() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(MINIMAL_CONFIG)?;
  repo.commit("chore: add config")?;
  repo.commit("feat: something releasable")?;

  run_semrel(&repo.path, &["plan"])?;

  assert!(!repo.tag_exists("v1.0.0")?);
  assert!(!repo.file_exists("CHANGELOG.md"));
  Ok(())
}
