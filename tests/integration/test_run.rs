//! Tests for the run command (full pipeline execution)

use crate::helpers::{TestRepo, git, run_semrel, run_semrel_raw, stdout_of};
use anyhow::Result;

/// Exit code for step failures
const STEP_FAILURE: i32 = 3;

const RELEASE_CONFIG: &str = r#"
branches = ["main"]
tag_format = "v{version}"

[[steps]]
name = "changelog"
kind = "changelog"

[[steps]]
name = "tag"
kind = "tag"
"#;

#[test]
fn test_run_releases_minor_and_tags() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(RELEASE_CONFIG)?;
  repo.commit("chore: add config")?;
  repo.tag("v1.2.3")?;
  repo.commit("feat: add login endpoint")?;
  repo.commit("fix: handle empty password")?;

  let output = run_semrel(&repo.path, &["run"])?;

  assert!(stdout_of(&output).contains("Released 1.3.0"));
  assert!(repo.tag_exists("v1.3.0")?);
  let changelog = repo.read_file("CHANGELOG.md")?;
  assert!(changelog.contains("## [1.3.0]"));
  assert!(changelog.contains("add login endpoint"));
  assert!(changelog.contains("handle empty password"));
  Ok(())
}

#[test]
fn test_run_breaking_change_releases_major() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(RELEASE_CONFIG)?;
  repo.commit("chore: add config")?;
  repo.tag("v1.2.3")?;
  repo.commit("feat!: drop legacy api\n\nBREAKING CHANGE: the v1 endpoints are gone")?;

  run_semrel(&repo.path, &["run"])?;

  assert!(repo.tag_exists("v2.0.0")?);
  let changelog = repo.read_file("CHANGELOG.md")?;
  assert!(changelog.contains("## [2.0.0]"));
  assert!(changelog.contains("BREAKING CHANGES"));
  assert!(changelog.contains("the v1 endpoints are gone"));
  Ok(())
}

#[test]
fn test_commit_step_commits_assets_before_tagging() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(
    r#"
branches = ["main"]
tag_format = "v{version}"

[[steps]]
name = "changelog"
kind = "changelog"

[[steps]]
name = "commit"
kind = "commit"
assets = ["CHANGELOG.md"]

[[steps]]
name = "tag"
kind = "tag"
"#,
  )?;
  repo.commit("chore: add config")?;
  repo.tag("v1.2.3")?;
  repo.commit("feat: add login endpoint")?;

  run_semrel(&repo.path, &["run"])?;

  // The tag points at the release commit, which contains the changelog
  let shown = git(&repo.path, &["show", "v1.3.0:CHANGELOG.md"])?;
  assert!(String::from_utf8_lossy(&shown.stdout).contains("## [1.3.0]"));

  let subject = git(&repo.path, &["log", "-1", "--format=%s"])?;
  assert_eq!(
    String::from_utf8_lossy(&subject.stdout).trim(),
    "chore(release): 1.3.0 [skip ci]"
  );

  // Nothing left uncommitted
  let status = git(&repo.path, &["status", "--porcelain"])?;
  assert!(String::from_utf8_lossy(&status.stdout).trim().is_empty());
  Ok(())
}

#[test]
fn test_run_docs_only_exits_zero_without_release() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(RELEASE_CONFIG)?;
  repo.commit("chore: add config")?;
  repo.tag("v1.2.3")?;
  repo.commit("docs: update readme")?;

  let output = run_semrel(&repo.path, &["run"])?;

  assert!(stdout_of(&output).contains("No release necessary"));
  assert!(!repo.tag_exists("v1.2.4")?);
  assert!(!repo.tag_exists("v1.3.0")?);
  assert!(!repo.file_exists("CHANGELOG.md"));
  Ok(())
}

#[test]
fn test_run_first_release_uses_initial_version() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(RELEASE_CONFIG)?;
  repo.commit("chore: add config")?;

  run_semrel(&repo.path, &["run"])?;

  assert!(repo.tag_exists("v1.0.0")?);
  Ok(())
}

#[test]
fn test_failing_verify_aborts_with_zero_mutations() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(
    r#"
branches = ["main"]

[[steps]]
name = "credentials"
kind = "exec"
verify_cmd = "false"

[[steps]]
name = "changelog"
kind = "changelog"

[[steps]]
name = "tag"
kind = "tag"
"#,
  )?;
  repo.commit("chore: add config")?;
  repo.commit("feat: something releasable")?;

  let output = run_semrel_raw(&repo.path, &["run"], &[])?;

  assert_eq!(output.status.code(), Some(STEP_FAILURE));
  assert!(!repo.tag_exists("v1.0.0")?);
  assert!(!repo.file_exists("CHANGELOG.md"));
  Ok(())
}

#[test]
fn test_steps_run_in_declaration_order() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(
    r#"
branches = ["main"]

[[steps]]
name = "first"
kind = "exec"
prepare_cmd = "echo first >> order.txt"

[[steps]]
name = "second"
kind = "exec"
prepare_cmd = "echo second >> order.txt"
"#,
  )?;
  repo.commit("chore: add config")?;
  repo.commit("feat: something releasable")?;

  run_semrel(&repo.path, &["run"])?;

  assert_eq!(repo.read_file("order.txt")?, "first\nsecond\n");
  Ok(())
}

#[test]
fn test_dry_run_computes_release_without_side_effects() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(RELEASE_CONFIG)?;
  repo.commit("chore: add config")?;
  repo.tag("v1.2.3")?;
  repo.commit("feat: add export command")?;

  let output = run_semrel(&repo.path, &["run", "--dry-run"])?;

  assert!(stdout_of(&output).contains("Would release 1.3.0"));
  assert!(!repo.tag_exists("v1.3.0")?);
  assert!(!repo.file_exists("CHANGELOG.md"));
  Ok(())
}

#[test]
fn test_partial_publish_failure_keeps_earlier_publish() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(
    r#"
branches = ["main"]

[[steps]]
name = "registry-a"
kind = "exec"
publish_cmd = "touch published-a"

[[steps]]
name = "registry-b"
kind = "exec"
publish_cmd = "false"
"#,
  )?;
  repo.commit("chore: add config")?;
  repo.commit("feat: something releasable")?;

  let output = run_semrel_raw(&repo.path, &["run"], &[])?;

  assert_eq!(output.status.code(), Some(STEP_FAILURE));
  assert!(stdout_of(&output).contains("partially published"));
  // The succeeded publish is not rolled back
  assert!(repo.file_exists("published-a"));
  Ok(())
}

#[test]
fn test_first_publish_failure_runs_nothing_further() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(
    r#"
branches = ["main"]

[[steps]]
name = "registry-a"
kind = "exec"
publish_cmd = "false"

[[steps]]
name = "registry-b"
kind = "exec"
publish_cmd = "touch published-b"
"#,
  )?;
  repo.commit("chore: add config")?;
  repo.commit("feat: something releasable")?;

  let output = run_semrel_raw(&repo.path, &["run"], &[])?;

  assert_eq!(output.status.code(), Some(STEP_FAILURE));
  assert!(!repo.file_exists("published-b"));
  Ok(())
}

#[test]
fn test_fail_command_runs_after_prepare_failure() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(
    r#"
branches = ["main"]

[[steps]]
name = "build"
kind = "exec"
prepare_cmd = "false"
success_cmd = "touch succeeded"
fail_cmd = "touch failed"
"#,
  )?;
  repo.commit("chore: add config")?;
  repo.commit("feat: something releasable")?;

  let output = run_semrel_raw(&repo.path, &["run"], &[])?;

  assert_eq!(output.status.code(), Some(STEP_FAILURE));
  assert!(repo.file_exists("failed"));
  assert!(!repo.file_exists("succeeded"));
  Ok(())
}

#[test]
fn test_success_command_runs_after_release() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(
    r#"
branches = ["main"]

[[steps]]
name = "notify"
kind = "exec"
success_cmd = "touch succeeded"
fail_cmd = "touch failed"
"#,
  )?;
  repo.commit("chore: add config")?;
  repo.commit("feat: something releasable")?;

  run_semrel(&repo.path, &["run"])?;

  assert!(repo.file_exists("succeeded"));
  assert!(!repo.file_exists("failed"));
  Ok(())
}

#[test]
fn test_env_placeholder_resolves_from_snapshot() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(
    r#"
branches = ["main"]

[[steps]]
name = "upload"
kind = "exec"
publish_cmd = "printf %s {env.MY_TOKEN} > token.txt"
"#,
  )?;
  repo.commit("chore: add config")?;
  repo.commit("feat: something releasable")?;

  let output = run_semrel_raw(&repo.path, &["run"], &[("MY_TOKEN", "tok-123")])?;

  assert!(output.status.success());
  assert_eq!(repo.read_file("token.txt")?, "tok-123");
  Ok(())
}

#[test]
fn test_missing_env_placeholder_is_config_error() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(
    r#"
branches = ["main"]

[[steps]]
name = "upload"
kind = "exec"
publish_cmd = "printf %s {env.SEMREL_TEST_UNSET_TOKEN} > token.txt"
"#,
  )?;
  repo.commit("chore: add config")?;
  repo.commit("feat: something releasable")?;

  let output = run_semrel_raw(&repo.path, &["run"], &[])?;

  assert!(!output.status.success());
  assert!(!repo.file_exists("token.txt"));
  Ok(())
}

#[test]
fn test_version_placeholder_in_commands() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(
    r#"
branches = ["main"]
tag_format = "v{version}"

[[steps]]
name = "record"
kind = "exec"
publish_cmd = "printf %s {version}:{tag} > release.txt"
"#,
  )?;
  repo.commit("chore: add config")?;
  repo.tag("v1.2.3")?;
  repo.commit("fix: patch the thing")?;

  run_semrel(&repo.path, &["run"])?;

  assert_eq!(repo.read_file("release.txt")?, "1.2.4:v1.2.4");
  Ok(())
}

#[test]
fn test_version_file_step_updates_manifest() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_file(
    "Cargo.toml",
    "[package]\nname = \"demo\"\nversion = \"1.2.3\"\nedition = \"2024\"\n",
  )?;
  repo.write_config(
    r#"
branches = ["main"]

[[steps]]
name = "manifest"
kind = "version_file"
manifest = "Cargo.toml"
"#,
  )?;
  repo.commit("chore: add config")?;
  repo.tag("v1.2.3")?;
  repo.commit("feat: add thing")?;

  run_semrel(&repo.path, &["run"])?;

  let manifest = repo.read_file("Cargo.toml")?;
  assert!(manifest.contains("version = \"1.3.0\""));
  assert!(manifest.contains("edition = \"2024\""));
  Ok(())
}

#[test]
fn test_unconfigured_branch_exits_zero_without_release() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(RELEASE_CONFIG)?;
  repo.commit("chore: add config")?;
  repo.checkout_new("feature/x")?;
  repo.commit("feat: something releasable")?;

  let output = run_semrel(&repo.path, &["run"])?;

  assert!(stdout_of(&output).contains("not configured for release"));
  assert!(!repo.tag_exists("v1.0.0")?);
  Ok(())
}

#[test]
fn test_json_report_has_outcome_and_stages() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(RELEASE_CONFIG)?;
  repo.commit("chore: add config")?;
  repo.tag("v1.2.3")?;
  repo.commit("feat: add thing")?;

  let output = run_semrel(&repo.path, &["run", "--json"])?;
  let report: serde_json::Value = serde_json::from_str(&stdout_of(&output))?;

  assert_eq!(report["outcome"], "released");
  assert_eq!(report["version"], "1.3.0");
  assert_eq!(report["tag"], "v1.3.0");
  assert_eq!(report["branch"], "main");
  let stages = report["stages"].as_array().unwrap();
  assert_eq!(stages.len(), 9);
  assert_eq!(stages[0]["stage"], "verify-conditions");
  Ok(())
}
