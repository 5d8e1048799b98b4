//! Pipeline configuration (semrel.toml) parsing and validation
//!
//! The configuration is the declarative pipeline: which branches may release,
//! how tags are named, how commits are parsed and sorted, and the ordered list
//! of steps. Declaration order of `[[steps]]` is execution order within every
//! stage; the executor never reorders steps.

use crate::core::error::{ConfigError, SemrelError, SemrelResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for semrel
/// Searched in order: semrel.toml, .semrel.toml, .config/semrel.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
  /// Branches eligible for release
  #[serde(default = "default_branches")]
  pub branches: Vec<String>,

  /// Tag naming template with a {version} placeholder (e.g. "v{version}")
  #[serde(default = "default_tag_format")]
  pub tag_format: String,

  #[serde(default)]
  pub analyzer: AnalyzerConfig,

  #[serde(default)]
  pub notes: NotesConfig,

  #[serde(default)]
  pub limits: LimitsConfig,

  /// Ordered list of pipeline steps
  #[serde(default)]
  pub steps: Vec<StepConfig>,
}

fn default_branches() -> Vec<String> {
  vec!["main".to_string()]
}

fn default_tag_format() -> String {
  "v{version}".to_string()
}

/// Commit-analyzer options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
  /// Commit message grammar preset (only "angular" is supported)
  #[serde(default = "default_preset")]
  pub preset: String,

  /// Footer keywords that declare a breaking change
  #[serde(default = "default_note_keywords")]
  pub note_keywords: Vec<String>,
}

fn default_preset() -> String {
  "angular".to_string()
}

fn default_note_keywords() -> Vec<String> {
  vec![
    "BREAKING CHANGE".to_string(),
    "BREAKING CHANGES".to_string(),
    "BREAKING".to_string(),
  ]
}

impl Default for AnalyzerConfig {
  fn default() -> Self {
    Self {
      preset: default_preset(),
      note_keywords: default_note_keywords(),
    }
  }
}

/// Release-notes-generator options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesConfig {
  /// Sort keys applied within each changelog section (stable sort)
  #[serde(default = "default_commits_sort")]
  pub commits_sort: Vec<SortKey>,
}

fn default_commits_sort() -> Vec<SortKey> {
  vec![SortKey::Subject, SortKey::Scope]
}

impl Default for NotesConfig {
  fn default() -> Self {
    Self {
      commits_sort: default_commits_sort(),
    }
  }
}

/// Sort key for changelog entries within a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
  Subject,
  Scope,
}

/// Execution limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
  /// Wall-clock guard per step subprocess; the process is killed on expiry
  #[serde(default = "default_step_timeout_secs")]
  pub step_timeout_secs: u64,
}

fn default_step_timeout_secs() -> u64 {
  900
}

impl Default for LimitsConfig {
  fn default() -> Self {
    Self {
      step_timeout_secs: default_step_timeout_secs(),
    }
  }
}

/// One configured pipeline step
///
/// Steps form a closed set of kinds rather than open-ended plugins: stage
/// membership and the execution contract are statically checkable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
  /// Unique step name (used in logs and error reports)
  pub name: String,

  #[serde(flatten)]
  pub kind: StepKind,
}

/// The closed set of step kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
  /// Opaque commands run through the subprocess boundary, one per stage.
  /// Commands may use {version}, {tag}, {last_version} and {env.NAME}
  /// placeholders; the subprocess receives the run's environment snapshot.
  Exec {
    #[serde(default)]
    verify_cmd: Option<String>,
    #[serde(default)]
    verify_release_cmd: Option<String>,
    #[serde(default)]
    prepare_cmd: Option<String>,
    #[serde(default)]
    publish_cmd: Option<String>,
    #[serde(default)]
    add_channel_cmd: Option<String>,
    #[serde(default)]
    success_cmd: Option<String>,
    #[serde(default)]
    fail_cmd: Option<String>,
  },

  /// Prepend the generated release notes to a changelog file (prepare stage)
  Changelog {
    #[serde(default = "default_changelog_file")]
    changelog_file: PathBuf,
  },

  /// Rewrite `package.version` in a TOML manifest, preserving formatting (prepare stage)
  VersionFile { manifest: PathBuf },

  /// Commit the generated release assets back to the repository (prepare
  /// stage) so the release tag points at a commit that contains them.
  /// The message supports the same placeholders as exec commands.
  Commit {
    #[serde(default = "default_commit_assets")]
    assets: Vec<PathBuf>,
    #[serde(default = "default_commit_message")]
    message: String,
  },

  /// Create the annotated VCS tag named per tag_format (publish stage)
  Tag,
}

fn default_changelog_file() -> PathBuf {
  PathBuf::from("CHANGELOG.md")
}

fn default_commit_assets() -> Vec<PathBuf> {
  vec![PathBuf::from("CHANGELOG.md"), PathBuf::from("Cargo.toml")]
}

fn default_commit_message() -> String {
  "chore(release): {version} [skip ci]".to_string()
}

impl PipelineConfig {
  /// Find config file in search order: semrel.toml, .semrel.toml, .config/semrel.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("semrel.toml"),
      path.join(".semrel.toml"),
      path.join(".config").join("semrel.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from semrel.toml (searches multiple locations)
  pub fn load(path: &Path) -> SemrelResult<Self> {
    let config_path = Self::find_config_path(path).ok_or_else(|| {
      SemrelError::Config(ConfigError::NotFound {
        workspace_root: path.to_path_buf(),
      })
    })?;

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: PipelineConfig = toml_edit::de::from_str(&content)
      .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    config
      .validate()
      .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;

    Ok(config)
  }

  /// Validate the full pipeline configuration before any stage runs
  pub fn validate(&self) -> SemrelResult<()> {
    if self.branches.is_empty() {
      return Err(SemrelError::Config(ConfigError::MissingField {
        field: "branches".to_string(),
      }));
    }

    let occurrences = self.tag_format.matches("{version}").count();
    if occurrences != 1 {
      return Err(SemrelError::Config(ConfigError::InvalidTagFormat {
        tag_format: self.tag_format.clone(),
        reason: format!("expected exactly one {{version}} placeholder, found {}", occurrences),
      }));
    }

    if self.analyzer.preset != "angular" {
      return Err(SemrelError::Config(ConfigError::MissingField {
        field: format!("unsupported analyzer preset '{}'", self.analyzer.preset),
      }));
    }

    if self.limits.step_timeout_secs == 0 {
      return Err(SemrelError::Config(ConfigError::MissingField {
        field: "limits.step_timeout_secs must be greater than zero".to_string(),
      }));
    }

    let mut seen = std::collections::BTreeSet::new();
    for step in &self.steps {
      if step.name.trim().is_empty() {
        return Err(SemrelError::Config(ConfigError::InvalidStep {
          name: step.name.clone(),
          reason: "step name must not be empty".to_string(),
        }));
      }
      if !seen.insert(step.name.clone()) {
        return Err(SemrelError::Config(ConfigError::InvalidStep {
          name: step.name.clone(),
          reason: "duplicate step name".to_string(),
        }));
      }
      step.validate()?;
    }

    Ok(())
  }

  /// Render the tag name for a version
  pub fn tag_for(&self, version: &semver::Version) -> String {
    self.tag_format.replace("{version}", &version.to_string())
  }

  /// Check whether a branch is eligible for release
  pub fn is_release_branch(&self, branch: &str) -> bool {
    self.branches.iter().any(|b| b == branch)
  }

  /// Check if config exists at the given path
  pub fn exists(path: &Path) -> bool {
    Self::find_config_path(path).is_some()
  }
}

impl StepConfig {
  /// Validate the step configuration
  pub fn validate(&self) -> SemrelResult<()> {
    match &self.kind {
      StepKind::Exec {
        verify_cmd,
        verify_release_cmd,
        prepare_cmd,
        publish_cmd,
        add_channel_cmd,
        success_cmd,
        fail_cmd,
      } => {
        let all = [
          verify_cmd,
          verify_release_cmd,
          prepare_cmd,
          publish_cmd,
          add_channel_cmd,
          success_cmd,
          fail_cmd,
        ];
        if all.iter().all(|c| c.is_none()) {
          return Err(SemrelError::Config(ConfigError::InvalidStep {
            name: self.name.clone(),
            reason: "exec step defines no commands".to_string(),
          }));
        }
        if all.iter().any(|c| c.as_deref().is_some_and(|s| s.trim().is_empty())) {
          return Err(SemrelError::Config(ConfigError::InvalidStep {
            name: self.name.clone(),
            reason: "exec step commands must not be empty strings".to_string(),
          }));
        }
      }
      StepKind::VersionFile { manifest } => {
        if manifest.as_os_str().is_empty() {
          return Err(SemrelError::Config(ConfigError::InvalidStep {
            name: self.name.clone(),
            reason: "version_file step requires a manifest path".to_string(),
          }));
        }
      }
      StepKind::Commit { assets, message } => {
        if assets.is_empty() {
          return Err(SemrelError::Config(ConfigError::InvalidStep {
            name: self.name.clone(),
            reason: "commit step requires at least one asset path".to_string(),
          }));
        }
        if message.trim().is_empty() {
          return Err(SemrelError::Config(ConfigError::InvalidStep {
            name: self.name.clone(),
            reason: "commit step message must not be empty".to_string(),
          }));
        }
      }
      StepKind::Changelog { .. } | StepKind::Tag => {}
    }
    Ok(())
  }
}
