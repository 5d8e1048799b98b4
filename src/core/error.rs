//! Error types for semrel with contextual messages and exit codes
//!
//! Every failure in the pipeline is classified: configuration problems abort
//! before any stage runs, verification and prepare failures abort with nothing
//! to undo, and publish failures after a successful publish step report a
//! partial-release state that requires manual resolution.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for semrel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (git, I/O, subprocess)
  System = 2,
  /// Pipeline step failure (verify, prepare, publish)
  Step = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for semrel
#[derive(Debug)]
pub enum SemrelError {
  /// Configuration errors (malformed config, bad tag template, write-once violation)
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Commit parsing or version computation failure
  Analysis { message: String },

  /// A verify-conditions or verify-release step reported an unmet precondition
  Verification { step: String, message: String },

  /// A prepare-stage step failed; no publish has happened, fully recoverable
  Prepare { step: String, message: String },

  /// A publish or add-channel step failed after a publish side effect occurred
  Publish { step: String, message: String },

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl SemrelError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    SemrelError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      SemrelError::Message { message, context, help } => SemrelError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      SemrelError::Config(_) => ExitCode::User,
      SemrelError::Git(_) => ExitCode::System,
      SemrelError::Analysis { .. } => ExitCode::System,
      SemrelError::Verification { .. } => ExitCode::Step,
      SemrelError::Prepare { .. } => ExitCode::Step,
      SemrelError::Publish { .. } => ExitCode::Step,
      SemrelError::Io(_) => ExitCode::System,
      SemrelError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      SemrelError::Config(e) => e.help_message(),
      SemrelError::Git(e) => e.help_message(),
      SemrelError::Verification { .. } => {
        Some("Nothing was mutated. Fix the unmet precondition (credentials, environment) and re-run.".to_string())
      }
      SemrelError::Prepare { .. } => {
        Some("No publish step ran. The failure is fully recoverable: fix the step and re-run.".to_string())
      }
      SemrelError::Publish { step, .. } => Some(format!(
        "At least one publish side effect is already live. Resolve '{}' manually (re-run the remaining steps or tag by hand).",
        step
      )),
      SemrelError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for SemrelError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SemrelError::Config(e) => write!(f, "{}", e),
      SemrelError::Git(e) => write!(f, "{}", e),
      SemrelError::Analysis { message } => write!(f, "Release analysis failed: {}", message),
      SemrelError::Verification { step, message } => {
        write!(f, "Verification step '{}' failed: {}", step, message)
      }
      SemrelError::Prepare { step, message } => {
        write!(f, "Prepare step '{}' failed: {}", step, message)
      }
      SemrelError::Publish { step, message } => {
        write!(f, "Publish step '{}' failed after a prior publish succeeded: {}", step, message)
      }
      SemrelError::Io(e) => write!(f, "I/O error: {}", e),
      SemrelError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for SemrelError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      SemrelError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for SemrelError {
  fn from(err: io::Error) -> Self {
    SemrelError::Io(err)
  }
}

impl From<toml_edit::TomlError> for SemrelError {
  fn from(err: toml_edit::TomlError) -> Self {
    SemrelError::message(format!("TOML parse error: {}", err))
  }
}

impl From<toml_edit::de::Error> for SemrelError {
  fn from(err: toml_edit::de::Error) -> Self {
    SemrelError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for SemrelError {
  fn from(err: serde_json::Error) -> Self {
    SemrelError::message(format!("JSON error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// semrel.toml not found
  NotFound { workspace_root: PathBuf },

  /// Missing required field
  MissingField { field: String },

  /// Tag format template is invalid
  InvalidTagFormat { tag_format: String, reason: String },

  /// A write-once field of the release context was set twice
  WriteOnce { field: String },

  /// A step references an unknown placeholder or environment variable
  BadPlaceholder { step: String, placeholder: String },

  /// Duplicate or invalid step declaration
  InvalidStep { name: String, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => {
        Some("Create a semrel.toml with `branches`, `tag_format` and `[[steps]]` entries.".to_string())
      }
      ConfigError::InvalidTagFormat { .. } => {
        Some("The tag format must contain the {version} placeholder exactly once, e.g. \"v{version}\".".to_string())
      }
      ConfigError::BadPlaceholder { .. } => Some(
        "Commands may reference {version}, {tag}, {last_version} and {env.NAME} for variables present at run start."
          .to_string(),
      ),
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { workspace_root } => {
        write!(
          f,
          "No semrel configuration found.\nSearched from: {}",
          workspace_root.display()
        )
      }
      ConfigError::MissingField { field } => {
        write!(f, "Missing required field in config: {}", field)
      }
      ConfigError::InvalidTagFormat { tag_format, reason } => {
        write!(f, "Invalid tag_format '{}': {}", tag_format, reason)
      }
      ConfigError::WriteOnce { field } => {
        write!(f, "Release context field '{}' is write-once and was already set", field)
      }
      ConfigError::BadPlaceholder { step, placeholder } => {
        write!(f, "Step '{}' references unknown placeholder '{}'", step, placeholder)
      }
      ConfigError::InvalidStep { name, reason } => {
        write!(f, "Invalid step '{}': {}", name, reason)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// Tag operation failed
  TagError { tag: String, reason: String },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::RepoNotFound { path } => Some(format!(
        "Initialize the repository first or check the path: {}",
        path.display()
      )),
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::TagError { tag, reason } => {
        write!(f, "Tag operation failed for '{}': {}", tag, reason)
      }
    }
  }
}

/// Result type alias for semrel
pub type SemrelResult<T> = Result<T, SemrelError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> SemrelResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> SemrelResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<SemrelError>,
{
  fn context(self, ctx: impl Into<String>) -> SemrelResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> SemrelResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &SemrelError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
