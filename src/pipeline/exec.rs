//! Step execution boundary: opaque subprocess invocations
//!
//! Each exec step command is an all-or-nothing unit of work. The runner is a
//! trait so the executor's sequencing and failure containment can be tested
//! without spawning processes. The shell runner imposes a wall-clock guard:
//! a step that never returns is killed at the deadline instead of hanging the
//! run.

use crate::core::context::ReleaseContext;
use crate::core::error::{ConfigError, SemrelError, SemrelResult};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// One command invocation request
#[derive(Debug, Clone)]
pub struct CommandRequest {
  pub command: String,
  pub env: BTreeMap<String, String>,
  pub cwd: PathBuf,
  pub timeout: Duration,
}

/// Captured result of one command invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
  pub status: i32,
  pub stdout: String,
  pub stderr: String,
}

impl CommandOutput {
  pub fn success(&self) -> bool {
    self.status == 0
  }
}

/// The subprocess boundary, injectable for tests
pub trait CommandRunner {
  fn run(&self, request: &CommandRequest) -> SemrelResult<CommandOutput>;
}

/// Runs commands through `sh -c` with a kill-on-deadline guard
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
  fn run(&self, request: &CommandRequest) -> SemrelResult<CommandOutput> {
    let mut child = Command::new("sh")
      .arg("-c")
      .arg(&request.command)
      .current_dir(&request.cwd)
      .env_clear()
      .envs(&request.env)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(|e| SemrelError::message(format!("Failed to spawn step command: {}", e)))?;

    // Drain pipes on threads so a chatty child cannot deadlock the poll loop
    let stdout_handle = child.stdout.take().map(spawn_reader);
    let stderr_handle = child.stderr.take().map(spawn_reader);

    let deadline = Instant::now() + request.timeout;
    let status = loop {
      match child.try_wait()? {
        Some(status) => break status,
        None => {
          if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SemrelError::message(format!(
              "Step command exceeded the {}s wall-clock guard and was killed: {}",
              request.timeout.as_secs(),
              request.command
            )));
          }
          std::thread::sleep(Duration::from_millis(50));
        }
      }
    };

    let stdout = join_reader(stdout_handle);
    let stderr = join_reader(stderr_handle);

    Ok(CommandOutput {
      status: status.code().unwrap_or(-1),
      stdout,
      stderr,
    })
  }
}

fn spawn_reader<R: Read + Send + 'static>(mut source: R) -> std::thread::JoinHandle<String> {
  std::thread::spawn(move || {
    let mut buf = Vec::new();
    let _ = source.read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).to_string()
  })
}

fn join_reader(handle: Option<std::thread::JoinHandle<String>>) -> String {
  handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Substitute placeholders in a step command template
///
/// Supported: {version}, {tag}, {last_version}, {branch} and {env.NAME}
/// (resolved against the run's environment snapshot). Unknown placeholders
/// are configuration errors surfaced before the command runs.
pub fn render_command(template: &str, step: &str, ctx: &ReleaseContext) -> SemrelResult<String> {
  let mut result = String::with_capacity(template.len());
  let mut rest = template;

  while let Some(open) = rest.find('{') {
    result.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    let Some(close) = after.find('}') else {
      // Unbalanced brace: pass through verbatim (shell syntax like ${VAR})
      result.push('{');
      rest = after;
      continue;
    };
    let name = &after[..close];
    match resolve_placeholder(name, ctx) {
      Some(value) => result.push_str(&value),
      None if is_placeholder_name(name) => {
        return Err(SemrelError::Config(ConfigError::BadPlaceholder {
          step: step.to_string(),
          placeholder: name.to_string(),
        }));
      }
      None => {
        // Not one of ours (e.g. awk '{print}'): pass through verbatim
        result.push('{');
        result.push_str(name);
        result.push('}');
      }
    }
    rest = &after[close + 1..];
  }

  result.push_str(rest);
  Ok(result)
}

fn is_placeholder_name(name: &str) -> bool {
  matches!(name, "version" | "tag" | "last_version" | "branch" | "notes") || name.starts_with("env.")
}

fn resolve_placeholder(name: &str, ctx: &ReleaseContext) -> Option<String> {
  match name {
    "version" => ctx.version().map(|v| v.to_string()),
    "tag" => ctx.tag().map(str::to_string),
    "last_version" => ctx.last_version().map(|v| v.to_string()),
    "branch" => Some(ctx.branch.clone()),
    "notes" => ctx.notes().map(|n| n.to_markdown()),
    _ => {
      let var = name.strip_prefix("env.")?;
      ctx.env.get(var).cloned()
    }
  }
}
