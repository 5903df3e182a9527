//! Error types for repoman with contextual messages and exit codes
//!
//! Every failure surfaced by the manifest model, the checkout engine or the
//! release coordinator is a [`RepoError`]. Each category maps to an exit code
//! and may carry a help message that tells the user what to do next.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for repoman
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, malformed manifest, invalid args)
  User = 1,
  /// System error (git, network, I/O)
  System = 2,
  /// Release precondition failure (dirty tree, missing intent, existing tag)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for repoman
#[derive(Debug)]
pub enum RepoError {
  /// Malformed manifest line
  Parse(ParseError),

  /// Checkout engine failures
  Workspace(WorkspaceError),

  /// Release protocol violations
  Release(ReleaseError),

  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// I/O errors
  Io(io::Error),

  /// A typed error with a line of context; keeps the inner exit code
  Context { source: Box<RepoError>, context: String },

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl RepoError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    RepoError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    RepoError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  ///
  /// Typed errors are wrapped so they keep their exit code and help text.
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      RepoError::Message { message, context, help } => RepoError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      RepoError::Io(e) => RepoError::Message {
        message: format!("{}: {}", ctx_str, e),
        context: None,
        help: None,
      },
      RepoError::Context { source, context } => RepoError::Context {
        source,
        context: format!("{}\n{}", ctx_str, context),
      },
      other => RepoError::Context {
        source: Box::new(other),
        context: ctx_str,
      },
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      RepoError::Parse(_) => ExitCode::User,
      RepoError::Workspace(_) => ExitCode::System,
      RepoError::Release(_) => ExitCode::Validation,
      RepoError::Config(_) => ExitCode::User,
      RepoError::Git(_) => ExitCode::System,
      RepoError::Io(_) => ExitCode::System,
      RepoError::Context { source, .. } => source.exit_code(),
      RepoError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      RepoError::Parse(e) => e.help_message(),
      RepoError::Workspace(e) => e.help_message(),
      RepoError::Release(e) => e.help_message(),
      RepoError::Config(e) => e.help_message(),
      RepoError::Git(e) => e.help_message(),
      RepoError::Context { source, .. } => source.help_message(),
      RepoError::Message { help, .. } => help.clone(),
      RepoError::Io(_) => None,
    }
  }
}

impl fmt::Display for RepoError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RepoError::Parse(e) => write!(f, "{}", e),
      RepoError::Workspace(e) => write!(f, "{}", e),
      RepoError::Release(e) => write!(f, "{}", e),
      RepoError::Config(e) => write!(f, "{}", e),
      RepoError::Git(e) => write!(f, "{}", e),
      RepoError::Io(e) => write!(f, "I/O error: {}", e),
      RepoError::Context { source, context } => write!(f, "{}\n{}", source, context),
      RepoError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for RepoError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      RepoError::Io(e) => Some(e),
      RepoError::Context { source, .. } => Some(source.as_ref()),
      _ => None,
    }
  }
}

impl From<io::Error> for RepoError {
  fn from(err: io::Error) -> Self {
    RepoError::Io(err)
  }
}

impl From<String> for RepoError {
  fn from(msg: String) -> Self {
    RepoError::message(msg)
  }
}

impl From<&str> for RepoError {
  fn from(msg: &str) -> Self {
    RepoError::message(msg)
  }
}

impl From<ParseError> for RepoError {
  fn from(err: ParseError) -> Self {
    RepoError::Parse(err)
  }
}

impl From<WorkspaceError> for RepoError {
  fn from(err: WorkspaceError) -> Self {
    RepoError::Workspace(err)
  }
}

impl From<ReleaseError> for RepoError {
  fn from(err: ReleaseError) -> Self {
    RepoError::Release(err)
  }
}

impl From<GitError> for RepoError {
  fn from(err: GitError) -> Self {
    RepoError::Git(err)
  }
}

impl From<toml_edit::de::Error> for RepoError {
  fn from(err: toml_edit::de::Error) -> Self {
    RepoError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for RepoError {
  fn from(err: serde_json::Error) -> Self {
    RepoError::message(format!("JSON error: {}", err))
  }
}

/// A manifest line that could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
  /// Manifest file, when parsing from disk
  pub path: Option<PathBuf>,
  /// 1-based line number
  pub line_number: usize,
  /// The offending line, without terminator
  pub line: String,
  pub reason: String,
}

impl ParseError {
  fn help_message(&self) -> Option<String> {
    Some("Manifest lines have the form `<name>[/<subpath>] <ref>  # optional comment`.".to_string())
  }
}

impl fmt::Display for ParseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.path {
      Some(path) => write!(
        f,
        "Malformed manifest line {} in {}: {}\n  {}",
        self.line_number,
        path.display(),
        self.reason,
        self.line
      ),
      None => write!(
        f,
        "Malformed manifest line {}: {}\n  {}",
        self.line_number, self.reason, self.line
      ),
    }
  }
}

/// Checkout engine failures
#[derive(Debug)]
pub enum WorkspaceError {
  /// Fetch still failing after the retry schedule was exhausted
  FetchFailed {
    package: String,
    remote_url: String,
    attempts: usize,
    diagnostic: String,
  },

  /// The adapter rejected the checkout
  CheckoutFailed {
    package: String,
    remote_url: String,
    reference: String,
    diagnostic: String,
  },

  /// The package directory belongs to a different working tree
  NotWorkTree {
    package: String,
    path: PathBuf,
    found: PathBuf,
  },

  /// Refusing to remove a directory that is not a package directory
  Clobber { package: String, path: PathBuf },
}

impl WorkspaceError {
  fn help_message(&self) -> Option<String> {
    match self {
      WorkspaceError::FetchFailed { .. } => Some(
        "Verify the package exists and that you can access it. You may also need to wait a few minutes.".to_string(),
      ),
      WorkspaceError::CheckoutFailed { diagnostic, .. } => {
        if diagnostic.contains("would be overwritten") || diagnostic.contains("local changes") {
          Some("Local modifications block the checkout. Commit them or re-run with --force.".to_string())
        } else {
          None
        }
      }
      WorkspaceError::NotWorkTree { path, .. } => Some(format!(
        "Remove {} or choose a workspace outside the enclosing repository.",
        path.display()
      )),
      WorkspaceError::Clobber { .. } => Some("Clobbering is not available for in-place checkouts.".to_string()),
    }
  }
}

impl fmt::Display for WorkspaceError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WorkspaceError::FetchFailed {
        package,
        remote_url,
        attempts,
        diagnostic,
      } => write!(
        f,
        "Unable to fetch {} after {} attempt(s)\nRepo: {}\n{}",
        package,
        attempts,
        remote_url,
        diagnostic.trim_end()
      ),
      WorkspaceError::CheckoutFailed {
        package,
        remote_url,
        reference,
        diagnostic,
      } => write!(
        f,
        "Unable to checkout {} at '{}'\nRepo: {}\n{}",
        package,
        reference,
        remote_url,
        diagnostic.trim_end()
      ),
      WorkspaceError::NotWorkTree { package, path, found } => write!(
        f,
        "{} is not a working tree for {} (enclosing working tree: {})",
        path.display(),
        package,
        found.display()
      ),
      WorkspaceError::Clobber { package, path } => {
        write!(f, "Refusing to clobber {} for package {}", path.display(), package)
      }
    }
  }
}

/// Release protocol violations. None of these are retried.
#[derive(Debug)]
pub enum ReleaseError {
  /// No tag matching the package was found
  NoTag { package: String },

  /// The nearest tag does not follow the MM-mm-pp scheme
  InvalidVersion { version: String },

  /// HEAD is exactly at a release tag and no bump was requested
  NothingToBump { package: String, version: String },

  /// Uncommitted changes at prepare time
  DirtyWorkingTree { package: String },

  /// Perform called without a persisted intent
  NotPrepared { package: String },

  /// The persisted intent names a different package
  IntentMismatch { expected: String, found: String },

  /// The intent's tag already exists
  TagExists { tag: String },

  /// Another prepare/perform holds the release lock
  Locked { path: PathBuf },
}

impl ReleaseError {
  fn help_message(&self) -> Option<String> {
    match self {
      ReleaseError::NoTag { package } => Some(format!(
        "Create an initial tag such as `{}-00-01-00` before releasing.",
        package
      )),
      ReleaseError::NothingToBump { .. } => {
        Some("Pass one of --major, --minor or --patch to choose the next version.".to_string())
      }
      ReleaseError::DirtyWorkingTree { .. } => {
        Some("Commit or stash your changes before preparing a release.".to_string())
      }
      ReleaseError::NotPrepared { package } => {
        Some(format!("Run `repoman release-prepare {}` first.", package))
      }
      ReleaseError::TagExists { .. } => {
        Some("The release was already performed. Prepare a new release to continue.".to_string())
      }
      ReleaseError::Locked { .. } => {
        Some("Wait for the other release operation on this package to finish.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ReleaseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseError::NoTag { package } => write!(f, "No release tag found for {}", package),
      ReleaseError::InvalidVersion { version } => {
        write!(f, "Invalid version '{}': expected MM-mm-pp", version)
      }
      ReleaseError::NothingToBump { package, version } => write!(
        f,
        "Invalid version specification: {} is already tagged at {} and no bump was requested",
        package, version
      ),
      ReleaseError::DirtyWorkingTree { package } => {
        write!(f, "Cannot prepare {}: dirty working tree", package)
      }
      ReleaseError::NotPrepared { package } => {
        write!(f, "Cannot perform {}: no release is currently prepared", package)
      }
      ReleaseError::IntentMismatch { expected, found } => write!(
        f,
        "Prepared release belongs to '{}', not '{}'",
        found, expected
      ),
      ReleaseError::TagExists { tag } => write!(f, "Cannot perform release: tag already exists: {}", tag),
      ReleaseError::Locked { path } => {
        write!(f, "Release lock is held by another process: {}", path.display())
      }
    }
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// A value failed validation
  Invalid { path: PathBuf, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::Invalid { path, .. } => Some(format!("Fix the value in {}", path.display())),
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::Invalid { path, reason } => {
        write!(f, "Invalid configuration in {}: {}", path.display(), reason)
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

  /// Push failed
  PushFailed {
    remote: String,
    reference: String,
    reason: String,
  },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::PushFailed { reason, .. } => {
        if reason.contains("permission denied") || reason.contains("403") {
          Some("Check your SSH key permissions and access to the remote.".to_string())
        } else if reason.contains("already exists") {
          Some("The tag already exists on the remote.".to_string())
        } else {
          None
        }
      }
      GitError::RepoNotFound { path } => Some(format!(
        "Initialize the repository first or check the path: {}",
        path.display()
      )),
      _ => None,
    }
  }

  /// Underlying diagnostic text (stderr of the failed command)
  pub fn diagnostic(&self) -> String {
    match self {
      GitError::CommandFailed { stderr, .. } => stderr.clone(),
      GitError::PushFailed { reason, .. } => reason.clone(),
      GitError::RepoNotFound { .. } => self.to_string(),
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
      GitError::PushFailed {
        remote,
        reference,
        reason,
      } => {
        write!(f, "Push of {} to {} failed: {}", reference, remote, reason)
      }
    }
  }
}

/// Result type alias for repoman
pub type RepoResult<T> = Result<T, RepoError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> RepoResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> RepoResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<RepoError>,
{
  fn context(self, ctx: impl Into<String>) -> RepoResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> RepoResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Diagnostic text for an error that came back from the VCS adapter
pub fn diagnostic_of(err: &RepoError) -> String {
  match err {
    RepoError::Git(e) => e.diagnostic(),
    other => other.to_string(),
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &RepoError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
