//! [`ConfigBackend`] that shells out to `git config`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use gitpersona_errors::BackendError;
use tracing::{debug, trace};

use crate::backend::ConfigBackend;
use crate::scope::Scope;

/// `git config --get` exit status for a missing key.
const EXIT_KEY_ABSENT: i32 = 1;
/// `git config --unset-all` exit status for a missing key.
const EXIT_NOTHING_TO_UNSET: i32 = 5;
/// `git` exit status when `--local` is used outside a repository.
const EXIT_NOT_A_REPOSITORY: i32 = 128;

/// One `git config` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitConfigOp<'a> {
    /// `--get <key>`
    Get(&'a str),
    /// `--null --get-all <key>`
    GetAll(&'a str),
    /// `--replace-all <key> <value>`
    Set(&'a str, &'a str),
    /// `--add <key> <value>`
    Add(&'a str, &'a str),
    /// `--unset-all <key>`
    Unset(&'a str),
}

impl GitConfigOp<'_> {
    fn name(&self) -> &'static str {
        match self {
            GitConfigOp::Get(_) => "get",
            GitConfigOp::GetAll(_) => "get-all",
            GitConfigOp::Set(..) => "set",
            GitConfigOp::Add(..) => "add",
            GitConfigOp::Unset(_) => "unset",
        }
    }

    fn key(&self) -> &str {
        match self {
            GitConfigOp::Get(key)
            | GitConfigOp::GetAll(key)
            | GitConfigOp::Set(key, _)
            | GitConfigOp::Add(key, _)
            | GitConfigOp::Unset(key) => key,
        }
    }
}

/// Reject keys git would read as an option or that cannot name a variable.
///
/// # Errors
///
/// Returns [`BackendError::InvalidKey`] naming the problem.
pub fn check_key(key: &str) -> Result<(), BackendError> {
    let reason = if key.is_empty() {
        Some("empty key")
    } else if key.starts_with('-') {
        Some("key starts with '-'")
    } else if !key.contains('.') {
        Some("key has no section")
    } else if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        Some("key contains whitespace or control characters")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(BackendError::InvalidKey {
            key: key.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Reject values that would change the meaning of the config file.
///
/// # Errors
///
/// Returns [`BackendError::InvalidValue`] for line breaks and NUL.
pub fn check_value(key: &str, value: &str) -> Result<(), BackendError> {
    if value.contains(['\n', '\r']) {
        return Err(BackendError::InvalidValue {
            key: key.to_string(),
            reason: "value contains a line break",
        });
    }
    if value.contains('\0') {
        return Err(BackendError::InvalidValue {
            key: key.to_string(),
            reason: "value contains NUL",
        });
    }
    Ok(())
}

/// Arguments for `git` running `op` in `scope`, after validating them.
///
/// `git config` stops option parsing at the key, so a value that starts
/// with `-` is still taken literally; keys are checked instead.
///
/// # Errors
///
/// Returns the error of [`check_key`] or [`check_value`].
pub fn config_args(scope: Scope, op: GitConfigOp<'_>) -> Result<Vec<String>, BackendError> {
    check_key(op.key())?;
    let mut args = vec!["config".to_string(), scope.flag().to_string()];
    match op {
        GitConfigOp::Get(key) => {
            args.extend(["--get".to_string(), key.to_string()]);
        }
        GitConfigOp::GetAll(key) => {
            args.extend(["--null".to_string(), "--get-all".to_string(), key.to_string()]);
        }
        GitConfigOp::Set(key, value) => {
            check_value(key, value)?;
            args.extend([
                "--replace-all".to_string(),
                key.to_string(),
                value.to_string(),
            ]);
        }
        GitConfigOp::Add(key, value) => {
            check_value(key, value)?;
            args.extend(["--add".to_string(), key.to_string(), value.to_string()]);
        }
        GitConfigOp::Unset(key) => {
            args.extend(["--unset-all".to_string(), key.to_string()]);
        }
    }
    Ok(args)
}

/// Runs `git config` against the local, global or system file.
#[derive(Debug, Clone)]
pub struct GitCliBackend {
    program: PathBuf,
    repository: Option<PathBuf>,
    env: Vec<(OsString, OsString)>,
}

impl Default for GitCliBackend {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
            repository: None,
            env: Vec::new(),
        }
    }
}

impl GitCliBackend {
    /// Backend running `git` from `PATH` in the current directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific git executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Run inside `repository`, which selects the local scope's file.
    pub fn with_repository(mut self, repository: impl Into<PathBuf>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    /// Set an environment variable for every invocation, such as
    /// `GIT_CONFIG_GLOBAL` to point the global scope at another file.
    pub fn with_env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// The git executable.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Working directory for invocations, if set.
    pub fn repository(&self) -> Option<&Path> {
        self.repository.as_deref()
    }

    fn run(&self, scope: Scope, op: GitConfigOp<'_>) -> Result<Output, BackendError> {
        let args = config_args(scope, op)?;
        let mut command = Command::new(&self.program);
        command
            .args(args.iter().map(OsString::from))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .envs(self.env.iter().map(|(k, v)| (k, v)));
        if let Some(repository) = &self.repository {
            command.current_dir(repository);
        }
        trace!(%scope, op = op.name(), key = op.key(), "running git config");
        command.output().map_err(|source| BackendError::Unavailable {
            program: self.program.display().to_string(),
            source,
        })
    }

    fn failure(scope: Scope, op: GitConfigOp<'_>, output: &Output) -> BackendError {
        if scope == Scope::Local && output.status.code() == Some(EXIT_NOT_A_REPOSITORY) {
            return BackendError::ScopeUnavailable {
                scope: scope.as_str(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            };
        }
        BackendError::command_failed(
            op.name(),
            scope.as_str(),
            op.key(),
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        )
    }
}

impl ConfigBackend for GitCliBackend {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<String>, BackendError> {
        let op = GitConfigOp::Get(key);
        let output = self.run(scope, op)?;
        match output.status.code() {
            Some(0) => {
                let mut value = String::from_utf8(output.stdout).map_err(|e| {
                    BackendError::command_failed(
                        op.name(),
                        scope.as_str(),
                        key,
                        Some(0),
                        format!("value is not UTF-8: {e}"),
                    )
                })?;
                if value.ends_with('\n') {
                    value.pop();
                }
                Ok(Some(value))
            }
            Some(EXIT_KEY_ABSENT) => Ok(None),
            _ => Err(Self::failure(scope, op, &output)),
        }
    }

    fn get_all(&self, scope: Scope, key: &str) -> Result<Vec<String>, BackendError> {
        let op = GitConfigOp::GetAll(key);
        let output = self.run(scope, op)?;
        match output.status.code() {
            Some(0) => {
                let values = String::from_utf8(output.stdout).map_err(|e| {
                    BackendError::command_failed(
                        op.name(),
                        scope.as_str(),
                        key,
                        Some(0),
                        format!("value is not UTF-8: {e}"),
                    )
                })?;
                Ok(values
                    .split_terminator('\0')
                    .map(str::to_string)
                    .collect())
            }
            Some(EXIT_KEY_ABSENT) => Ok(Vec::new()),
            _ => Err(Self::failure(scope, op, &output)),
        }
    }

    fn set(&self, scope: Scope, key: &str, value: &str) -> Result<(), BackendError> {
        let op = GitConfigOp::Set(key, value);
        let output = self.run(scope, op)?;
        if output.status.success() {
            debug!(%scope, key, "git config set");
            Ok(())
        } else {
            Err(Self::failure(scope, op, &output))
        }
    }

    fn add(&self, scope: Scope, key: &str, value: &str) -> Result<(), BackendError> {
        let op = GitConfigOp::Add(key, value);
        let output = self.run(scope, op)?;
        if output.status.success() {
            debug!(%scope, key, "git config add");
            Ok(())
        } else {
            Err(Self::failure(scope, op, &output))
        }
    }

    fn unset(&self, scope: Scope, key: &str) -> Result<(), BackendError> {
        let op = GitConfigOp::Unset(key);
        let output = self.run(scope, op)?;
        match output.status.code() {
            Some(0) => {
                debug!(%scope, key, "git config unset");
                Ok(())
            }
            Some(EXIT_NOTHING_TO_UNSET) => Ok(()),
            _ => Err(Self::failure(scope, op, &output)),
        }
    }
}
