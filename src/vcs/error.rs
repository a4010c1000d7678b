//! Errors raised while querying a version-control tool.

use std::fmt;

/// Failure of a single backend query.
///
/// Every variant names the command that was run so a failing repository can
/// be diagnosed from the report alone.
#[derive(Debug)]
pub enum VcsError {
    /// The tool could not be started at all (usually: not installed).
    Spawn {
        command: String,
        source: std::io::Error,
    },
    /// The tool ran but exited with a non-zero status.
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    /// The tool's output did not have the expected shape.
    Parse {
        command: String,
        message: String,
        line: String,
    },
}

impl VcsError {
    pub fn parse(command: impl Into<String>, message: impl Into<String>, line: &str) -> Self {
        VcsError::Parse {
            command: command.into(),
            message: message.into(),
            line: line.to_string(),
        }
    }
}

impl fmt::Display for VcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcsError::Spawn { command, source } => {
                write!(f, "failed to run `{command}`: {source}")
            }
            VcsError::CommandFailed {
                command,
                code,
                stderr,
            } => {
                let stderr = stderr.trim();
                match code {
                    Some(code) => write!(f, "`{command}` exited with status {code}")?,
                    None => write!(f, "`{command}` was terminated by a signal")?,
                }
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
            VcsError::Parse {
                command,
                message,
                line,
            } => write!(f, "unexpected output from `{command}`: {message}: {line:?}"),
        }
    }
}

impl std::error::Error for VcsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VcsError::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}
