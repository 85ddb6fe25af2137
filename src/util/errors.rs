//! Build error taxonomy.
//!
//! Engine functions return `anyhow::Result`; the failures callers may want to
//! match on are raised as [`BuildError`] so they survive the trip through
//! `anyhow` and can be recovered with `downcast_ref`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::builder::toolchain::ToolKind;

/// A fatal build failure.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to spawn `{program}`")]
    SpawnFailure {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("toolchain `{triple}` has no {tool}")]
    ToolNotFound { triple: String, tool: ToolKind },

    #[error("unsupported source type: {}", path.display())]
    UnsupportedSourceType { path: PathBuf },

    #[error("`{command}` exited with status {code}")]
    ChildNonZeroExit {
        command: String,
        code: i32,
        output: String,
    },

    #[error("`{command}` was terminated by signal {}", signal_name(*signal))]
    ChildSignaled {
        command: String,
        signal: i32,
        output: String,
    },

    #[error("failed to {action} {}", path.display())]
    FileIo {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "target `{target}` uses toolchain `{expected}` but library `{library}` uses `{found}`"
    )]
    ToolchainMismatch {
        target: String,
        library: String,
        expected: String,
        found: String,
    },

    #[error("no toolchain for `{triple}` under {}", root.display())]
    ToolchainNotFound { triple: String, root: PathBuf },

    #[error(
        "target `{target}`: sources {} and {} both compile to {}",
        first.display(),
        second.display(),
        object.display()
    )]
    ObjectCollision {
        target: String,
        first: PathBuf,
        second: PathBuf,
        object: PathBuf,
    },

    #[error("output of `{command}` was not fully drained after exit")]
    UndrainedOutput { command: String },
}

impl BuildError {
    /// Captured child output, for failures that carry it.
    pub fn output(&self) -> Option<&str> {
        match self {
            BuildError::ChildNonZeroExit { output, .. }
            | BuildError::ChildSignaled { output, .. } => Some(output),
            _ => None,
        }
    }

    pub(crate) fn file_io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        BuildError::FileIo {
            action,
            path: path.into(),
            source,
        }
    }
}

#[cfg(unix)]
fn signal_name(signal: i32) -> String {
    match nix::sys::signal::Signal::try_from(signal) {
        Ok(sig) => format!("{} ({})", signal, sig.as_str()),
        Err(_) => signal.to_string(),
    }
}

#[cfg(not(unix))]
fn signal_name(signal: i32) -> String {
    signal.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = BuildError::ToolNotFound {
            triple: "aarch64-linux-gnu".into(),
            tool: ToolKind::CxxCompiler,
        };
        assert_eq!(
            err.to_string(),
            "toolchain `aarch64-linux-gnu` has no C++ compiler"
        );

        let err = BuildError::UnsupportedSourceType {
            path: PathBuf::from("src/readme.txt"),
        };
        assert_eq!(err.to_string(), "unsupported source type: src/readme.txt");
    }

    #[test]
    fn test_output_accessor() {
        let err = BuildError::ChildNonZeroExit {
            command: "cc -c main.c".into(),
            code: 1,
            output: "main.c:1: error".into(),
        };
        assert_eq!(err.output(), Some("main.c:1: error"));
        assert_eq!(err.to_string(), "`cc -c main.c` exited with status 1");

        let err = BuildError::UndrainedOutput {
            command: "cc".into(),
        };
        assert!(err.output().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_name() {
        assert_eq!(signal_name(9), "9 (SIGKILL)");
    }
}
