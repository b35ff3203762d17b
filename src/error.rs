use crate::shader::Stage;
use std::error::Error as StdError;
use std::fmt::{Debug, Display, Formatter};
use std::path::PathBuf;
use thiserror::Error;

pub struct VecErr<T: StdError> {
    pub inner: Vec<T>,
}

impl<T: StdError> VecErr<T> {
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T: StdError> Debug for VecErr<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.inner).finish()
    }
}

impl<T: StdError + Display> Display for VecErr<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for err in &self.inner {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            Display::fmt(err, f)?;
        }
        Ok(())
    }
}

impl<T: StdError> StdError for VecErr<T> {}

impl<T: StdError> From<Vec<T>> for VecErr<T> {
    fn from(inner: Vec<T>) -> Self {
        VecErr { inner }
    }
}

/// How an external tool ended when it did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCause {
    Code(i32),
    Signal(i32),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("unable to access {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid match index")]
    MatchIndex,

    #[error("pass {pass} has no {} code", stage.name())]
    MissingStageCode { pass: usize, stage: Stage },
    #[error("uniform array type {0} is declared more than once")]
    DuplicateUniformArray(String),

    #[error("{tool} exited with code {code}.")]
    ToolExit { tool: String, code: i32 },
    #[error("{tool} was stopped by signal {signal}.")]
    ToolSignal { tool: String, signal: i32 },
    #[error("unable to start {tool}: {source}")]
    ToolSpawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("missing required configuration keys: {}", .0.join(", "))]
    MissingConfig(Vec<String>),
    #[error("configuration key {key} is not {expected}")]
    InvalidConfig { key: String, expected: &'static str },

    #[error("shader validation failed: {0}")]
    Validation(VecErr<Error>),

    #[cfg(feature = "config-file")]
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Error {
        Error::File {
            path: path.into(),
            source,
        }
    }

    /// Exit cause carried by tool failures.
    pub fn exit_cause(&self) -> Option<ExitCause> {
        match self {
            Error::ToolExit { code, .. } => Some(ExitCause::Code(*code)),
            Error::ToolSignal { signal, .. } => Some(ExitCause::Signal(*signal)),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
