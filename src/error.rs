use std::path::PathBuf;
use thiserror::Error;

pub type DispatchResult = Result<(), DispatchError>;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The command body returned an error or panicked. The caller has already
    /// been told; this is the copy that travels on to the host.
    #[error("command `{command}` failed: {source}")]
    CommandFailed {
        command: String,
        #[source]
        source: anyhow::Error,
    },

    /// The worker task never reported back (runtime shut down underneath it)
    #[error("worker for command `{command}` was lost: {reason}")]
    WorkerLost { command: String, reason: String },
}

impl DispatchError {
    pub fn command(&self) -> &str {
        match self {
            DispatchError::CommandFailed { command, .. } => command,
            DispatchError::WorkerLost { command, .. } => command,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("command name or alias already registered: {0}")]
    DuplicateName(String),

    #[error("command `{command}` cannot be used by {caller}")]
    CallerNotAllowed { command: String, caller: String },

    #[error("empty command line")]
    EmptyInput,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read translations from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse translations in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize translations: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write translations to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigErrorKind {
    #[error("failed to read file: {0}")]
    Read(std::io::Error),

    #[error("failed to parse file: {0}")]
    Parse(toml::de::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration in {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: ConfigErrorKind,
    },

    #[error("invalid environment variable {0}: {1}")]
    InvalidEnv(String, String),
}
