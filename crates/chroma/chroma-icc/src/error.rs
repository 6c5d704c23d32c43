use chroma_events::ProtocolViolation;
use std::io;

/// Failure to create or attach one of the named shared resources.
///
/// Always fatal for the process that hits it.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("'{name}' does not exist; the supervisor must be running first")]
    MissingOwner { name: String },

    #[error("'{name}' already exists; another supervisor is running or a previous one crashed")]
    AlreadyExists { name: String },

    #[error("shared memory segment '{name}' is unavailable")]
    Region {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("semaphore '{name}' is unavailable")]
    Semaphore {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("shared memory segment '{name}' has an unexpected layout: {reason}")]
    Layout { name: String, reason: &'static str },

    #[error("'{name}' is not a valid resource name")]
    InvalidName { name: String },
}

impl ResourceError {
    /// Maps an OS error from opening a named object onto the variants that
    /// carry meaning for the caller.
    pub(crate) fn from_io(name: &str, source: io::Error, semaphore: bool) -> Self {
        let name = name.to_owned();
        match source.kind() {
            io::ErrorKind::NotFound => Self::MissingOwner { name },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists { name },
            _ if semaphore => Self::Semaphore { name, source },
            _ => Self::Region { name, source },
        }
    }
}

/// Outcome of a blocking semaphore wait that did not acquire a unit.
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    /// A signal arrived while blocked. Callers treat this as a shutdown cue.
    #[error("wait interrupted by a signal")]
    Interrupted,

    #[error("semaphore operation failed")]
    Os(#[source] io::Error),
}

/// Unexpected failure while running the ring protocol.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{op} on semaphore '{name}' failed")]
    Semaphore {
        op: &'static str,
        name: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),
}
