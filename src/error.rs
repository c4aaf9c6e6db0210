use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("the {0} algorithm is not implemented")]
    UnsupportedPolicy(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown environment id `{0}`")]
    UnknownEnvironment(String),

    #[error("{what}: expected {expected} values, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("cannot sample from an empty replay buffer")]
    EmptyBuffer,

    #[error("checkpoint `{name}` does not match this agent: {reason}")]
    IncompatibleCheckpoint { name: String, reason: String },

    #[error("variable `{0}` missing from the source network")]
    MissingVariable(String),

    #[error(transparent)]
    Torch(#[from] tch::TchError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("plotting failed: {0}")]
    Plot(String),
}
