use thiserror::Error;

/// Errors raised by the solver and its collaborator interfaces.
#[derive(Debug, Error)]
pub enum WtmError {
    /// A loaded field does not match the grid shape fixed by the first load.
    /// Fatal: raised during setup, before the iteration loop starts.
    #[error("field '{key}' has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        key: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Invalid parameter bundle.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A source key the data collaborator cannot provide.
    #[error("no field available for key '{0}'")]
    MissingField(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
