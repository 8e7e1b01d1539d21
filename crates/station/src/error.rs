/// Errors that can occur in the station plumbing.
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Message encode failed: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
