/// Result alias that carries the custom [`ClockError`] type.
pub type Result<T> = std::result::Result<T, ClockError>;

/// Common error type for the core crate.
///
/// Only configuration problems surface here. Recoverable conditions such as an
/// unknown zone id or an unsupported blend mode are handled where they occur.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Free-form error message.
    #[error("{0}")]
    Message(String),
    /// The component was attached without a scheduling context to run on.
    #[error("analog clock must be attached to a scheduling context")]
    MissingSchedulingContext,
    /// The scheduling context has already been shut down by its host.
    #[error("scheduling context has been closed")]
    SchedulingContextClosed,
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Failure while decoding or encoding an image asset.
    #[error("image asset: {0}")]
    Image(#[from] image::ImageError),
    /// Failure while reading or writing JSON (config files, snapshots).
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClockError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for ClockError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for ClockError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
