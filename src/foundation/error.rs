/// Convenience result type used across texstage.
pub type TexstageResult<T> = Result<T, TexstageError>;

/// Recoverable error taxonomy.
///
/// Programmer errors (aliasing a draw destination with a source, wrong-sized pixel buffers,
/// reading before the first frame drained deferred commands, using disposed handles) are not
/// represented here: they panic at the offending call.
#[derive(thiserror::Error, Debug)]
pub enum TexstageError {
    /// A pixel region does not lie inside the image bounds.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// Failure reported by the texture backend (upload, readback, draw, creation).
    #[error("backend error: {0}")]
    Backend(String),

    /// Invalid user-provided data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TexstageError {
    /// Build a [`TexstageError::OutOfRange`] value.
    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Self::OutOfRange(msg.into())
    }

    /// Build a [`TexstageError::Backend`] value.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Build a [`TexstageError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TexstageError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
