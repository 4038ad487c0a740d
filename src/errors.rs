use std::io;

use thiserror::Error;

use crate::types::FieldName;

/// Error type for archive, conversion, and framing failures.
///
/// End of stream is never an error: readers signal it with `Ok(None)`.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed container header, reported when the archive is opened.
    #[error("malformed container: {0}")]
    Format(String),
    /// Underlying read or write failure.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Read attempted after an earlier error ended the stream.
    #[error("reader was terminated by an earlier error")]
    Terminated,
    /// Framed record failed a checksum or was cut short.
    #[error("corrupt record: {0}")]
    Corrupt(String),
    /// A field could not be converted or decoded.
    #[error("cannot convert field '{field}': {reason}")]
    Conversion {
        /// Field or feature that failed.
        field: FieldName,
        /// What went wrong.
        reason: String,
    },
    /// Image encode or decode failure.
    #[error(transparent)]
    Image(#[from] image::ImageError),
    /// Record payload (de)serialization failure.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    /// Selection pattern failed to compile.
    #[error("invalid selection pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl PipelineError {
    pub(crate) fn conversion(field: impl Into<FieldName>, reason: impl Into<String>) -> Self {
        Self::Conversion {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
