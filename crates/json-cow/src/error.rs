//! Error types for recording and replay.

use thiserror::Error;

/// Errors raised while recording a mutation session.
///
/// All variants are usage errors and are fatal to the current mutation
/// procedure; none of them are produced by well-formed caller code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Method-call dispatch on a handle whose target is not an array.
    #[error("INVALID_CALL_TARGET: {0}")]
    InvalidCallTarget(String),

    /// Method name outside the pure/mutating/iterating classification.
    #[error("UNSUPPORTED_METHOD: {0}")]
    UnsupportedMethod(String),

    /// An iterating method was invoked without its visitor form.
    #[error("VISITOR_REQUIRED: {0}")]
    VisitorRequired(String),

    /// `replace` on the root handle, which has no parent slot.
    #[error("REPLACE_ROOT")]
    ReplaceRoot,

    /// A scalar was passed where a composite (array or object) is required.
    #[error("NOT_A_COMPOSITE")]
    NotComposite,
}

/// Errors raised while replaying a recorded patch.
///
/// These are caught inside the replay engine: the failing patch is logged
/// and dropped, and replay continues with the next patch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("INDEX_OUT_OF_BOUNDS: {index} (len {len})")]
    IndexOutOfBounds { index: i64, len: usize },

    /// A non-index key was used to address into an array.
    #[error("INVALID_INDEX: {0}")]
    InvalidIndex(String),

    /// An array operation landed on a non-array node.
    #[error("NOT_AN_ARRAY")]
    NotAnArray,
}
