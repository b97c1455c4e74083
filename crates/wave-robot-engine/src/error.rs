use thiserror::Error;

/// Failures raised while resolving or applying content references
///
/// Raised synchronously to the caller. Mutations committed for earlier matches
/// of the same batch are kept.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefsError {
    #[error("Position {start}..{end} is outside the blip (length {len})")]
    PositionOutOfBounds { start: usize, end: usize, len: usize },

    #[error("Start has to be less than end, got {start}..{end}")]
    InvalidRange { start: usize, end: usize },

    #[error("No element found at index {0}")]
    NoElementAtPosition(usize),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Failures raised while loading a blip snapshot
#[derive(Error, Debug)]
pub enum BlipError {
    #[error("Failed to parse blip snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Element at offset {offset} is outside the content (length {len})")]
    ElementOutOfBounds { offset: usize, len: usize },

    #[error("Annotation {name} over {start}..{end} is outside the content (length {len})")]
    AnnotationOutOfBounds {
        name: String,
        start: usize,
        end: usize,
        len: usize,
    },
}
