pub type EditorResult<T> = Result<T, EditorError>;

#[derive(thiserror::Error, Debug)]
pub enum EditorError {
    #[error("unknown adjustment: {0}")]
    UnknownAdjustment(String),

    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    #[error("unknown shape: {0}")]
    UnknownShape(String),

    #[error("no image loaded")]
    EmptyBuffer,

    #[error("dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("collage placement infeasible: placed {placed} of {requested} cells")]
    PlacementInfeasible { placed: usize, requested: usize },

    #[error("no collage cell at index {0}")]
    InvalidCell(usize),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("font error: {0}")]
    Font(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EditorError {
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_stable() {
        assert_eq!(
            EditorError::UnknownAdjustment("glow".into()).to_string(),
            "unknown adjustment: glow"
        );
        assert!(
            EditorError::PlacementInfeasible { placed: 3, requested: 5 }
                .to_string()
                .contains("placed 3 of 5")
        );
        assert!(
            EditorError::geometry("zero width")
                .to_string()
                .starts_with("invalid geometry:")
        );
    }

    #[test]
    fn io_preserves_source() {
        let err: EditorError = std::io::Error::other("boom").into();
        assert!(err.to_string().contains("boom"));
    }
}
