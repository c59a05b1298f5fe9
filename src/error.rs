use thiserror::Error;

/// Failures surfaced by the maze core. None of these are fatal: callers
/// recover by substituting the built-in fallback maze or by retrying with
/// corrected coordinates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MazeError {
    #[error("position ({row}, {col}) is out of bounds for a {size}x{size} maze")]
    OutOfBounds { row: usize, col: usize, size: usize },
    #[error("invalid maze: {0}")]
    InvalidMaze(String),
}
