//! Core error types for rser-util

use thiserror::Error;

/// Error type for index vector operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexVecError {
    /// Index out of bounds
    #[error("Index out of bounds: index {index}, length {length}")]
    OutOfBounds { index: usize, length: usize },
}

/// Result type alias for index vector operations
pub type IndexVecResult<T> = std::result::Result<T, IndexVecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_display() {
        let err = IndexVecError::OutOfBounds { index: 7, length: 3 };
        assert_eq!(err.to_string(), "Index out of bounds: index 7, length 3");
    }
}
