use crate::error::{BridgeError, BridgeResult};

// Matrix
//------------------------------------------------------------------------------

/// Square grid of module values as produced by an external generator.
///
/// Cell sign decides module color: positive is dark, zero and negative are
/// light. The magnitude carries generator-internal meaning and is ignored
/// here. Construction goes through [`Matrix::from_rows`], so a `Matrix` in
/// hand is always non-empty and square.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    cells: Vec<i32>,
    size: usize,
}

impl Matrix {
    /// Builds a matrix from parsed rows, rejecting empty or ragged input.
    pub fn from_rows(rows: Vec<Vec<i32>>) -> BridgeResult<Self> {
        let size = rows.len();
        if size == 0 {
            return Err(BridgeError::Validation("empty matrix".into()));
        }

        let mut cells = Vec::with_capacity(size * size);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(BridgeError::Validation(format!(
                    "row {r} has {} cells, expected {size}",
                    row.len()
                )));
            }
            cells.extend_from_slice(row);
        }

        Ok(Self { cells, size })
    }

    /// Module count along one side.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, r: usize, c: usize) -> i32 {
        debug_assert!(r < self.size && c < self.size, "module out of bounds");
        self.cells[r * self.size + c]
    }

    /// Positive modules are dark; zero and negative are light.
    pub fn is_dark(&self, r: usize, c: usize) -> bool {
        self.get(r, c) > 0
    }
}

#[cfg(test)]
mod matrix_tests {
    use super::Matrix;
    use crate::error::BridgeError;

    #[test]
    fn test_from_rows() {
        let m = Matrix::from_rows(vec![vec![1, -1, 1], vec![-1, 1, -1], vec![1, -1, 1]]).unwrap();
        assert_eq!(m.size(), 3);
        assert!(m.is_dark(0, 0));
        assert!(!m.is_dark(0, 1));
        assert!(m.is_dark(1, 1));
    }

    #[test]
    fn test_sign_decides_color() {
        let m = Matrix::from_rows(vec![vec![7, 0], vec![-3, 1]]).unwrap();
        assert!(m.is_dark(0, 0), "any positive value is dark");
        assert!(!m.is_dark(0, 1), "zero is light");
        assert!(!m.is_dark(1, 0), "negative is light");
        assert!(m.is_dark(1, 1));
    }

    #[test]
    fn test_empty_matrix_rejected() {
        let err = Matrix::from_rows(vec![]).unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Matrix::from_rows(vec![vec![1, -1], vec![1]]).unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
    }

    #[test]
    fn test_row_count_must_match_row_length() {
        // Two rows of three cells is rectangular but not square.
        let err = Matrix::from_rows(vec![vec![1, -1, 1], vec![-1, 1, -1]]).unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
    }
}
