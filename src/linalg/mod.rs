/*!
A thin adapter over the matrix package.

The solvers only reach the external matrix engine through these functions so
that the engine can be swapped without touching the kernels. Everything here
is dense and dynamically sized: the number of states `K` is a runtime value.
*/

pub use crate::na::{DMatrix, DVector};

/// Identity matrix of size `k`.
pub fn eye(k: usize) -> DMatrix<f64> {
    DMatrix::identity(k, k)
}

/// Zero matrix of the provided shape.
pub fn zeros(rows: usize, cols: usize) -> DMatrix<f64> {
    DMatrix::zeros(rows, cols)
}

/// Matrix of ones of the provided shape.
pub fn ones(rows: usize, cols: usize) -> DMatrix<f64> {
    DMatrix::from_element(rows, cols, 1.0)
}

/// Inverse of a square matrix, or `None` if it is singular.
pub fn inv(m: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    m.clone().try_inverse()
}

/// Determinant of a square matrix.
pub fn det(m: &DMatrix<f64>) -> f64 {
    m.determinant()
}

/// Extracts the submatrix selected by the provided row and column index lists.
pub fn submatrix(m: &DMatrix<f64>, rows: &[usize], cols: &[usize]) -> DMatrix<f64> {
    let mut out = DMatrix::zeros(rows.len(), cols.len());
    for (i, &r) in rows.iter().enumerate() {
        for (j, &c) in cols.iter().enumerate() {
            out[(i, j)] = m[(r, c)];
        }
    }
    out
}

/// Builds a dense matrix from nested rows, checking that they are rectangular.
pub fn from_rows(rows: &[Vec<f64>]) -> Option<DMatrix<f64>> {
    let nrows = rows.len();
    if nrows == 0 {
        return Some(DMatrix::zeros(0, 0));
    }
    let ncols = rows[0].len();
    if rows.iter().any(|r| r.len() != ncols) {
        return None;
    }
    let mut out = DMatrix::zeros(nrows, ncols);
    for (i, row) in rows.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            out[(i, j)] = v;
        }
    }
    Some(out)
}

/// Flattens a matrix back into nested rows, for serialization.
pub fn to_rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    (0..m.nrows())
        .map(|i| (0..m.ncols()).map(|j| m[(i, j)]).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_of_identity() {
        let i3 = eye(3);
        let inv_i3 = inv(&i3).expect("identity must be invertible");
        assert_eq!(i3, inv_i3);
        assert!((det(&i3) - 1.0).abs() < std::f64::EPSILON);
    }

    #[test]
    fn submatrix_by_lists() {
        let m = from_rows(&[
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
        ])
        .unwrap();
        let sub = submatrix(&m, &[0, 2], &[1]);
        assert_eq!(sub.nrows(), 2);
        assert_eq!(sub[(0, 0)], 2.0);
        assert_eq!(sub[(1, 0)], 8.0);
    }
}
