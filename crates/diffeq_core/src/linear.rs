//! Dense linear solves by Gaussian elimination.

use nalgebra::{DMatrix, DVector};

use crate::error::{Result, SolverError};

/// Solves `a * x = b` by Gaussian elimination with partial pivoting.
///
/// The pivot for each column is the first row holding the largest magnitude
/// at or below the diagonal. An exactly zero pivot is reported as
/// [`SolverError::SingularMatrix`]; nearly singular systems are solved anyway
/// and may come back with huge or non-finite entries.
pub fn solve(mut a: DMatrix<f64>, mut b: DVector<f64>) -> Result<DVector<f64>> {
    let dim = a.nrows();
    if a.ncols() != dim {
        return Err(SolverError::DimensionMismatch {
            expected: dim,
            got: a.ncols(),
        });
    }
    if b.len() != dim {
        return Err(SolverError::DimensionMismatch {
            expected: dim,
            got: b.len(),
        });
    }

    for col in 0..dim {
        let pivot = pivot_row(&a, col);
        if a[(pivot, col)] == 0.0 {
            return Err(SolverError::SingularMatrix { column: col });
        }
        if pivot != col {
            a.swap_rows(pivot, col);
            b.swap_rows(pivot, col);
        }

        for row in col + 1..dim {
            let factor = a[(row, col)] / a[(col, col)];
            if factor == 0.0 {
                continue;
            }
            for k in col..dim {
                a[(row, k)] -= factor * a[(col, k)];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = DVector::zeros(dim);
    for row in (0..dim).rev() {
        let mut sum = b[row];
        for k in row + 1..dim {
            sum -= a[(row, k)] * x[k];
        }
        x[row] = sum / a[(row, row)];
    }
    Ok(x)
}

fn pivot_row(a: &DMatrix<f64>, col: usize) -> usize {
    let mut best = col;
    for row in col + 1..a.nrows() {
        if a[(row, col)].abs() > a[(best, col)].abs() {
            best = row;
        }
    }
    best
}
