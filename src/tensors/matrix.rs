use std::{
    fmt::{self, Display},
    ops::{Index, IndexMut, Mul},
    slice::{Chunks, ChunksMut},
};

use tracing::{debug, instrument, trace};

use crate::{
    array::{AllocationError, DynamicArray},
    domains::{float::Tolerance, Scalar},
    printer::MatrixPrinter,
};

/// Errors that can occur when building matrices or performing matrix operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatrixError {
    Allocation(AllocationError),
    ShapeOverflow { nrows: usize, ncols: usize },
    UnexpectedEndOfInput { expected: usize, found: usize },
    NotSquare { nrows: usize, ncols: usize },
    EmptyMatrix,
    DimensionMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },
    NotRectangular,
    EmptyChain,
}

impl std::fmt::Display for MatrixError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatrixError::Allocation(e) => write!(f, "{}", e),
            MatrixError::ShapeOverflow { nrows, ncols } => write!(
                f,
                "The number of entries of a ({},{}) matrix overflows",
                nrows, ncols
            ),
            MatrixError::UnexpectedEndOfInput { expected, found } => write!(
                f,
                "Unexpected end of input: expected {} entries, found {}",
                expected, found
            ),
            MatrixError::NotSquare { nrows, ncols } => {
                write!(f, "The matrix is not square: ({},{})", nrows, ncols)
            }
            MatrixError::EmptyMatrix => write!(f, "The matrix has no entries"),
            MatrixError::DimensionMismatch { left, right } => write!(
                f,
                "Dimension mismatch: ({},{}) vs ({},{})",
                left.0, left.1, right.0, right.1
            ),
            MatrixError::NotRectangular => write!(f, "The matrix is not rectangular"),
            MatrixError::EmptyChain => write!(f, "The matrix chain is empty"),
        }
    }
}

impl std::error::Error for MatrixError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MatrixError::Allocation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AllocationError> for MatrixError {
    fn from(e: AllocationError) -> Self {
        MatrixError::Allocation(e)
    }
}

/// A dense matrix stored in row-major order: entry `(i, j)` lives at
/// position `i * ncols + j` of the backing array.
///
/// Rows are handed out as slices that borrow the matrix, so they cannot
/// outlive a resize or any other structural change.
#[derive(Clone, Hash, PartialEq, Eq, Debug)]
pub struct Matrix<T> {
    pub(crate) data: DynamicArray<T>,
    pub(crate) nrows: usize,
    pub(crate) ncols: usize,
}

fn checked_len(nrows: usize, ncols: usize) -> Result<usize, MatrixError> {
    nrows
        .checked_mul(ncols)
        .ok_or(MatrixError::ShapeOverflow { nrows, ncols })
}

impl<T> Matrix<T> {
    /// Create a matrix with `nrows` rows and `ncols` columns where every entry is `value`.
    pub fn filled(nrows: usize, ncols: usize, value: T) -> Result<Matrix<T>, MatrixError>
    where
        T: Clone,
    {
        Ok(Matrix {
            data: DynamicArray::with_value(checked_len(nrows, ncols)?, value)?,
            nrows,
            ncols,
        })
    }

    /// Create a matrix from the first `nrows * ncols` entries of `seq`, in row-major order.
    /// Fails with [MatrixError::UnexpectedEndOfInput] if `seq` runs out early.
    pub fn from_sequence<I: IntoIterator<Item = T>>(
        nrows: usize,
        ncols: usize,
        seq: I,
    ) -> Result<Matrix<T>, MatrixError> {
        let len = checked_len(nrows, ncols)?;

        let mut data = DynamicArray::with_capacity(len)?;
        for e in seq.into_iter().take(len) {
            data.append(e)?;
        }

        if data.len() < len {
            return Err(MatrixError::UnexpectedEndOfInput {
                expected: len,
                found: data.len(),
            });
        }

        Ok(Matrix { data, nrows, ncols })
    }

    /// Create a new matrix from a 2-dimensional vector of scalars.
    pub fn from_nested_vec(matrix: Vec<Vec<T>>) -> Result<Matrix<T>, MatrixError> {
        let nrows = matrix.len();
        let ncols = matrix.first().map(|r| r.len()).unwrap_or(0);

        if matrix.iter().any(|r| r.len() != ncols) {
            return Err(MatrixError::NotRectangular);
        }

        Matrix::from_sequence(nrows, ncols, matrix.into_iter().flatten())
    }

    /// Return the number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Return the number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.nrows == self.ncols
    }

    /// Return the entries in row-major order.
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Get a view of row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.ncols..(i + 1) * self.ncols]
    }

    /// Get a mutable view of row `i`.
    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [T] {
        let ncols = self.ncols;
        &mut self.data[i * ncols..(i + 1) * ncols]
    }

    /// Return an iterator over the rows of the matrix. Yields nothing if
    /// the matrix has no columns.
    pub fn row_iter(&self) -> Chunks<'_, T> {
        self.data.chunks(self.ncols.max(1))
    }

    pub fn row_iter_mut(&mut self) -> ChunksMut<'_, T> {
        let ncols = self.ncols.max(1);
        self.data.chunks_mut(ncols)
    }

    /// Return an iterator over the main diagonal.
    pub fn diagonal(&self) -> impl Iterator<Item = &T> + '_ {
        self.data
            .iter()
            .step_by(self.ncols + 1)
            .take(self.nrows.min(self.ncols))
    }

    /// Exchange rows `a` and `b`. Returns `false` and does nothing if `a == b`.
    pub fn swap_rows(&mut self, a: usize, b: usize) -> bool {
        if a >= self.nrows || b >= self.nrows {
            panic!(
                "Row index out of bounds: ({},{}) for {} rows",
                a, b, self.nrows
            );
        }

        if a == b {
            return false;
        }

        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let n = self.ncols;
        let (top, bottom) = self.data.split_at_mut(hi * n);
        top[lo * n..(lo + 1) * n].swap_with_slice(&mut bottom[..n]);
        true
    }

    /// Apply a function `f` to each entry of the matrix.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Result<Matrix<U>, MatrixError> {
        Ok(Matrix {
            data: DynamicArray::from_exact_iter(self.data.iter().map(f))?,
            nrows: self.nrows,
            ncols: self.ncols,
        })
    }

    /// Transpose the matrix.
    pub fn transpose(&self) -> Result<Matrix<T>, MatrixError>
    where
        T: Clone,
    {
        let mut data = DynamicArray::with_capacity(self.data.len())?;
        for j in 0..self.ncols {
            for i in 0..self.nrows {
                data.append(self[(i, j)].clone())?;
            }
        }

        Ok(Matrix {
            data,
            nrows: self.ncols,
            ncols: self.nrows,
        })
    }

    /// Deep-copy the matrix, reporting allocation failure instead of aborting.
    pub fn try_clone(&self) -> Result<Matrix<T>, MatrixError>
    where
        T: Clone,
    {
        Ok(Matrix {
            data: self.data.try_clone()?,
            nrows: self.nrows,
            ncols: self.ncols,
        })
    }
}

impl<T: Scalar> Matrix<T> {
    /// Create a new zeroed matrix with `nrows` rows and `ncols` columns.
    pub fn new(nrows: usize, ncols: usize) -> Result<Matrix<T>, MatrixError> {
        Matrix::filled(nrows, ncols, T::new_zero())
    }

    /// Create a new square matrix with `nrows` rows and ones on the main diagonal and zeroes elsewhere.
    pub fn identity(nrows: usize) -> Result<Matrix<T>, MatrixError> {
        let mut m = Matrix::new(nrows, nrows)?;
        for i in 0..nrows {
            m[(i, i)] = T::new_one();
        }
        Ok(m)
    }

    /// Create a new matrix with the scalars `diag` on the main diagonal and zeroes elsewhere.
    pub fn eye(diag: &[T]) -> Result<Matrix<T>, MatrixError> {
        let mut m = Matrix::new(diag.len(), diag.len())?;
        for (i, e) in diag.iter().enumerate() {
            m[(i, i)] = e.clone();
        }
        Ok(m)
    }

    /// Change the shape to `nrows` by `ncols`. The row-major storage is truncated or
    /// extended with zeroes; existing entries keep their linear position.
    pub fn resize(&mut self, nrows: usize, ncols: usize) -> Result<(), MatrixError> {
        self.data.resize(checked_len(nrows, ncols)?, T::new_zero())?;
        self.nrows = nrows;
        self.ncols = ncols;
        Ok(())
    }

    pub fn set_nrows(&mut self, nrows: usize) -> Result<(), MatrixError> {
        self.resize(nrows, self.ncols)
    }

    pub fn set_ncols(&mut self, ncols: usize) -> Result<(), MatrixError> {
        self.resize(self.nrows, ncols)
    }

    /// Eliminate column `pivot` below the diagonal: every row `j > pivot` becomes
    /// `row_j - (row_j[pivot] / row_pivot[pivot]) * row_pivot`.
    ///
    /// The pivot entry must not be zero.
    pub fn simplify_rows(&mut self, pivot: usize) {
        if pivot >= self.nrows || pivot >= self.ncols {
            panic!(
                "Pivot {} is out of bounds for a ({},{}) matrix",
                pivot, self.nrows, self.ncols
            );
        }

        let n = self.ncols;
        let (upper, lower) = self.data.split_at_mut((pivot + 1) * n);
        let pivot_row = &upper[pivot * n..];
        let base = &pivot_row[pivot];
        debug_assert!(!base.is_zero(), "Zero pivot in row {}", pivot);

        for row in lower.chunks_exact_mut(n) {
            if row[pivot].is_zero() {
                continue;
            }

            let coef = row[pivot].clone() / base.clone();
            for (e, p) in row.iter_mut().zip(pivot_row) {
                *e -= coef.clone() * p.clone();
            }
        }
    }

    /// Multiply two matrices, failing if the inner dimensions differ.
    pub fn checked_mul(&self, rhs: &Matrix<T>) -> Result<Matrix<T>, MatrixError> {
        if self.ncols != rhs.nrows {
            return Err(MatrixError::DimensionMismatch {
                left: (self.nrows, self.ncols),
                right: (rhs.nrows, rhs.ncols),
            });
        }

        let mut m = Matrix::new(self.nrows, rhs.ncols)?;
        for i in 0..self.nrows {
            for k in 0..self.ncols {
                let a = &self[(i, k)];
                for j in 0..rhs.ncols {
                    m[(i, j)] += a.clone() * rhs[(k, j)].clone();
                }
            }
        }

        Ok(m)
    }

    /// Compute the determinant of the matrix.
    ///
    /// The elimination runs on a copy promoted to `f64`, with partial pivoting.
    /// A pivot that is zero under the default [Tolerance] makes the matrix singular
    /// and the determinant `0`.
    ///
    /// ```
    /// use linmat::tensors::matrix::Matrix;
    ///
    /// let m = Matrix::from_sequence(3, 3, [1, 2, 3, 4, 5, 6, 7, 87, 9]).unwrap();
    /// assert!((m.determinant().unwrap() - 474.).abs() < 1e-9);
    /// ```
    pub fn determinant(&self) -> Result<f64, MatrixError> {
        self.determinant_with(&Tolerance::default())
    }

    /// Compute the determinant of the matrix, using `tolerance` to decide
    /// whether a pivot is zero.
    #[instrument(level = "debug", skip_all, fields(n = self.nrows))]
    pub fn determinant_with(&self, tolerance: &Tolerance) -> Result<f64, MatrixError> {
        if !self.is_square() {
            return Err(MatrixError::NotSquare {
                nrows: self.nrows,
                ncols: self.ncols,
            });
        }

        if self.nrows == 0 {
            return Err(MatrixError::EmptyMatrix);
        }

        let mut m = self.map(|e| e.to_f64())?;
        let n = m.nrows;

        let mut sign = 1.;
        for i in 0..n {
            let mut pivot = i;
            for j in i + 1..n {
                if m[(j, i)].abs() > m[(pivot, i)].abs() {
                    pivot = j;
                }
            }

            if m.swap_rows(i, pivot) {
                trace!("Swapped rows {} and {}", i, pivot);
                sign = -sign;
            }

            if tolerance.is_zero(m[(i, i)]) {
                debug!("Singular matrix: pivot {} in column {}", m[(i, i)], i);
                return Ok(0.);
            }

            m.simplify_rows(i);
        }

        let mut det = sign;
        for d in m.diagonal() {
            debug_assert!(d.is_finite(), "Non-finite diagonal entry {}", d);
            det *= d;
        }

        Ok(det)
    }
}

impl<T> Index<usize> for Matrix<T> {
    type Output = [T];

    /// Get the `index`th row of the matrix.
    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        self.row(index)
    }
}

impl<T> IndexMut<usize> for Matrix<T> {
    /// Get the `index`th row of the matrix.
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        self.row_mut(index)
    }
}

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    /// Get the `i`th row and `j`th column of the matrix, where `index=(i,j)`.
    #[inline]
    fn index(&self, index: (usize, usize)) -> &Self::Output {
        debug_assert!(index.1 < self.ncols);
        &self.data[index.0 * self.ncols + index.1]
    }
}

impl<T> IndexMut<(usize, usize)> for Matrix<T> {
    /// Get the `i`th row and `j`th column of the matrix, where `index=(i,j)`.
    #[inline]
    fn index_mut(&mut self, index: (usize, usize)) -> &mut T {
        debug_assert!(index.1 < self.ncols);
        &mut self.data[index.0 * self.ncols + index.1]
    }
}

impl<T: Display> Display for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        MatrixPrinter::new(self).fmt(f)
    }
}

impl<T: Scalar> Mul<&Matrix<T>> for &Matrix<T> {
    type Output = Matrix<T>;

    /// Multiply two matrices.
    fn mul(self, rhs: &Matrix<T>) -> Self::Output {
        match self.checked_mul(rhs) {
            Ok(m) => m,
            Err(MatrixError::Allocation(e)) => e.handle(),
            Err(e) => panic!("Cannot multiply matrices: {}", e),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{
        array::{AllocationError, DynamicArray},
        domains::float::Tolerance,
        tensors::matrix::{Matrix, MatrixError},
    };

    #[test]
    fn construction() {
        let v = [1., 2., 3., 4., 5., 6., 7., 8., 9., 10., 11., 12., 13., 14., 15., 16.];
        let m = Matrix::from_sequence(4, 4, v).unwrap();
        assert_eq!(m.data(), &v);
        assert_eq!(m.nrows(), 4);
        assert_eq!(m.ncols(), 4);

        let f = Matrix::filled(2, 3, 7u8).unwrap();
        assert_eq!(f.data(), &[7; 6]);

        let z = Matrix::<i32>::new(0, 0).unwrap();
        assert_eq!(z.data(), &[] as &[i32]);

        let n = Matrix::from_nested_vec(vec![vec![1, 2], vec![3, 4], vec![5, 6]]).unwrap();
        assert_eq!(n.nrows(), 3);
        assert_eq!(n.ncols(), 2);
        assert_eq!(&n[2], &[5, 6]);

        assert_eq!(
            Matrix::from_nested_vec(vec![vec![1, 2], vec![3]]),
            Err(MatrixError::NotRectangular)
        );
    }

    #[test]
    fn sequence_too_short() {
        assert_eq!(
            Matrix::from_sequence(2, 3, [1, 2, 3, 4]),
            Err(MatrixError::UnexpectedEndOfInput {
                expected: 6,
                found: 4
            })
        );

        // surplus entries are ignored
        let m = Matrix::from_sequence(1, 2, 0..).unwrap();
        assert_eq!(m.data(), &[0, 1]);
    }

    #[test]
    fn allocation_errors_are_returned() {
        let len = usize::MAX / 2 * 2;
        let err = Err(MatrixError::Allocation(AllocationError::CapacityOverflow {
            capacity: len,
        }));
        assert_eq!(Matrix::<i32>::filled(usize::MAX / 2, 2, 0), err);
        assert_eq!(Matrix::<i32>::new(usize::MAX / 2, 2), err);
        assert_eq!(Matrix::<i32>::from_sequence(usize::MAX / 2, 2, 0..), err);
    }

    #[test]
    fn shape_overflow() {
        assert_eq!(
            Matrix::<i32>::filled(usize::MAX, 2, 0),
            Err(MatrixError::ShapeOverflow {
                nrows: usize::MAX,
                ncols: 2
            })
        );

        let mut m = Matrix::from_sequence(2, 2, [1, 2, 3, 4]).unwrap();
        assert_eq!(
            m.resize(3, usize::MAX),
            Err(MatrixError::ShapeOverflow {
                nrows: 3,
                ncols: usize::MAX
            })
        );
        assert_eq!((m.nrows(), m.ncols()), (2, 2));
        assert_eq!(m.data(), &[1, 2, 3, 4]);
        assert_eq!(
            MatrixError::ShapeOverflow { nrows: 3, ncols: 4 }.to_string(),
            "The number of entries of a (3,4) matrix overflows"
        );
    }

    #[test]
    fn identity_and_eye() {
        let m = Matrix::<i64>::identity(3).unwrap();
        assert_eq!(m.data(), &[1, 0, 0, 0, 1, 0, 0, 0, 1]);

        let d = Matrix::eye(&[2., 3.]).unwrap();
        assert_eq!(d.data(), &[2., 0., 0., 3.]);
        assert_eq!(d.diagonal().copied().collect::<Vec<_>>(), [2., 3.]);
    }

    #[test]
    fn rows() {
        let mut m = Matrix::from_sequence(3, 2, [1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(m.row(1), &[3, 4]);

        m.row_mut(1)[0] = 30;
        m[(2, 1)] = 60;
        assert_eq!(
            m.row_iter().map(|r| r.to_vec()).collect::<Vec<_>>(),
            [vec![1, 2], vec![30, 4], vec![5, 60]]
        );

        assert!(!m.swap_rows(1, 1));
        assert!(m.swap_rows(2, 0));
        assert_eq!(m.data(), &[5, 60, 30, 4, 1, 2]);
    }

    #[test]
    fn simplify_rows() {
        let mut m = Matrix::from_sequence(3, 3, [2., 1., 1., 4., 3., 3., -2., 5., 1.]).unwrap();
        m.simplify_rows(0);
        assert_eq!(m.data(), &[2., 1., 1., 0., 1., 1., 0., 6., 2.]);
        m.simplify_rows(1);
        assert_eq!(m.data(), &[2., 1., 1., 0., 1., 1., 0., 0., -4.]);
    }

    #[test]
    fn resize() {
        let mut m = Matrix::from_sequence(2, 2, [1, 2, 3, 4]).unwrap();
        m.resize(2, 3).unwrap();
        assert_eq!(m.data(), &[1, 2, 3, 4, 0, 0]);
        m.set_nrows(1).unwrap();
        assert_eq!(m.data(), &[1, 2, 3]);
        assert_eq!((m.nrows(), m.ncols()), (1, 3));
    }

    #[test]
    fn multiply() {
        let a = Matrix::from_sequence(2, 3, [1, 2, 3, 4, 5, 6]).unwrap();
        let b = Matrix::from_nested_vec(vec![vec![7, 8], vec![9, 10], vec![11, 12]]).unwrap();

        let c = &a * &b;
        assert_eq!(c.data(), &[58, 64, 139, 154]);
        assert_eq!(c[(0, 1)], 64);

        assert_eq!(
            a.checked_mul(&a),
            Err(MatrixError::DimensionMismatch {
                left: (2, 3),
                right: (2, 3)
            })
        );

        assert_eq!(a.transpose().unwrap().data(), &[1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn determinant() {
        let m = Matrix::from_sequence(3, 3, [1., 2., 3., 4., 5., 6., 7., 87., 9.]).unwrap();
        assert!(Tolerance::default().is_close(m.determinant().unwrap(), 474.));

        let m = Matrix::from_sequence(2, 2, [1, 2, 2, 1]).unwrap();
        assert!(Tolerance::default().is_close(m.determinant().unwrap(), -3.));

        let m = Matrix::from_sequence(1, 1, [-5i8]).unwrap();
        assert_eq!(m.determinant(), Ok(-5.));
    }

    #[test]
    fn determinant_of_singular_matrix() {
        let m = Matrix::from_sequence(3, 3, [1, 2, 3, 2, 4, 6, 0, 1, 1]).unwrap();
        assert_eq!(m.determinant(), Ok(0.));

        let m = Matrix::from_sequence(2, 2, [0., 0., 0., 1.]).unwrap();
        assert_eq!(m.determinant(), Ok(0.));
    }

    #[test]
    fn determinant_tolerance() {
        let m = Matrix::eye(&[1., 1e-30]).unwrap();
        assert_eq!(m.determinant(), Ok(1e-30));
        assert_eq!(m.determinant_with(&Tolerance::new(0., 1e-20)), Ok(0.));
    }

    #[test]
    fn determinant_preconditions() {
        let m = Matrix::<i32>::new(0, 0).unwrap();
        assert_eq!(m.determinant(), Err(MatrixError::EmptyMatrix));

        let m = Matrix::<f64>::new(2, 3).unwrap();
        assert_eq!(
            m.determinant(),
            Err(MatrixError::NotSquare { nrows: 2, ncols: 3 })
        );
    }

    #[test]
    fn copy_does_not_alias() {
        let m = Matrix::from_sequence(2, 2, [1, 2, 3, 4]).unwrap();
        let c = m.try_clone().unwrap();
        assert_eq!(m, c);
        assert_ne!(m.data().as_ptr(), c.data().as_ptr());

        let data: DynamicArray<_> = m.map(|x| x * 10).unwrap().data().iter().copied().collect();
        assert_eq!(data.as_slice(), &[10, 20, 30, 40]);
    }
}
