//! Products of matrix chains, evaluated in the order that needs the fewest
//! scalar multiplications.
//!
//! ```
//! use linmat::tensors::{chain::MatrixChain, matrix::Matrix};
//!
//! let mut chain = MatrixChain::new();
//! chain.append(Matrix::<i64>::filled(10, 20, 1).unwrap()).unwrap();
//! chain.append(Matrix::filled(20, 30, 1).unwrap()).unwrap();
//! chain.append(Matrix::filled(30, 40, 1).unwrap()).unwrap();
//!
//! assert_eq!(chain.compute_order().parenthesization(), "((A1A2)A3)");
//! assert_eq!(chain.compute_order().scalar_multiplications(), 18000);
//!
//! let p = chain.multiply().unwrap();
//! assert_eq!((p.nrows(), p.ncols()), (10, 40));
//! assert!(p.data().iter().all(|&x| x == 600));
//! ```
use std::fmt::Write;

use once_cell::unsync::OnceCell;
use smallvec::SmallVec;
use tracing::{debug, instrument, trace};

use crate::{
    array::DynamicArray,
    domains::Scalar,
    tensors::matrix::{Matrix, MatrixError},
};

/// A parenthesization of a chain of `n` matrices, stored as the split table of
/// the matrix-chain-order recurrence. For `i < j`, `split(i, j) = k` means that the
/// product of matrices `i..=j` is formed as `(i..=k) * (k+1..=j)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainOrder {
    n: usize,
    cost: Vec<usize>,
    split: Vec<usize>,
}

impl ChainOrder {
    /// Compute the order with the fewest scalar multiplications for matrices
    /// with shapes `dims[i] x dims[i + 1]`. Ties are broken by the smallest split point.
    ///
    /// Costs saturate at `usize::MAX`.
    pub fn optimal(dims: &[usize]) -> ChainOrder {
        let mut order = ChainOrder::empty(dims);
        let n = order.n;

        for len in 2..=n {
            for i in 0..=n - len {
                let j = i + len - 1;

                let mut best = (usize::MAX, i);
                for k in i..j {
                    let c = order
                        .cost(i, k)
                        .saturating_add(order.cost(k + 1, j))
                        .saturating_add(Self::product_cost(dims, i, k, j));
                    if c < best.0 {
                        best = (c, k);
                    }
                }

                order.cost[i * n + j] = best.0;
                order.split[i * n + j] = best.1;
            }
        }

        order
    }

    /// Multiply from left to right: `((A1 A2) A3) ...`.
    pub fn left_to_right(dims: &[usize]) -> ChainOrder {
        ChainOrder::with_splits(dims, |_, j| j - 1)
    }

    /// Multiply from right to left: `... (A(n-2) (A(n-1) An))`.
    pub fn right_to_left(dims: &[usize]) -> ChainOrder {
        ChainOrder::with_splits(dims, |i, _| i)
    }

    fn empty(dims: &[usize]) -> ChainOrder {
        let n = dims.len().saturating_sub(1);
        ChainOrder {
            n,
            cost: vec![0; n * n],
            split: vec![0; n * n],
        }
    }

    fn with_splits(dims: &[usize], choose: impl Fn(usize, usize) -> usize) -> ChainOrder {
        let mut order = ChainOrder::empty(dims);
        let n = order.n;

        for len in 2..=n {
            for i in 0..=n - len {
                let j = i + len - 1;
                let k = choose(i, j);
                debug_assert!(i <= k && k < j);

                order.cost[i * n + j] = order
                    .cost(i, k)
                    .saturating_add(order.cost(k + 1, j))
                    .saturating_add(Self::product_cost(dims, i, k, j));
                order.split[i * n + j] = k;
            }
        }

        order
    }

    #[inline]
    fn product_cost(dims: &[usize], i: usize, k: usize, j: usize) -> usize {
        dims[i]
            .saturating_mul(dims[k + 1])
            .saturating_mul(dims[j + 1])
    }

    /// The number of matrices in the chain.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// The number of scalar multiplications needed for the product of matrices `i..=j`.
    pub fn cost(&self, i: usize, j: usize) -> usize {
        assert!(i <= j && j < self.n, "Invalid subchain ({},{})", i, j);
        self.cost[i * self.n + j]
    }

    /// The last matrix of the left factor in the product of matrices `i..=j`, with `i < j`.
    pub fn split(&self, i: usize, j: usize) -> usize {
        assert!(i < j && j < self.n, "Invalid subchain ({},{})", i, j);
        self.split[i * self.n + j]
    }

    /// The number of scalar multiplications needed for the whole chain.
    pub fn scalar_multiplications(&self) -> usize {
        if self.n == 0 {
            0
        } else {
            self.cost(0, self.n - 1)
        }
    }

    /// The reductions that evaluate the chain, in execution order. Step `p`
    /// replaces operands `p` and `p + 1` of the working list by their product;
    /// positions refer to the list as it is when the step is taken, provided that
    /// after every step all later positions greater than `p` are decreased by one.
    pub fn steps(&self) -> Vec<usize> {
        let mut steps = Vec::with_capacity(self.n.saturating_sub(1));
        if self.n > 1 {
            self.collect_steps(0, self.n - 1, &mut steps);
        }
        steps
    }

    fn collect_steps(&self, i: usize, j: usize, steps: &mut Vec<usize>) {
        if i == j {
            return;
        }

        let k = self.split(i, j);
        self.collect_steps(i, k, steps);
        self.collect_steps(k + 1, j, steps);
        steps.push(k);
    }

    /// Write the order with the matrices named `A1` to `An`, for example `((A1A2)A3)`.
    pub fn parenthesization(&self) -> String {
        let mut out = String::new();
        if self.n > 0 {
            self.write_parenthesization(0, self.n - 1, &mut out);
        }
        out
    }

    fn write_parenthesization(&self, i: usize, j: usize, out: &mut String) {
        if i == j {
            // writing to a string cannot fail
            let _ = write!(out, "A{}", i + 1);
            return;
        }

        let k = self.split(i, j);
        out.push('(');
        self.write_parenthesization(i, k, out);
        self.write_parenthesization(k + 1, j, out);
        out.push(')');
    }
}

/// An ordered list of matrices whose shapes are compatible for multiplication.
#[derive(Clone, Debug)]
pub struct MatrixChain<T> {
    dims: SmallVec<[usize; 8]>,
    operands: DynamicArray<Matrix<T>>,
    order: OnceCell<ChainOrder>,
}

impl<T> Default for MatrixChain<T> {
    fn default() -> Self {
        MatrixChain {
            dims: SmallVec::new(),
            operands: DynamicArray::new(),
            order: OnceCell::new(),
        }
    }
}

impl<T> MatrixChain<T> {
    pub fn new() -> MatrixChain<T> {
        MatrixChain::default()
    }

    /// Add `matrix` at the end of the chain. Its number of rows must equal the
    /// number of columns of the current last matrix.
    pub fn append(&mut self, matrix: Matrix<T>) -> Result<(), MatrixError> {
        if let Some(last) = self.operands.back() {
            if last.ncols() != matrix.nrows() {
                return Err(MatrixError::DimensionMismatch {
                    left: (last.nrows(), last.ncols()),
                    right: (matrix.nrows(), matrix.ncols()),
                });
            }
        }

        let (nrows, ncols) = (matrix.nrows(), matrix.ncols());
        self.operands.append(matrix)?;
        if self.dims.is_empty() {
            self.dims.push(nrows);
        }
        self.dims.push(ncols);

        self.order.take();
        Ok(())
    }

    /// The number of matrices in the chain.
    pub fn len(&self) -> usize {
        self.operands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }

    /// The shared dimensions: matrix `i` has shape `dims[i] x dims[i + 1]`.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn operands(&self) -> &[Matrix<T>] {
        &self.operands
    }

    /// Get the order with the fewest scalar multiplications. The order is
    /// computed once and reused until the chain changes.
    pub fn compute_order(&self) -> &ChainOrder {
        self.order.get_or_init(|| {
            let order = ChainOrder::optimal(&self.dims);
            debug!(
                "Optimal order {} needs {} scalar multiplications",
                order.parenthesization(),
                order.scalar_multiplications()
            );
            order
        })
    }
}

impl<T: Scalar> MatrixChain<T> {
    /// Compute the product of the chain in the optimal order.
    pub fn multiply(&self) -> Result<Matrix<T>, MatrixError> {
        match self.operands.len() {
            0 => Err(MatrixError::EmptyChain),
            1 => self.operands[0].try_clone(),
            _ => self.execute(self.compute_order()),
        }
    }

    /// Compute the product of the chain in the given `order`, which must be
    /// an order for a chain of the same length.
    #[instrument(level = "debug", skip_all, fields(n = self.len()))]
    pub fn execute(&self, order: &ChainOrder) -> Result<Matrix<T>, MatrixError> {
        if self.operands.is_empty() {
            return Err(MatrixError::EmptyChain);
        }

        assert_eq!(
            order.len(),
            self.len(),
            "The order is for a chain of a different length"
        );

        let mut steps = order.steps();
        let mut working = self.operands.try_clone()?;

        for s in 0..steps.len() {
            let p = steps[s];
            let rhs = working.remove(p + 1);
            working[p] = working[p].checked_mul(&rhs)?;
            trace!(
                "Reduced operands {} and {}, {} left",
                p,
                p + 1,
                working.len()
            );

            for later in &mut steps[s + 1..] {
                if *later > p {
                    *later -= 1;
                }
            }
        }

        debug_assert_eq!(working.len(), 1);
        working.pop().ok_or(MatrixError::EmptyChain)
    }
}

#[cfg(test)]
mod test {
    use super::{ChainOrder, MatrixChain};
    use crate::tensors::matrix::{Matrix, MatrixError};

    #[test]
    fn optimal_costs() {
        for (dims, cost) in [
            (vec![1, 2, 3, 4], 18),
            (vec![40, 20, 30, 10, 30], 26000),
            (vec![1, 2, 3, 4, 3, 5, 7, 6, 10], 182),
            (vec![4, 10, 3, 12, 20, 7], 1344),
            (vec![10, 20], 0),
            (vec![10], 0),
            (vec![], 0),
        ] {
            assert_eq!(ChainOrder::optimal(&dims).scalar_multiplications(), cost);
        }
    }

    #[test]
    fn textbook_order() {
        let o = ChainOrder::optimal(&[30, 35, 15, 5, 10, 20, 25]);
        assert_eq!(o.scalar_multiplications(), 15125);
        assert_eq!(o.cost(1, 4), 7125);
        assert_eq!(o.split(0, 5), 2);
        assert_eq!(o.parenthesization(), "((A1(A2A3))((A4A5)A6))");
        assert_eq!(o.steps(), [1, 0, 3, 4, 2]);
    }

    #[test]
    fn ties_prefer_first_split() {
        let o = ChainOrder::optimal(&[2, 2, 2, 2]);
        assert_eq!(o.split(0, 2), 0);
        assert_eq!(o.parenthesization(), "(A1(A2A3))");
    }

    #[test]
    fn fixed_orders() {
        let dims = [10, 20, 30, 40];
        let l = ChainOrder::left_to_right(&dims);
        let r = ChainOrder::right_to_left(&dims);

        assert_eq!(l.parenthesization(), "((A1A2)A3)");
        assert_eq!(l.scalar_multiplications(), 18000);
        assert_eq!(l.steps(), [0, 1]);
        assert_eq!(r.parenthesization(), "(A1(A2A3))");
        assert_eq!(r.scalar_multiplications(), 32000);
        assert_eq!(r.steps(), [1, 0]);
        assert_eq!(ChainOrder::optimal(&dims), l);
    }

    #[test]
    fn append_checks_shapes() {
        let mut c = MatrixChain::new();
        c.append(Matrix::<i32>::new(2, 3).unwrap()).unwrap();
        c.append(Matrix::new(3, 5).unwrap()).unwrap();
        assert_eq!(c.dims(), &[2, 3, 5]);

        assert_eq!(
            c.append(Matrix::new(4, 1).unwrap()),
            Err(MatrixError::DimensionMismatch {
                left: (3, 5),
                right: (4, 1)
            })
        );
        assert_eq!(c.len(), 2);
        assert_eq!(c.dims(), &[2, 3, 5]);
    }

    #[test]
    fn order_is_refreshed_after_append() {
        let mut c = MatrixChain::new();
        c.append(Matrix::<i64>::new(10, 100).unwrap()).unwrap();
        c.append(Matrix::new(100, 5).unwrap()).unwrap();
        assert_eq!(c.compute_order().scalar_multiplications(), 5000);

        c.append(Matrix::new(5, 50).unwrap()).unwrap();
        assert_eq!(c.compute_order().len(), 3);
        assert_eq!(c.compute_order().scalar_multiplications(), 7500);
    }

    #[test]
    fn degenerate_chains() {
        let c = MatrixChain::<f64>::new();
        assert_eq!(c.multiply(), Err(MatrixError::EmptyChain));

        let mut c = MatrixChain::new();
        let m = Matrix::from_sequence(2, 2, [1, 2, 3, 4]).unwrap();
        c.append(m.clone()).unwrap();
        assert_eq!(c.multiply(), Ok(m));
    }

    #[test]
    fn product() {
        let mut c = MatrixChain::new();
        c.append(Matrix::from_sequence(1, 2, [1, 2]).unwrap()).unwrap();
        c.append(Matrix::from_sequence(2, 3, [1, 0, 2, 0, 1, 3]).unwrap())
            .unwrap();
        c.append(Matrix::from_sequence(3, 1, [1, 1, -1]).unwrap())
            .unwrap();

        assert_eq!(c.multiply().unwrap().data(), &[-5]);
        assert_eq!(
            c.execute(&ChainOrder::right_to_left(c.dims())).unwrap().data(),
            &[-5]
        );
    }
}
