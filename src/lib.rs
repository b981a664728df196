//! Linmat is a small dense linear algebra library.
//!
//! It provides a growable, contiguous array with explicit allocation errors,
//! row-major matrices over integers and floats with a numerically stable
//! determinant, and chains of matrices that are multiplied in the order that
//! needs the fewest scalar multiplications.
//!
//! For example:
//!
//! ```
//! use linmat::tensors::{chain::MatrixChain, matrix::Matrix};
//!
//! let a = Matrix::from_sequence(2, 2, [2., 1., 1., 3.]).unwrap();
//! assert!((a.determinant().unwrap() - 5.).abs() < 1e-12);
//!
//! let mut chain = MatrixChain::new();
//! chain.append(a.clone()).unwrap();
//! chain.append(Matrix::identity(2).unwrap()).unwrap();
//! chain.append(a.clone()).unwrap();
//! assert_eq!(chain.multiply().unwrap(), &a * &a);
//! ```
//!
//! Set the environment variable `LINMAT_LOG` to for example `debug` to see
//! the logs of the `linmat` binary.

pub mod array;
pub mod domains;
pub mod printer;
pub mod tensors;
