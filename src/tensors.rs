//! Dense matrices and products of matrix chains.

pub mod chain;
pub mod matrix;
