//! Formatting of matrices.
//!
//! ```
//! use linmat::{
//!     printer::{MatrixPrinter, PrintOptions},
//!     tensors::matrix::Matrix,
//! };
//!
//! let m = Matrix::from_sequence(2, 2, [1, 2, 3, 4]).unwrap();
//! assert_eq!(m.to_string(), "{{1,2},{3,4}}");
//! assert_eq!(
//!     MatrixPrinter::new_with_options(&m, PrintOptions::mathematica()).to_string(),
//!     "{{1, 2}, {3, 4}}"
//! );
//! ```
use std::fmt::{self, Display, Formatter, Write};

use crate::tensors::matrix::Matrix;

/// The overall print mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PrintMode {
    #[default]
    Symbolica,
    Mathematica,
    Latex,
}

/// Various options for printing matrices.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrintOptions {
    pub mode: PrintMode,
    /// The number of digits after the decimal point. Ignored for integers.
    pub precision: Option<usize>,
    /// Print one row per line, with right-aligned columns.
    pub pretty_matrix: bool,
}

impl PrintOptions {
    pub const fn new() -> Self {
        Self {
            mode: PrintMode::Symbolica,
            precision: None,
            pretty_matrix: false,
        }
    }

    /// Print the output in a Mathematica-readable format.
    pub const fn mathematica() -> PrintOptions {
        Self {
            mode: PrintMode::Mathematica,
            ..Self::new()
        }
    }

    /// Print the output in a Latex input format.
    pub const fn latex() -> PrintOptions {
        Self {
            mode: PrintMode::Latex,
            ..Self::new()
        }
    }

    /// Print one row per line, aligned.
    pub const fn pretty() -> PrintOptions {
        Self {
            pretty_matrix: true,
            ..Self::new()
        }
    }
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// A printer for matrices, suitable as an argument to [format!].
pub struct MatrixPrinter<'a, T> {
    pub matrix: &'a Matrix<T>,
    pub opts: PrintOptions,
}

impl<'a, T: Display> MatrixPrinter<'a, T> {
    pub fn new(matrix: &'a Matrix<T>) -> MatrixPrinter<'a, T> {
        MatrixPrinter {
            matrix,
            opts: PrintOptions::default(),
        }
    }

    pub fn new_with_options(matrix: &'a Matrix<T>, opts: PrintOptions) -> MatrixPrinter<'a, T> {
        MatrixPrinter { matrix, opts }
    }

    fn format_entry(&self, e: &T) -> String {
        match self.opts.precision {
            Some(p) => format!("{:.*}", p, e),
            None => e.to_string(),
        }
    }
}

impl<'a, T: Display> Display for MatrixPrinter<'a, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let entries: Vec<Vec<String>> = self
            .matrix
            .row_iter()
            .map(|r| r.iter().map(|e| self.format_entry(e)).collect())
            .collect();

        let width = if self.opts.pretty_matrix {
            entries.iter().flatten().map(|e| e.len()).max().unwrap_or(0)
        } else {
            0
        };

        let (open, close, col_sep, row_sep) = match self.opts.mode {
            PrintMode::Symbolica => ("{", "}", ",", ","),
            PrintMode::Mathematica => ("{", "}", ", ", ", "),
            PrintMode::Latex => ("", "", " & ", " \\\\ "),
        };

        if self.opts.mode == PrintMode::Latex {
            f.write_str("\\begin{pmatrix}")?;
        } else {
            f.write_str(open)?;
        }
        if self.opts.pretty_matrix {
            f.write_char('\n')?;
        }

        for (i, row) in entries.iter().enumerate() {
            if i > 0 {
                f.write_str(row_sep.trim_end())?;
                if self.opts.pretty_matrix {
                    f.write_char('\n')?;
                } else if row_sep.ends_with(' ') {
                    f.write_char(' ')?;
                }
            }

            if self.opts.pretty_matrix {
                f.write_str("  ")?;
            }
            f.write_str(open)?;
            for (j, e) in row.iter().enumerate() {
                if j > 0 {
                    f.write_str(col_sep)?;
                }
                write!(f, "{:>width$}", e, width = width)?;
            }
            f.write_str(close)?;
        }

        if self.opts.pretty_matrix {
            f.write_char('\n')?;
        }
        if self.opts.mode == PrintMode::Latex {
            f.write_str("\\end{pmatrix}")
        } else {
            f.write_str(close)
        }
    }
}
