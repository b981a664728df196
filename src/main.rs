use std::{
    fmt,
    io::{self, Read},
    process::ExitCode,
};

use linmat::tensors::matrix::{Matrix, MatrixError};
use tracing::debug;
use tracing_subscriber::{fmt as log_fmt, prelude::*, util::SubscriberInitExt, EnvFilter};

/// Errors in the input of the determinant driver.
#[derive(Debug, PartialEq)]
enum InputError {
    Io(String),
    MissingDimension,
    InvalidDimension(String),
    InvalidEntry { index: usize, token: String },
    Matrix(MatrixError),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Io(e) => write!(f, "Could not read input: {}", e),
            InputError::MissingDimension => write!(f, "Unexpected EOF: missing matrix size"),
            InputError::InvalidDimension(t) => write!(f, "Invalid matrix size '{}'", t),
            InputError::InvalidEntry { index, token } => {
                write!(f, "Invalid matrix entry {}: '{}'", index, token)
            }
            InputError::Matrix(e) => write!(f, "{}", e),
        }
    }
}

impl From<MatrixError> for InputError {
    fn from(e: MatrixError) -> Self {
        InputError::Matrix(e)
    }
}

/// Read a size `n` followed by the `n * n` entries of a square matrix in
/// row-major order, all separated by whitespace. Entries must be finite.
/// Trailing input is ignored.
fn parse_matrix(input: &str) -> Result<Matrix<f64>, InputError> {
    let mut tokens = input.split_whitespace();

    let n_token = tokens.next().ok_or(InputError::MissingDimension)?;
    let n: usize = n_token
        .parse()
        .map_err(|_| InputError::InvalidDimension(n_token.to_owned()))?;

    let len = n
        .checked_mul(n)
        .ok_or_else(|| InputError::InvalidDimension(n_token.to_owned()))?;

    let entries = tokens
        .take(len)
        .enumerate()
        .map(|(index, t)| match t.parse::<f64>() {
            Ok(x) if x.is_finite() => Ok(x),
            _ => Err(InputError::InvalidEntry {
                index,
                token: t.to_owned(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Read {} of {} entries", entries.len(), len);

    Ok(Matrix::from_sequence(n, n, entries)?)
}

fn run() -> Result<f64, InputError> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| InputError::Io(e.to_string()))?;

    let m = parse_matrix(&input)?;
    Ok(m.determinant()?)
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(log_fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_env("LINMAT_LOG"))
        .init();

    match run() {
        Ok(det) => {
            println!("{}", det);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
