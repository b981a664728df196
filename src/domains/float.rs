//! Closeness tests for floating-point numbers.

/// An absolute-or-relative closeness policy: `a` and `b` are close iff
/// `|a - b| <= max(relative * max(|a|, |b|), absolute)`.
///
/// Note that when one side is zero, the relative term can only fire for
/// `relative >= 1`, so zero tests are governed by the absolute tolerance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerance {
    pub relative: f64,
    pub absolute: f64,
}

impl Tolerance {
    pub const fn new(relative: f64, absolute: f64) -> Tolerance {
        Tolerance { relative, absolute }
    }

    /// Check whether `a` and `b` are close under this policy.
    #[inline]
    pub fn is_close(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= (self.relative * a.abs().max(b.abs())).max(self.absolute)
    }

    /// Check whether `a` is close to zero.
    #[inline]
    pub fn is_zero(&self, a: f64) -> bool {
        self.is_close(a, 0.)
    }
}

impl Default for Tolerance {
    /// A relative tolerance of `1e-5` and no absolute tolerance.
    fn default() -> Self {
        Tolerance {
            relative: 1e-5,
            absolute: 0.,
        }
    }
}
