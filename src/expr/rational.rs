//! Exact rational constants.
//!
//! Constants in expressions are [`Rational64`] values, so folding `(x**2)**-1`
//! into `x**-2` or `sqrt(x)` into `x**(1/2)` never introduces floating-point
//! noise into equivalence checks. Folding uses the checked operations only: an
//! operation that would overflow `i64` returns `None` and the caller leaves the
//! expression unfolded.

use num_rational::Rational64;
use num_traits::{CheckedDiv, CheckedMul, One, Zero};

pub type Rational = Rational64;

pub const ZERO: Rational = Rational::new_raw(0, 1);
pub const ONE: Rational = Rational::new_raw(1, 1);
pub const MINUS_ONE: Rational = Rational::new_raw(-1, 1);
pub const HALF: Rational = Rational::new_raw(1, 2);
pub const MINUS_HALF: Rational = Rational::new_raw(-1, 2);

/// Operations the normalizer and evaluator need beyond what `Ratio` provides.
pub trait RationalExt: Sized {
    /// The integer value, if this rational is whole.
    fn as_integer(&self) -> Option<i64>;

    fn as_f64(&self) -> f64;

    fn checked_neg(&self) -> Option<Self>;

    /// Raise to an integer power. `None` on overflow or `0` to a negative power.
    fn checked_pow(&self, exp: i64) -> Option<Self>;
}

impl RationalExt for Rational {
    fn as_integer(&self) -> Option<i64> {
        self.is_integer().then(|| *self.numer())
    }

    fn as_f64(&self) -> f64 {
        *self.numer() as f64 / *self.denom() as f64
    }

    fn checked_neg(&self) -> Option<Self> {
        MINUS_ONE.checked_mul(self)
    }

    fn checked_pow(&self, exp: i64) -> Option<Self> {
        let base = if exp < 0 {
            if self.is_zero() {
                return None;
            }
            ONE.checked_div(self)?
        } else {
            *self
        };
        let mut acc = Rational::one();
        for _ in 0..exp.unsigned_abs() {
            acc = acc.checked_mul(&base)?;
        }
        Some(acc)
    }
}

/// Parse an unsigned decimal literal (`3`, `0.25`, `.5`) exactly.
///
/// Returns `None` for anything else, including literals whose digits do not
/// fit in `i64`.
pub fn parse_decimal(literal: &str) -> Option<Rational> {
    let (int_part, frac_part) = literal.split_once('.').unwrap_or((literal, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let scale = 10i64.checked_pow(u32::try_from(frac_part.len()).ok()?)?;
    let int_value: i64 = if int_part.is_empty() { 0 } else { int_part.parse().ok()? };
    let frac_value: i64 = if frac_part.is_empty() { 0 } else { frac_part.parse().ok()? };
    let numer = int_value.checked_mul(scale)?.checked_add(frac_value)?;
    Some(Rational::new(numer, scale))
}
