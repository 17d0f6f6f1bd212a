//! Numeric evaluation of expressions.
//!
//! Evaluation is generic over [`Scalar`], implemented for `f64` (real domain)
//! and [`Complex64`] (principal branch). Operations outside the domain of the
//! scalar type return an [`EvalError`] rather than a silent NaN, so callers
//! can tell a missing value from a legitimate infinity.

use std::fmt::Display;
use std::ops::{Add, Mul, Neg};

use num_complex::Complex64;

use super::rational::RationalExt;
use super::{Expr, Func, Rational};
use crate::error::{EvalError, EvalResult};

/// A numeric type expressions can be evaluated in.
pub trait Scalar:
    Copy + Display + Add<Output = Self> + Mul<Output = Self> + Neg<Output = Self>
{
    fn from_rational(value: Rational) -> Self;

    fn div(self, rhs: Self) -> EvalResult<Self>;

    /// Integer power.
    fn powi(self, exp: i32) -> EvalResult<Self>;

    /// Power with an arbitrary exponent.
    fn pow(self, exp: Self) -> EvalResult<Self>;

    fn apply(self, func: Func) -> EvalResult<Self>;

    /// Reject values that are not numbers.
    fn check(self) -> EvalResult<Self>;
}

fn domain(func: Func, argument: impl Display) -> EvalError {
    EvalError::Domain {
        function: func.name().to_string(),
        argument: argument.to_string(),
    }
}

impl Scalar for f64 {
    fn from_rational(value: Rational) -> Self {
        value.as_f64()
    }

    fn div(self, rhs: Self) -> EvalResult<Self> {
        if rhs == 0.0 {
            return Err(EvalError::DivisionByZero);
        }
        Ok(self / rhs)
    }

    fn powi(self, exp: i32) -> EvalResult<Self> {
        if self == 0.0 && exp < 0 {
            return Err(EvalError::DivisionByZero);
        }
        Ok(f64::powi(self, exp))
    }

    fn pow(self, exp: Self) -> EvalResult<Self> {
        if self == 0.0 && exp < 0.0 {
            return Err(EvalError::DivisionByZero);
        }
        if self < 0.0 && exp.fract() != 0.0 {
            return Err(EvalError::Domain {
                function: "pow".into(),
                argument: format!("{self}**{exp}"),
            });
        }
        Ok(self.powf(exp))
    }

    fn apply(self, func: Func) -> EvalResult<Self> {
        match func {
            Func::Sqrt if self < 0.0 => Err(domain(func, self)),
            Func::Sqrt => Ok(self.sqrt()),
            Func::Log if self <= 0.0 => Err(domain(func, self)),
            Func::Log => Ok(self.ln()),
            Func::Exp => Ok(self.exp()),
            Func::Sin => Ok(self.sin()),
            Func::Cos => Ok(self.cos()),
            Func::Tan => Ok(self.tan()),
            Func::Abs => Ok(self.abs()),
        }
    }

    fn check(self) -> EvalResult<Self> {
        if self.is_nan() {
            return Err(EvalError::NotANumber);
        }
        Ok(self)
    }
}

impl Scalar for Complex64 {
    fn from_rational(value: Rational) -> Self {
        Complex64::new(value.as_f64(), 0.0)
    }

    fn div(self, rhs: Self) -> EvalResult<Self> {
        if rhs == Complex64::new(0.0, 0.0) {
            return Err(EvalError::DivisionByZero);
        }
        Ok(self / rhs)
    }

    fn powi(self, exp: i32) -> EvalResult<Self> {
        let zero = Complex64::new(0.0, 0.0);
        if self == zero && exp < 0 {
            return Err(EvalError::DivisionByZero);
        }
        Ok(Complex64::powi(&self, exp))
    }

    fn pow(self, exp: Self) -> EvalResult<Self> {
        let zero = Complex64::new(0.0, 0.0);
        if self == zero {
            return match exp.re {
                re if re < 0.0 => Err(EvalError::DivisionByZero),
                re if re == 0.0 && exp.im == 0.0 => Ok(Complex64::new(1.0, 0.0)),
                _ => Ok(zero),
            };
        }
        Ok(self.powc(exp))
    }

    fn apply(self, func: Func) -> EvalResult<Self> {
        match func {
            Func::Sqrt => Ok(self.sqrt()),
            Func::Log if self == Complex64::new(0.0, 0.0) => Err(domain(func, self)),
            Func::Log => Ok(self.ln()),
            Func::Exp => Ok(self.exp()),
            Func::Sin => Ok(self.sin()),
            Func::Cos => Ok(self.cos()),
            Func::Tan => Ok(self.tan()),
            Func::Abs => Ok(Complex64::new(self.norm(), 0.0)),
        }
    }

    fn check(self) -> EvalResult<Self> {
        if self.re.is_nan() || self.im.is_nan() {
            return Err(EvalError::NotANumber);
        }
        Ok(self)
    }
}

impl Expr {
    /// Evaluate numerically, resolving variables through `lookup`.
    ///
    /// Integer exponents use repeated multiplication, so negative bases
    /// raised to whole powers stay in the real domain.
    pub fn eval<S, F>(&self, lookup: &F) -> EvalResult<S>
    where
        S: Scalar,
        F: Fn(&str) -> Option<S>,
    {
        let value = match self {
            Expr::Num(c) => S::from_rational(*c),
            Expr::Var(name) => lookup(name).ok_or_else(|| EvalError::UnboundVariable {
                name: name.clone(),
            })?,
            Expr::Neg(a) => -a.eval(lookup)?,
            Expr::Add(a, b) => a.eval(lookup)? + b.eval(lookup)?,
            Expr::Sub(a, b) => a.eval(lookup)? + -b.eval(lookup)?,
            Expr::Mul(a, b) => a.eval(lookup)? * b.eval(lookup)?,
            Expr::Div(a, b) => a.eval(lookup)?.div(b.eval(lookup)?)?,
            Expr::Pow(base, exp) => {
                let base = base.eval(lookup)?;
                match exp.as_num().and_then(|e| e.as_integer()) {
                    Some(n) => match i32::try_from(n) {
                        Ok(n) => base.powi(n)?,
                        Err(_) => base.pow(S::from_rational(Rational::from_integer(n)))?,
                    },
                    None => base.pow(exp.eval(lookup)?)?,
                }
            }
            Expr::Call(func, a) => a.eval(lookup)?.apply(*func)?,
        };
        value.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn eval_at(s: &str, x: f64) -> EvalResult<f64> {
        Expr::parse(s).unwrap().normalized().eval(&|name: &str| (name == "x").then_some(x))
    }

    fn eval_complex_at(s: &str, x: f64) -> EvalResult<Complex64> {
        Expr::parse(s)
            .unwrap()
            .normalized()
            .eval(&|name: &str| (name == "x").then_some(Complex64::new(x, 0.0)))
    }

    #[test]
    fn evaluates_default_expressions() {
        assert_relative_eq!(eval_at("1/x", 2.0).unwrap(), 0.5);
        assert_relative_eq!(eval_at("sqrt(x)", 2.0).unwrap(), std::f64::consts::SQRT_2);
        assert_relative_eq!(eval_at("x**-2", 2.0).unwrap(), 0.25);
        assert_relative_eq!(eval_at("x**3", 2.0).unwrap(), 8.0);
        assert_relative_eq!(eval_at("log(x)", 2.0).unwrap(), std::f64::consts::LN_2);
        assert_relative_eq!(eval_at("exp(-x)", 2.0).unwrap(), (-2.0f64).exp());
    }

    #[test]
    fn negative_bases_with_integer_powers_stay_real() {
        assert_relative_eq!(eval_at("x**3", -2.0).unwrap(), -8.0);
        assert_relative_eq!(eval_at("x**-2", -2.0).unwrap(), 0.25);
    }

    #[test]
    fn real_domain_violations_are_errors() {
        assert!(matches!(eval_at("sqrt(x)", -4.0), Err(EvalError::Domain { .. })));
        assert!(matches!(eval_at("1/sqrt(x)", -4.0), Err(EvalError::Domain { .. })));
        assert!(matches!(eval_at("log(x)", 0.0), Err(EvalError::Domain { .. })));
        assert_eq!(eval_at("1/x", 0.0), Err(EvalError::DivisionByZero));
        assert_eq!(eval_at("1/log(x)", 1.0), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn raw_sqrt_is_checked_too() {
        let e = Expr::parse("sqrt(x)").unwrap();
        assert!(matches!(
            e.eval(&|_: &str| Some(-1.0f64)),
            Err(EvalError::Domain { .. })
        ));
    }

    #[test]
    fn complex_domain_accepts_negative_square_roots() {
        let v = eval_complex_at("sqrt(x)", -4.0).unwrap();
        assert_relative_eq!(v.re, 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.im, 2.0, epsilon = 1e-12);

        let v = eval_complex_at("log(x)", -1.0).unwrap();
        assert_relative_eq!(v.im, std::f64::consts::PI, epsilon = 1e-12);

        assert_eq!(eval_complex_at("1/x", 0.0), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn unbound_variables_are_reported() {
        let e = Expr::parse("x * y").unwrap();
        let err = e.eval(&|name: &str| (name == "x").then_some(1.0f64)).unwrap_err();
        assert_eq!(err, EvalError::UnboundVariable { name: "y".into() });
    }

    #[test]
    fn overflow_to_infinity_is_not_an_error() {
        assert!(eval_at("exp(x)", 1000.0).unwrap().is_infinite());
    }
}
