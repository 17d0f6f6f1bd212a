//! Symbolic expressions over named variables.
//!
//! [`Expr`] is an immutable tree with exact rational constants. It provides the
//! operations the featurizer needs from a symbolic engine:
//!
//! - **parse** (`parser`): infix text such as `"1/sqrt(x)"` or `"x**-2"`
//! - **normalize** (`normalize`): constant folding and canonical power forms
//! - **equivalence** ([`Expr::equivalent`], backed by the `reason` e-graph)
//! - **substitute / rename**: bind variables to other expressions
//! - **evaluate** (`eval`): numeric evaluation over `f64` or `Complex64`
//! - **render** (`render`): plain text and LaTeX

pub mod eval;
pub mod normalize;
pub mod parser;
pub mod rational;
pub mod render;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::{ExprError, ExprResult};

pub use eval::Scalar;
pub use rational::Rational;

/// Elementary functions of one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Func {
    Sqrt,
    Exp,
    Log,
    Sin,
    Cos,
    Tan,
    Abs,
}

impl Func {
    pub fn name(&self) -> &'static str {
        match self {
            Func::Sqrt => "sqrt",
            Func::Exp => "exp",
            Func::Log => "log",
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Abs => "abs",
        }
    }

    /// Look up a function by the name used in expression text.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sqrt" => Func::Sqrt,
            "exp" => Func::Exp,
            "log" | "ln" => Func::Log,
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "abs" | "Abs" => Func::Abs,
            _ => return None,
        })
    }
}

/// A symbolic expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Expr {
    Num(Rational),
    Var(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

impl Expr {
    /// Parse infix expression text.
    pub fn parse(input: &str) -> ExprResult<Self> {
        parser::parse(input)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn num(value: i64) -> Self {
        Expr::Num(Rational::from_integer(value))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn neg(a: Expr) -> Self {
        Expr::Neg(Box::new(a))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add(a: Expr, b: Expr) -> Self {
        Expr::Add(Box::new(a), Box::new(b))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn sub(a: Expr, b: Expr) -> Self {
        Expr::Sub(Box::new(a), Box::new(b))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn mul(a: Expr, b: Expr) -> Self {
        Expr::Mul(Box::new(a), Box::new(b))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn div(a: Expr, b: Expr) -> Self {
        Expr::Div(Box::new(a), Box::new(b))
    }

    pub fn pow(base: Expr, exp: Expr) -> Self {
        Expr::Pow(Box::new(base), Box::new(exp))
    }

    pub fn call(func: Func, arg: Expr) -> Self {
        Expr::Call(func, Box::new(arg))
    }

    /// Left-folded product of the given factors. An empty slice yields `1`.
    pub fn product(factors: &[Expr]) -> Self {
        factors
            .iter()
            .cloned()
            .reduce(Expr::mul)
            .unwrap_or(Expr::Num(rational::ONE))
    }

    /// Left-folded sum of the given terms. An empty slice yields `0`.
    pub fn sum(terms: &[Expr]) -> Self {
        terms
            .iter()
            .cloned()
            .reduce(Expr::add)
            .unwrap_or(Expr::Num(rational::ZERO))
    }

    /// The constant value, if this node is a number.
    pub fn as_num(&self) -> Option<Rational> {
        match self {
            Expr::Num(c) => Some(*c),
            _ => None,
        }
    }

    pub fn is_var(&self, name: &str) -> bool {
        matches!(self, Expr::Var(v) if v == name)
    }

    /// Direct children, left to right.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Num(_) | Expr::Var(_) => vec![],
            Expr::Neg(a) | Expr::Call(_, a) => vec![a],
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => vec![a, b],
        }
    }

    /// Names of all variables occurring in the expression, sorted.
    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars(&self, vars: &mut BTreeSet<String>) {
        if let Expr::Var(name) = self {
            vars.insert(name.clone());
        }
        for child in self.children() {
            child.collect_vars(vars);
        }
    }

    /// Rebuild the tree bottom-up, replacing each variable with `f(name)`.
    fn map_vars<F>(&self, f: &mut F) -> Expr
    where
        F: FnMut(&str) -> Option<Expr>,
    {
        if let Expr::Var(name) = self {
            return f(name).unwrap_or_else(|| Expr::Var(name.clone()));
        }
        let mut go = |e: &Expr| Box::new(e.map_vars(&mut *f));
        match self {
            Expr::Num(_) | Expr::Var(_) => self.clone(),
            Expr::Neg(a) => Expr::Neg(go(a)),
            Expr::Add(a, b) => Expr::Add(go(a), go(b)),
            Expr::Sub(a, b) => Expr::Sub(go(a), go(b)),
            Expr::Mul(a, b) => Expr::Mul(go(a), go(b)),
            Expr::Div(a, b) => Expr::Div(go(a), go(b)),
            Expr::Pow(a, b) => Expr::Pow(go(a), go(b)),
            Expr::Call(func, a) => Expr::Call(*func, go(a)),
        }
    }

    /// Rename every occurrence of variable `from` to `to`.
    pub fn rename_var(&self, from: &str, to: &str) -> Expr {
        self.map_vars(&mut |name| (name == from).then(|| Expr::var(to)))
    }

    /// Replace variables by expressions. Unmapped variables stay free.
    pub fn substitute(&self, bindings: &HashMap<String, Expr>) -> Expr {
        self.map_vars(&mut |name| bindings.get(name).cloned())
    }

    /// Whether two expressions are mathematically equivalent under the
    /// rewrite system in [`crate::reason`].
    pub fn equivalent(&self, other: &Expr) -> bool {
        let (lhs, rhs) = (self.normalized(), other.normalized());
        if lhs == rhs {
            return true;
        }
        let mut eq = crate::reason::Equivalence::new();
        let a = eq.add(&lhs);
        let b = eq.add(&rhs);
        eq.saturate().same(a, b)
    }

    /// Render as LaTeX.
    pub fn to_latex(&self) -> String {
        render::latex(self)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render::plain(self))
    }
}

impl FromStr for Expr {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expr::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Expr {
        Expr::parse(s).unwrap()
    }

    #[test]
    fn free_vars_are_sorted_and_unique() {
        let e = parse("x1 * x0 + log(x1)");
        let vars: Vec<_> = e.free_vars().into_iter().collect();
        assert_eq!(vars, vec!["x0", "x1"]);
        assert!(parse("2 + 3").free_vars().is_empty());
    }

    #[test]
    fn rename_var_only_touches_named_variable() {
        let e = parse("x * y + 1/x").rename_var("x", "x0");
        assert_eq!(e, parse("x0 * y + 1/x0"));
    }

    #[test]
    fn substitute_binds_expressions() {
        let mut bindings = HashMap::new();
        bindings.insert("x0".to_string(), Expr::var("band_gap"));
        bindings.insert("x1".to_string(), parse("2*y"));
        let e = parse("x0 * x1").substitute(&bindings);
        assert_eq!(e, parse("band_gap * (2*y)"));
    }

    #[test]
    fn product_and_sum_fold_left() {
        let factors = [Expr::var("a"), Expr::var("b"), Expr::var("c")];
        assert_eq!(Expr::product(&factors), parse("a*b*c"));
        assert_eq!(Expr::sum(&factors), parse("a+b+c"));
        assert_eq!(Expr::product(&[]), Expr::num(1));
    }

    #[test]
    fn equivalence_sees_through_commutation_and_division() {
        assert!(parse("x0 * x1").equivalent(&parse("x1 * x0")));
        assert!(parse("x0 / x1").equivalent(&parse("x0 * x1**-1")));
        assert!(parse("1/sqrt(x)").equivalent(&parse("x**(-1/2)")));
        assert!(!parse("x0 / x1").equivalent(&parse("x1 / x0")));
        assert!(parse("exp(x0) * exp(x1)").equivalent(&parse("exp(x1 + x0)")));
    }

    #[test]
    fn out_of_range_literals_are_errors() {
        for input in ["-9223372036854775808/-1", "9223372036854775808", "x**99999999999999999999"] {
            assert!(
                matches!(Expr::parse(input), Err(ExprError::InvalidNumber { .. })),
                "{input}"
            );
        }
        let e = parse("-9223372036854775807/-1").normalized();
        assert_eq!(e, Expr::num(i64::MAX));
    }

    #[test]
    fn func_names_round_trip() {
        for func in [Func::Sqrt, Func::Exp, Func::Log, Func::Sin, Func::Cos, Func::Tan, Func::Abs] {
            assert_eq!(Func::from_name(func.name()), Some(func));
        }
        assert_eq!(Func::from_name("ln"), Some(Func::Log));
        assert_eq!(Func::from_name("gamma"), None);
    }
}
