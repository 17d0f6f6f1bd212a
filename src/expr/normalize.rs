//! Normalization: exact constant folding and a canonical operand order.
//!
//! The e-graph in [`crate::reason`] carries no constant analysis and no
//! commutativity rules, so every rewrite that needs rational arithmetic or an
//! operand order happens here, bottom-up, before an expression is inserted:
//!
//! | input          | normal form             |
//! |----------------|-------------------------|
//! | `a - b`        | `a + (-b)`              |
//! | `a / b`        | `a * b^-1`              |
//! | `sqrt(a)`      | `a^(1/2)`               |
//! | `(a^m)^n`      | `a^(m*n)` for integer n |
//! | `(a*b)^n`      | `a^n * b^n` for integer n |
//! | `a^1`, `a^0`   | `a`, `1`                |
//! | `-(-a)`        | `a`                     |
//! | `-(a + b)`     | `-a - b`                |
//! | `b * a * b`    | `a * b^2`               |
//! | `b + 2 + a + b` | `a + 2*b + 2`          |
//!
//! Sums and products are flattened, then rebuilt left-folded over operands
//! sorted by [`Ord`] for [`Expr`]. A product keeps its rational coefficient in
//! front and its sign outside; a sum keeps its constant last. Two expressions
//! that differ only by operand order or grouping therefore normalize to the
//! same tree.
//!
//! Constant subtrees are folded exactly; folds that would overflow are skipped.

use std::collections::BTreeMap;

use num_traits::{CheckedAdd, CheckedMul, One, Signed, Zero};

use super::rational::{self, RationalExt};
use super::{Expr, Func, Rational};

/// Integer exponents beyond this are left unfolded on constant bases.
const MAX_FOLDED_EXPONENT: u64 = 64;

impl Expr {
    /// Return the normal form of this expression.
    pub fn normalized(&self) -> Expr {
        match self {
            Expr::Num(_) | Expr::Var(_) => self.clone(),
            Expr::Neg(a) => neg(a.normalized()),
            Expr::Add(a, b) => sum(vec![a.normalized(), b.normalized()]),
            Expr::Sub(a, b) => sum(vec![a.normalized(), neg(b.normalized())]),
            Expr::Mul(a, b) => product(vec![a.normalized(), b.normalized()]),
            Expr::Div(a, b) => product(vec![
                a.normalized(),
                pow(b.normalized(), Expr::Num(rational::MINUS_ONE)),
            ]),
            Expr::Pow(a, b) => pow(a.normalized(), b.normalized()),
            Expr::Call(Func::Sqrt, a) => pow(a.normalized(), Expr::Num(rational::HALF)),
            Expr::Call(func, a) => call(*func, a.normalized()),
        }
    }
}

fn neg(a: Expr) -> Expr {
    match a {
        Expr::Num(c) => match c.checked_neg() {
            Some(n) => Expr::Num(n),
            None => Expr::neg(Expr::Num(c)),
        },
        Expr::Neg(inner) => *inner,
        Expr::Add(..) => sum(vec![Expr::neg(a)]),
        other => Expr::neg(other),
    }
}

/// Split a normalized sum term into its coefficient and the remaining factors.
fn leading_coefficient(term: Expr) -> (Rational, Expr) {
    fn first_factor(e: &Expr) -> &Expr {
        match e {
            Expr::Mul(a, _) => first_factor(a),
            other => other,
        }
    }

    let Some(c) = first_factor(&term).as_num() else {
        return (rational::ONE, term);
    };
    let mut factors = Vec::new();
    flatten_product(term, &mut factors);
    (c, Expr::product(&factors[1..]))
}

fn flatten_product(e: Expr, out: &mut Vec<Expr>) {
    match e {
        Expr::Mul(a, b) => {
            flatten_product(*a, out);
            flatten_product(*b, out);
        }
        other => out.push(other),
    }
}

fn sum(terms: Vec<Expr>) -> Expr {
    let mut constant = rational::ZERO;
    let mut collected: BTreeMap<Expr, Rational> = BTreeMap::new();
    let mut unmerged = Vec::new();

    let mut stack: Vec<(Rational, Expr)> = terms.into_iter().map(|t| (rational::ONE, t)).collect();
    while let Some((weight, term)) = stack.pop() {
        match term {
            Expr::Add(a, b) => {
                stack.push((weight, *a));
                stack.push((weight, *b));
            }
            Expr::Neg(a) => match weight.checked_neg() {
                Some(w) => stack.push((w, *a)),
                None => unmerged.push(product(vec![Expr::Num(weight), Expr::Neg(a)])),
            },
            Expr::Num(c) => match weight.checked_mul(&c).and_then(|v| constant.checked_add(&v)) {
                Some(total) => constant = total,
                None => unmerged.push(product(vec![Expr::Num(weight), Expr::Num(c)])),
            },
            other => {
                let (c, rest) = leading_coefficient(other);
                let Some(w) = weight.checked_mul(&c) else {
                    unmerged.push(product(vec![Expr::Num(weight), Expr::Num(c), rest]));
                    continue;
                };
                match collected.get_mut(&rest) {
                    None => {
                        collected.insert(rest, w);
                    }
                    Some(total) => match total.checked_add(&w) {
                        Some(t) => *total = t,
                        None => unmerged.push(product(vec![Expr::Num(w), rest])),
                    },
                }
            }
        }
    }

    let mut terms: Vec<Expr> = collected
        .into_iter()
        .filter(|(_, c)| !c.is_zero())
        .map(|(term, c)| product(vec![Expr::Num(c), term]))
        .chain(unmerged)
        .collect();
    terms.sort();
    if !constant.is_zero() || terms.is_empty() {
        terms.push(Expr::Num(constant));
    }
    Expr::sum(&terms)
}

fn product(factors: Vec<Expr>) -> Expr {
    let mut negative = false;
    let mut coeff = rational::ONE;
    let mut powers: BTreeMap<Expr, Rational> = BTreeMap::new();
    let mut unmerged = Vec::new();

    let mut stack = factors;
    while let Some(factor) = stack.pop() {
        match factor {
            Expr::Mul(a, b) => {
                stack.push(*a);
                stack.push(*b);
            }
            Expr::Neg(a) => {
                negative = !negative;
                stack.push(*a);
            }
            Expr::Num(c) => match coeff.checked_mul(&c) {
                Some(p) => coeff = p,
                None => unmerged.push(Expr::Num(c)),
            },
            Expr::Pow(base, exp) => match exp.as_num() {
                Some(e) => merge_power(&mut powers, &mut unmerged, *base, e),
                None => unmerged.push(Expr::Pow(base, exp)),
            },
            other => merge_power(&mut powers, &mut unmerged, other, rational::ONE),
        }
    }

    let mut factors = unmerged;
    let mut resplit = Vec::new();
    for (base, exp) in powers {
        match pow(base, Expr::Num(exp)) {
            Expr::Num(c) => match coeff.checked_mul(&c) {
                Some(p) => coeff = p,
                None => factors.push(Expr::Num(c)),
            },
            merged @ (Expr::Mul(..) | Expr::Neg(..)) => resplit.push(merged),
            merged => factors.push(merged),
        }
    }
    if !resplit.is_empty() {
        // A merged power collapsed back into a product, e.g. sqrt(a*b)**2.
        resplit.extend(factors);
        resplit.push(Expr::Num(coeff));
        let merged = product(resplit);
        return if negative { neg(merged) } else { merged };
    }

    if coeff.is_zero() {
        return Expr::Num(rational::ZERO);
    }
    if coeff.is_negative() {
        if let Some(abs) = coeff.checked_neg() {
            coeff = abs;
            negative = !negative;
        }
    }
    factors.sort();
    if !coeff.is_one() {
        factors.insert(0, Expr::Num(coeff));
    }
    let body = Expr::product(&factors);
    if negative { neg(body) } else { body }
}

fn merge_power(
    powers: &mut BTreeMap<Expr, Rational>,
    unmerged: &mut Vec<Expr>,
    base: Expr,
    exp: Rational,
) {
    match powers.get_mut(&base) {
        None => {
            powers.insert(base, exp);
        }
        Some(total) => match total.checked_add(&exp) {
            Some(t) => *total = t,
            None => unmerged.push(Expr::pow(base, Expr::Num(exp))),
        },
    }
}

fn pow(base: Expr, exp: Expr) -> Expr {
    let Some(e) = exp.as_num() else {
        return Expr::pow(base, exp);
    };
    if e.is_zero() {
        return Expr::Num(rational::ONE);
    }
    if e.is_one() {
        return base;
    }
    let Some(n) = e.as_integer() else {
        return Expr::pow(base, exp);
    };

    match base {
        Expr::Num(c) if n.unsigned_abs() <= MAX_FOLDED_EXPONENT => match c.checked_pow(n) {
            Some(folded) => Expr::Num(folded),
            None => Expr::pow(Expr::Num(c), exp),
        },
        Expr::Pow(inner, m) => match m.as_num().and_then(|m| m.checked_mul(&e)) {
            Some(me) => pow(*inner, Expr::Num(me)),
            None => Expr::pow(Expr::Pow(inner, m), exp),
        },
        Expr::Mul(..) => {
            let mut factors = Vec::new();
            flatten_product(base, &mut factors);
            product(factors.into_iter().map(|f| pow(f, exp.clone())).collect())
        }
        Expr::Neg(inner) if n % 2 == 0 => pow(*inner, exp),
        Expr::Neg(inner) => neg(pow(*inner, exp)),
        other => Expr::pow(other, exp),
    }
}

fn call(func: Func, arg: Expr) -> Expr {
    match (func, arg.as_num()) {
        (Func::Exp, Some(c)) if c.is_zero() => Expr::Num(rational::ONE),
        (Func::Log, Some(c)) if c.is_one() => Expr::Num(rational::ZERO),
        (Func::Abs, Some(c)) if !c.is_negative() => arg,
        _ => Expr::call(func, arg),
    }
}
