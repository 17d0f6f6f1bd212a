//! Combination generation: expand base expressions into multi-variable features.
//!
//! A depth-`n` combination draws one base expression per slot (repetition
//! allowed), renames the base variable `x` to the slot variable `x{i}`, and
//! joins the `n` operands with a [`Combiner`]. Every operand ordering is
//! combined and normalized. Normalization already makes `x0*x1` and `x1*x0`
//! the same tree; the remaining candidates are deduplicated by symbolic
//! equivalence in a single e-graph.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ExprError, FeatResult};
use crate::expr::Expr;
use crate::reason::Equivalence;

/// The free variable of every base expression.
pub const BASE_VARIABLE: &str = "x";

/// Name of the free variable bound to slot `i`.
pub fn slot_name(i: usize) -> String {
    format!("{BASE_VARIABLE}{i}")
}

/// Signature of a caller-supplied combining function.
pub type CombineFn = dyn Fn(&[Expr]) -> Expr + Send + Sync;

/// How the operands of a combination are joined into one expression.
///
/// Serialized by name, so only the built-in variants survive a config file
/// round trip. Custom combiners are set programmatically.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Combiner {
    /// n-way product `x0 * x1 * ...`.
    #[default]
    Product,
    /// n-way sum `x0 + x1 + ...`.
    Sum,
    Custom {
        name: String,
        func: Arc<CombineFn>,
    },
}

impl Combiner {
    /// Wrap a closure as a named combiner.
    pub fn custom<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Expr]) -> Expr + Send + Sync + 'static,
    {
        Combiner::Custom {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Combiner::Product => "product",
            Combiner::Sum => "sum",
            Combiner::Custom { name, .. } => name,
        }
    }

    /// Join operands, one per slot, into a single expression.
    pub fn combine(&self, operands: &[Expr]) -> Expr {
        match self {
            Combiner::Product => Expr::product(operands),
            Combiner::Sum => Expr::sum(operands),
            Combiner::Custom { func, .. } => func(operands),
        }
    }
}

impl fmt::Debug for Combiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combiner::Custom { name, .. } => f.debug_struct("Custom").field("name", name).finish(),
            other => f.write_str(other.name()),
        }
    }
}

impl fmt::Display for Combiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl PartialEq for Combiner {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Combiner::Product, Combiner::Product) | (Combiner::Sum, Combiner::Sum) => true,
            (Combiner::Custom { func: a, .. }, Combiner::Custom { func: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

impl FromStr for Combiner {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "product" | "mul" | "*" => Ok(Combiner::Product),
            "sum" | "add" | "+" => Ok(Combiner::Sum),
            _ => Err(ConfigError::UnknownCombiner { name: s.to_string() }),
        }
    }
}

impl TryFrom<String> for Combiner {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Combiner> for String {
    fn from(combiner: Combiner) -> Self {
        combiner.name().to_string()
    }
}

/// Parse base expression text, requiring each to depend on exactly `x`.
pub fn parse_base_expressions<S: AsRef<str>>(sources: &[S]) -> FeatResult<Vec<Expr>> {
    if sources.is_empty() {
        return Err(ConfigError::NoExpressions.into());
    }

    let expected = BTreeSet::from([BASE_VARIABLE.to_string()]);
    sources
        .iter()
        .map(|source| {
            let source = source.as_ref();
            let expr = Expr::parse(source)?;
            let found = expr.free_vars();
            if found != expected {
                return Err(ExprError::NotUnivariate {
                    expression: source.to_string(),
                    variable: BASE_VARIABLE.to_string(),
                    found: found.into_iter().join(", "),
                }
                .into());
            }
            Ok(expr)
        })
        .collect()
}

/// Parse base expressions and generate their depth-`depth` combinations.
pub fn generate<S: AsRef<str>>(
    expressions: &[S],
    depth: usize,
    combiner: &Combiner,
) -> FeatResult<Vec<Expr>> {
    let base = parse_base_expressions(expressions)?;
    generate_combinations(&base, depth, combiner)
}

/// Generate the deduplicated combinations of already-parsed base expressions.
///
/// The result is normalized, contains no two equivalent expressions, never
/// contains the bare slot variable `x0`, and lists each equivalence class at
/// the position of its first occurrence in generation order.
pub fn generate_combinations(
    base: &[Expr],
    depth: usize,
    combiner: &Combiner,
) -> FeatResult<Vec<Expr>> {
    if depth == 0 {
        return Err(ConfigError::InvalidDepth { depth }.into());
    }
    if base.is_empty() {
        return Err(ConfigError::NoExpressions.into());
    }

    let pools: Vec<Vec<Expr>> = (0..depth)
        .map(|i| {
            let slot = slot_name(i);
            base.iter().map(|e| e.rename_var(BASE_VARIABLE, &slot)).collect()
        })
        .collect();
    let expected: BTreeSet<String> = (0..depth).map(slot_name).collect();

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    let mut generated = 0usize;
    for pick in pools.iter().map(|pool| pool.iter()).multi_cartesian_product() {
        for ordering in pick.iter().permutations(depth) {
            let operands: Vec<Expr> = ordering.into_iter().map(|e| (*e).clone()).collect();
            let combined = combiner.combine(&operands);
            generated += 1;

            let found = combined.free_vars();
            if found != expected {
                return Err(ConfigError::FreeVariables {
                    depth,
                    expression: combined.to_string(),
                    expected: expected.iter().join(", "),
                    found: found.into_iter().join(", "),
                }
                .into());
            }

            // Reorderings of a sum or product normalize to the same tree.
            let combined = combined.normalized();
            if seen.insert(combined.clone()) {
                candidates.push(combined);
            }
        }
    }

    let mut eq = Equivalence::new();
    let trivial = eq.add(&Expr::var(slot_name(0)));
    let handles: Vec<usize> = candidates.iter().map(|c| eq.add(c)).collect();
    let classes = eq.saturate();
    if !classes.saturated() {
        let reason = classes
            .stop_reason()
            .map_or_else(|| "not run".to_string(), |r| format!("{r:?}"));
        tracing::warn!(depth, candidates = candidates.len(), %reason, "equivalence check incomplete");
        return Err(ConfigError::Unsaturated { depth, reason }.into());
    }

    let mut kept_classes = HashSet::from([classes.class(trivial)]);
    let kept: Vec<Expr> = candidates
        .into_iter()
        .zip(handles)
        .filter(|(_, handle)| kept_classes.insert(classes.class(*handle)))
        .map(|(expr, _)| expr)
        .collect();

    tracing::debug!(
        depth,
        generated,
        distinct = seen.len(),
        kept = kept.len(),
        combiner = %combiner,
        "generated combinations"
    );
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeatError;

    fn parse(s: &str) -> Expr {
        Expr::parse(s).unwrap()
    }

    fn rendered(exprs: &[Expr]) -> Vec<String> {
        exprs.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn pairwise_products_of_identity_and_reciprocal() {
        let combos = generate(&["x", "1/x"], 2, &Combiner::Product).unwrap();
        assert_eq!(rendered(&combos), ["x0*x1", "x0/x1", "x1/x0", "1/(x0*x1)"]);
    }

    #[test]
    fn products_are_deduplicated_by_equivalence() {
        let combos = generate(&["x", "1/x"], 2, &Combiner::Product).unwrap();
        for (i, a) in combos.iter().enumerate() {
            for b in &combos[i + 1..] {
                assert!(!a.equivalent(b), "{a} and {b} should not both be kept");
            }
        }
    }

    #[test]
    fn depth_one_drops_identity_and_duplicates() {
        let combos = generate(&["x", "1/x", "x**-1", "x**2"], 1, &Combiner::Product).unwrap();
        assert_eq!(rendered(&combos), ["1/x0", "x0**2"]);
    }

    #[test]
    fn sum_combiner_joins_with_addition() {
        let combos = generate(&["x", "x**2"], 2, &Combiner::Sum).unwrap();
        assert_eq!(combos.len(), 4);
        assert!(combos[0].equivalent(&parse("x1 + x0")));
        assert!(combos.iter().all(|c| matches!(c, Expr::Add(..))));
    }

    #[test]
    fn depth_three_keeps_one_ordering_per_product() {
        let combos = generate(&["x"], 3, &Combiner::Product).unwrap();
        assert_eq!(combos.len(), 1);
        assert!(combos[0].equivalent(&parse("x2 * x1 * x0")));
    }

    #[test]
    fn every_ordering_of_a_product_collapses() {
        let base = &crate::featurize::DEFAULT_EXPRESSIONS[..6];
        let combos = generate(base, 4, &Combiner::Product).unwrap();
        assert_eq!(combos.len(), 6usize.pow(4));

        let mut eq = Equivalence::new();
        let handles: Vec<usize> = combos.iter().map(|c| eq.add(c)).collect();
        let classes = eq.saturate();
        let distinct: HashSet<_> = handles.iter().map(|&h| classes.class(h)).collect();
        assert_eq!(distinct.len(), combos.len());
    }

    #[test]
    fn sums_collapse_like_products() {
        let combos = generate(&["x", "1/x", "exp(x)"], 3, &Combiner::Sum).unwrap();
        assert_eq!(combos.len(), 27);
    }

    #[test]
    fn exponential_products_are_merged_by_equivalence() {
        let merge = Combiner::custom("merge-exp", |ops: &[Expr]| {
            Expr::call(crate::expr::Func::Exp, Expr::sum(ops))
        });
        let combos = generate(&["exp(x)"], 2, &Combiner::Product).unwrap();
        assert_eq!(combos.len(), 1);
        let merged = generate(&["x"], 2, &merge).unwrap();
        assert_eq!(merged.len(), 1);
        assert!(combos[0].equivalent(&merged[0]));
        assert_ne!(combos[0], merged[0]);
    }

    #[test]
    fn generation_is_deterministic() {
        let a = generate(&["x", "1/x", "sqrt(x)"], 2, &Combiner::Product).unwrap();
        let b = generate(&["x", "1/x", "sqrt(x)"], 2, &Combiner::Product).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn custom_combiner_is_applied() {
        let ratio = Combiner::custom("ratio", |ops: &[Expr]| {
            Expr::div(ops[0].clone(), Expr::product(&ops[1..]))
        });
        let combos = generate(&["x"], 2, &ratio).unwrap();
        // Non-commutative: both orderings survive.
        assert_eq!(rendered(&combos), ["x0/x1", "x1/x0"]);
    }

    #[test]
    fn combiner_dropping_a_slot_is_rejected() {
        let first = Combiner::custom("first", |ops: &[Expr]| ops[0].clone());
        let err = generate(&["x"], 2, &first).unwrap_err();
        assert!(matches!(
            err,
            FeatError::Config(ConfigError::FreeVariables { depth: 2, .. })
        ));
    }

    #[test]
    fn invalid_inputs_are_config_errors() {
        assert!(matches!(
            generate(&["x"], 0, &Combiner::Product),
            Err(FeatError::Config(ConfigError::InvalidDepth { depth: 0 }))
        ));
        let empty: [&str; 0] = [];
        assert!(matches!(
            generate(&empty, 1, &Combiner::Product),
            Err(FeatError::Config(ConfigError::NoExpressions))
        ));
        assert!(matches!(
            generate(&["x +"], 1, &Combiner::Product),
            Err(FeatError::Expr(ExprError::UnexpectedToken { .. }))
        ));
    }

    #[test]
    fn base_expressions_must_be_univariate() {
        let err = parse_base_expressions(&["x * y"]).unwrap_err();
        match err {
            FeatError::Expr(ExprError::NotUnivariate { found, .. }) => assert_eq!(found, "x, y"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(parse_base_expressions(&["2"]).is_err());
        assert!(parse_base_expressions(&["exp(-x)"]).is_ok());
    }

    #[test]
    fn combiner_names_parse() {
        assert_eq!("product".parse::<Combiner>().unwrap(), Combiner::Product);
        assert_eq!("Sum".parse::<Combiner>().unwrap(), Combiner::Sum);
        assert!(matches!(
            "max".parse::<Combiner>(),
            Err(ConfigError::UnknownCombiner { .. })
        ));
        assert_eq!(Combiner::default().to_string(), "product");
    }

    #[test]
    fn slot_names_follow_base_variable() {
        assert_eq!(slot_name(0), "x0");
        assert_eq!(slot_name(12), "x12");
    }
}
