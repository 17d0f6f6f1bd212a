//! The immutable depth → combined-expressions table.

use crate::combine::{BASE_VARIABLE, Combiner, generate_combinations, slot_name};
use crate::error::{ConfigError, FeatResult};
use crate::expr::Expr;

/// Combined expressions for every depth from 1 to the configured maximum.
///
/// Depth 1 holds the base expressions renamed to `x0`, in configuration order
/// and without deduplication, so the identity `x` contributes the raw input.
/// Deeper levels hold the deduplicated output of [`generate_combinations`].
#[derive(Debug, Clone, PartialEq)]
pub struct CombinationTable {
    depths: Vec<Vec<Expr>>,
}

impl CombinationTable {
    pub fn build(base: &[Expr], max_depth: usize, combiner: &Combiner) -> FeatResult<Self> {
        if max_depth == 0 {
            return Err(ConfigError::InvalidDepth { depth: max_depth }.into());
        }
        if base.is_empty() {
            return Err(ConfigError::NoExpressions.into());
        }

        let slot = slot_name(0);
        let mut depths = vec![
            base.iter()
                .map(|e| e.rename_var(BASE_VARIABLE, &slot).normalized())
                .collect(),
        ];
        for depth in 2..=max_depth {
            depths.push(generate_combinations(base, depth, combiner)?);
        }
        Ok(Self { depths })
    }

    /// Combined expressions at `depth`; empty outside `1..=max_depth`.
    pub fn get(&self, depth: usize) -> &[Expr] {
        depth
            .checked_sub(1)
            .and_then(|i| self.depths.get(i))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn max_depth(&self) -> usize {
        self.depths.len()
    }

    /// `(depth, expressions)` pairs in ascending depth order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[Expr])> {
        self.depths
            .iter()
            .enumerate()
            .map(|(i, exprs)| (i + 1, exprs.as_slice()))
    }

    /// Total number of combined expressions over all depths.
    pub fn len(&self) -> usize {
        self.depths.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of features produced for `n_args` arguments, saturating at
    /// `usize::MAX`.
    pub fn feature_count(&self, n_args: usize) -> usize {
        self.iter()
            .map(|(depth, exprs)| binomial(n_args, depth).saturating_mul(exprs.len()))
            .fold(0, usize::saturating_add)
    }
}

/// `n` choose `k`, saturating at `usize::MAX`.
fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        // Exact: acc * (n - i) is divisible by i + 1.
        let Some(next) = acc.checked_mul((n - i) as u128) else {
            return usize::MAX;
        };
        acc = next / (i as u128 + 1);
        if acc > usize::MAX as u128 {
            return usize::MAX;
        }
    }
    acc as usize
}
