//! The shared traversal behind feature values and feature labels.
//!
//! For every depth `d` from 1 to the table's maximum, every `d`-subset of the
//! argument positions (increasing index order) and every combined expression
//! at depth `d`, the traversal binds slot `x{i}` to the `i`-th selected
//! argument and hands the expression to a [`Postprocess`]. The postprocess
//! decides what "binding" means: numeric evaluation for values, symbolic
//! substitution and rendering for labels.

use std::collections::HashMap;
use std::ops::Range;

use itertools::{Combinations, Itertools};
use num_complex::Complex64;

use super::table::CombinationTable;
use crate::combine::{BASE_VARIABLE, slot_name};
use crate::error::{EvalError, EvalResult};
use crate::expr::Expr;

/// The arguments selected for one combination, addressed by slot.
#[derive(Debug)]
pub struct Slots<'a, A> {
    args: &'a [A],
    picks: &'a [usize],
}

impl<'a, A> Slots<'a, A> {
    pub fn len(&self) -> usize {
        self.picks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }

    /// Position in the full argument tuple of each slot.
    pub fn positions(&self) -> &'a [usize] {
        self.picks
    }

    /// Argument bound to slot `i`.
    pub fn arg(&self, slot: usize) -> Option<&'a A> {
        self.picks.get(slot).and_then(|&i| self.args.get(i))
    }

    /// Argument bound to the slot variable `name` (`"x0"`, `"x1"`, ...).
    pub fn get(&self, name: &str) -> Option<&'a A> {
        let index: usize = name.strip_prefix(BASE_VARIABLE)?.parse().ok()?;
        if slot_name(index) != name {
            return None;
        }
        self.arg(index)
    }

    /// Slot variable names paired with their arguments.
    pub fn iter(&self) -> impl Iterator<Item = (String, &'a A)> + '_ {
        (0..self.len()).filter_map(|i| self.arg(i).map(|a| (slot_name(i), a)))
    }
}

/// Final transform applied to each combined expression with its bound slots.
pub trait Postprocess<A> {
    type Output;

    fn apply(&self, expr: &Expr, slots: &Slots<'_, A>) -> EvalResult<Self::Output>;
}

impl<A, T, F> Postprocess<A> for F
where
    F: Fn(&Expr, &Slots<'_, A>) -> EvalResult<T>,
{
    type Output = T;

    fn apply(&self, expr: &Expr, slots: &Slots<'_, A>) -> EvalResult<T> {
        self(expr, slots)
    }
}

/// Relative bound on the imaginary part of a complex value accepted as real.
const IMAGINARY_TOLERANCE: f64 = 1e-9;

/// Evaluate in the real domain.
///
/// Only the final value has to be real. When an intermediate step leaves the
/// real line, as in `sqrt(x0)*sqrt(x1)` at two negative arguments, the
/// expression is evaluated again over `Complex64` and the result is kept if
/// its imaginary part is negligible.
#[derive(Debug, Clone, Copy, Default)]
pub struct Real;

impl<A: Copy + Into<f64>> Postprocess<A> for Real {
    type Output = f64;

    fn apply(&self, expr: &Expr, slots: &Slots<'_, A>) -> EvalResult<f64> {
        match expr.eval(&|name: &str| slots.get(name).map(|&a| a.into())) {
            Err(err @ EvalError::Domain { .. }) => {
                let lookup = |name: &str| slots.get(name).map(|&a| Complex64::new(a.into(), 0.0));
                match expr.eval::<Complex64, _>(&lookup) {
                    Ok(z) => real_part(z).ok_or(err),
                    Err(_) => Err(err),
                }
            }
            other => other,
        }
    }
}

fn real_part(z: Complex64) -> Option<f64> {
    (z.im.abs() <= IMAGINARY_TOLERANCE * z.re.abs().max(1.0)).then_some(z.re)
}

/// Evaluate in the complex domain (principal branch).
#[derive(Debug, Clone, Copy, Default)]
pub struct Complex;

impl<A: Copy + Into<Complex64>> Postprocess<A> for Complex {
    type Output = Complex64;

    fn apply(&self, expr: &Expr, slots: &Slots<'_, A>) -> EvalResult<Complex64> {
        expr.eval(&|name: &str| slots.get(name).map(|&a| a.into()))
    }
}

/// How labels are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LabelStyle {
    #[default]
    Plain,
    Latex,
}

/// Substitute column names for slot variables and render the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct Label {
    pub style: LabelStyle,
}

impl<A: AsRef<str>> Postprocess<A> for Label {
    type Output = String;

    fn apply(&self, expr: &Expr, slots: &Slots<'_, A>) -> EvalResult<String> {
        let bindings: HashMap<String, Expr> = slots
            .iter()
            .map(|(slot, column)| (slot, Expr::var(column.as_ref())))
            .collect();
        if let Some(name) = expr.free_vars().into_iter().find(|v| !bindings.contains_key(v)) {
            return Err(EvalError::UnboundVariable { name });
        }
        let labelled = expr.substitute(&bindings);
        Ok(match self.style {
            LabelStyle::Plain => labelled.to_string(),
            LabelStyle::Latex => labelled.to_latex(),
        })
    }
}

/// A restartable, finite sequence of postprocessed features.
///
/// Holds only borrows and the postprocess; every call to [`Features::iter`]
/// walks the table again from the start.
pub struct Features<'a, A, P> {
    table: &'a CombinationTable,
    args: &'a [A],
    postprocess: P,
}

impl<'a, A, P: Postprocess<A>> Features<'a, A, P> {
    pub(crate) fn new(table: &'a CombinationTable, args: &'a [A], postprocess: P) -> Self {
        Self {
            table,
            args,
            postprocess,
        }
    }

    pub fn iter(&self) -> FeatureIter<'_, A, P> {
        FeatureIter {
            table: self.table,
            args: self.args,
            postprocess: &self.postprocess,
            depth: 0,
            combos: None,
            current: None,
            expr_index: 0,
        }
    }

    /// Number of features, computed without evaluating anything.
    pub fn len(&self) -> usize {
        self.table.feature_count(self.args.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'f, 'a, A, P: Postprocess<A>> IntoIterator for &'f Features<'a, A, P> {
    type Item = Option<P::Output>;
    type IntoIter = FeatureIter<'f, A, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over one pass of a [`Features`] sequence.
///
/// Yields `None` in place of any feature whose postprocess failed.
pub struct FeatureIter<'a, A, P> {
    table: &'a CombinationTable,
    args: &'a [A],
    postprocess: &'a P,
    depth: usize,
    combos: Option<Combinations<Range<usize>>>,
    current: Option<Vec<usize>>,
    expr_index: usize,
}

impl<'a, A, P: Postprocess<A>> FeatureIter<'a, A, P> {
    /// Keep the postprocess error instead of replacing it with `None`.
    pub fn outcomes(self) -> Outcomes<'a, A, P> {
        Outcomes { inner: self }
    }

    fn step(&mut self) -> Option<EvalResult<P::Output>> {
        loop {
            if let Some(picks) = &self.current {
                let exprs = self.table.get(self.depth);
                if let Some(expr) = exprs.get(self.expr_index) {
                    self.expr_index += 1;
                    let slots = Slots {
                        args: self.args,
                        picks,
                    };
                    let outcome = self.postprocess.apply(expr, &slots);
                    if let Err(err) = &outcome {
                        tracing::trace!(
                            depth = self.depth,
                            positions = ?picks,
                            expr = %expr,
                            error = %err,
                            "feature missing"
                        );
                    }
                    return Some(outcome);
                }
                self.current = None;
            }

            if let Some(picks) = self.combos.as_mut().and_then(Iterator::next) {
                self.current = Some(picks);
                self.expr_index = 0;
                continue;
            }

            if self.depth >= self.table.max_depth() {
                return None;
            }
            self.depth += 1;
            self.combos = Some((0..self.args.len()).combinations(self.depth));
        }
    }
}

impl<A, P: Postprocess<A>> Iterator for FeatureIter<'_, A, P> {
    type Item = Option<P::Output>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step().map(Result::ok)
    }
}

/// Like [`FeatureIter`], but yields each postprocess result as is.
pub struct Outcomes<'a, A, P> {
    inner: FeatureIter<'a, A, P>,
}

impl<A, P: Postprocess<A>> Iterator for Outcomes<'_, A, P> {
    type Item = EvalResult<P::Output>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.step()
    }
}
