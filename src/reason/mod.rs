//! Symbolic equivalence via e-graphs (egg).
//!
//! Defines [`MathLang`], the e-graph language for arithmetic expressions, and
//! the rewrite rules that decide when two expressions are the same feature.
//! Expressions are inserted in the form produced by [`Expr::normalized`], which
//! already folds constants and fixes the operand order of sums and products.
//! The rules here cover the identities normalization leaves alone, chiefly
//! merging exponentials.

use std::time::Duration;

use egg::{define_language, Id, RecExpr, Rewrite, Runner, StopReason};

use crate::expr::{Expr, Func, Rational};

define_language! {
    /// The language for e-graph-based equivalence checking.
    ///
    /// - `Num(r)`: an exact rational constant
    /// - `+`, `*`, `pow`, `neg`: arithmetic in normal form
    /// - `-`, `/`, `sqrt`: only produced from un-normalized input
    /// - `exp`, `log`, `sin`, `cos`, `tan`, `abs`: uninterpreted functions
    pub enum MathLang {
        Num(Rational),

        "+" = Add([Id; 2]),
        "-" = Sub([Id; 2]),
        "*" = Mul([Id; 2]),
        "/" = Div([Id; 2]),
        "pow" = Pow([Id; 2]),
        "neg" = Neg([Id; 1]),

        "sqrt" = Sqrt([Id; 1]),
        "exp" = Exp([Id; 1]),
        "log" = Log([Id; 1]),
        "sin" = Sin([Id; 1]),
        "cos" = Cos([Id; 1]),
        "tan" = Tan([Id; 1]),
        "abs" = Abs([Id; 1]),

        Symbol(egg::Symbol),
    }
}

/// Create the rewrite rules used for equivalence checking.
///
/// Normal-form products are left-folded with their factors sorted, so the
/// exponential factors of a product sit next to each other: either at the
/// head of the chain or directly after a prefix `?r`.
pub fn math_rules() -> Vec<Rewrite<MathLang, ()>> {
    vec![
        egg::rewrite!("exp-mul"; "(* (exp ?a) (exp ?b))" => "(exp (+ ?a ?b))"),
        egg::rewrite!("exp-mul-chain"; "(* (* ?r (exp ?a)) (exp ?b))" => "(* ?r (exp (+ ?a ?b)))"),
        egg::rewrite!("exp-pow"; "(pow (exp ?a) ?n)" => "(exp (* ?n ?a))"),
        egg::rewrite!("mul-minus-one"; "(* -1 ?a)" => "(neg ?a)"),
    ]
}

/// Convert an expression tree into an egg [`RecExpr`].
pub fn to_rec_expr(expr: &Expr) -> RecExpr<MathLang> {
    let mut rec = RecExpr::default();
    add_node(expr, &mut rec);
    rec
}

fn add_node(expr: &Expr, rec: &mut RecExpr<MathLang>) -> Id {
    let node = match expr {
        Expr::Num(c) => MathLang::Num(*c),
        Expr::Var(name) => MathLang::Symbol(name.as_str().into()),
        Expr::Neg(a) => MathLang::Neg([add_node(a, rec)]),
        Expr::Add(a, b) => MathLang::Add([add_node(a, rec), add_node(b, rec)]),
        Expr::Sub(a, b) => MathLang::Sub([add_node(a, rec), add_node(b, rec)]),
        Expr::Mul(a, b) => MathLang::Mul([add_node(a, rec), add_node(b, rec)]),
        Expr::Div(a, b) => MathLang::Div([add_node(a, rec), add_node(b, rec)]),
        Expr::Pow(a, b) => MathLang::Pow([add_node(a, rec), add_node(b, rec)]),
        Expr::Call(func, a) => {
            let arg = [add_node(a, rec)];
            match func {
                Func::Sqrt => MathLang::Sqrt(arg),
                Func::Exp => MathLang::Exp(arg),
                Func::Log => MathLang::Log(arg),
                Func::Sin => MathLang::Sin(arg),
                Func::Cos => MathLang::Cos(arg),
                Func::Tan => MathLang::Tan(arg),
                Func::Abs => MathLang::Abs(arg),
            }
        }
    };
    rec.add(node)
}

/// Saturation limits. Both are deterministic. The node limit is a floor: it
/// is raised to a multiple of the input size so that large batches of
/// already-normal expressions still saturate.
pub const DEFAULT_ITER_LIMIT: usize = 30;
pub const DEFAULT_NODE_LIMIT: usize = 200_000;

/// Node budget per inserted node when scaling the node limit.
const NODES_PER_INPUT_NODE: usize = 4;

/// Batch equivalence checker.
///
/// Expressions are added one at a time, then [`Equivalence::saturate`] runs
/// equality saturation once over all of them and returns the resulting
/// [`Classes`]. Batching keeps deduplication of `n` candidates to a single
/// e-graph instead of `n²` pairwise checks.
#[derive(Debug, Clone)]
pub struct Equivalence {
    exprs: Vec<RecExpr<MathLang>>,
    iter_limit: usize,
    node_limit: usize,
}

impl Default for Equivalence {
    fn default() -> Self {
        Self::new()
    }
}

impl Equivalence {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_ITER_LIMIT, DEFAULT_NODE_LIMIT)
    }

    pub fn with_limits(iter_limit: usize, node_limit: usize) -> Self {
        Self {
            exprs: Vec::new(),
            iter_limit,
            node_limit,
        }
    }

    /// Add an expression and return its handle.
    ///
    /// The expression is inserted as given. Pass the output of
    /// [`Expr::normalized`]: the rules do not rewrite `-`, `/` or `sqrt`, and
    /// they do not reorder operands.
    pub fn add(&mut self, expr: &Expr) -> usize {
        self.exprs.push(to_rec_expr(expr));
        self.exprs.len() - 1
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Run equality saturation over every added expression.
    pub fn saturate(self) -> Classes {
        let input_nodes: usize = self.exprs.iter().map(|e| e.as_ref().len()).sum();
        let node_limit = self
            .node_limit
            .max(input_nodes.saturating_mul(NODES_PER_INPUT_NODE));
        let mut runner = Runner::<MathLang, ()>::default()
            .with_iter_limit(self.iter_limit)
            .with_node_limit(node_limit)
            // Wall-clock limits would make results machine-dependent.
            .with_time_limit(Duration::from_secs(24 * 60 * 60));
        for expr in &self.exprs {
            runner = runner.with_expr(expr);
        }
        let runner = runner.run(&math_rules());

        tracing::debug!(
            exprs = self.exprs.len(),
            classes = runner.egraph.number_of_classes(),
            iterations = runner.iterations.len(),
            node_limit,
            stop = ?runner.stop_reason,
            "equality saturation finished"
        );

        let canonical = runner
            .roots
            .iter()
            .map(|&root| runner.egraph.find(root))
            .collect();
        Classes {
            canonical,
            stop_reason: runner.stop_reason,
        }
    }
}

/// The e-class of every expression added to an [`Equivalence`].
#[derive(Debug, Clone)]
pub struct Classes {
    canonical: Vec<Id>,
    stop_reason: Option<StopReason>,
}

impl Classes {
    /// Whether the rules ran to a fixpoint. When a limit stopped the run,
    /// some equivalent expressions may still sit in separate classes.
    pub fn saturated(&self) -> bool {
        matches!(self.stop_reason, Some(StopReason::Saturated))
    }

    /// Why the run stopped.
    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stop_reason.as_ref()
    }

    /// Canonical class id of the expression with the given handle.
    pub fn class(&self, handle: usize) -> Id {
        self.canonical[handle]
    }

    /// Whether two handles ended up in the same e-class.
    pub fn same(&self, a: usize, b: usize) -> bool {
        self.canonical[a] == self.canonical[b]
    }
}
