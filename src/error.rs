//! Rich diagnostic error types for symfeat.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source spans so users know exactly what
//! went wrong and how to fix it.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Top-level error type for symfeat.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum FeatError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Expr(#[from] ExprError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("feature label {index} could not be rendered")]
    #[diagnostic(
        code(symfeat::label::render),
        help(
            "Rendering a label substitutes column names symbolically and never \
             evaluates numbers, so this indicates a combined expression with a \
             free variable outside its slot range. Please file a bug report."
        )
    )]
    Label {
        index: usize,
        #[source]
        source: EvalError,
    },
}

// ---------------------------------------------------------------------------
// Expression errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ExprError {
    #[error("unexpected character '{ch}'")]
    #[diagnostic(
        code(symfeat::expr::unexpected_char),
        help("Expressions may contain numbers, identifiers, + - * / ** ^ and parentheses.")
    )]
    UnexpectedChar {
        ch: char,
        #[source_code]
        src: String,
        #[label("not part of the expression grammar")]
        span: SourceSpan,
    },

    #[error("expected {expected}, found {found}")]
    #[diagnostic(
        code(symfeat::expr::unexpected_token),
        help("Check for balanced parentheses and a value on both sides of every operator.")
    )]
    UnexpectedToken {
        expected: String,
        found: String,
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("unknown function '{name}'")]
    #[diagnostic(
        code(symfeat::expr::unknown_function),
        help("Supported functions are sqrt, exp, log (or ln), sin, cos, tan and abs.")
    )]
    UnknownFunction {
        name: String,
        #[source_code]
        src: String,
        #[label("called here")]
        span: SourceSpan,
    },

    #[error("invalid numeric literal '{literal}'")]
    #[diagnostic(
        code(symfeat::expr::invalid_number),
        help(
            "Numbers are held as exact rationals: integers and decimals with at \
             most 18 significant digits are accepted."
        )
    )]
    InvalidNumber {
        literal: String,
        #[source_code]
        src: String,
        #[label("this literal")]
        span: SourceSpan,
    },

    #[error("expression \"{expression}\" must depend on exactly the variable '{variable}', found {{{found}}}")]
    #[diagnostic(
        code(symfeat::expr::not_univariate),
        help(
            "Base expressions are functions of a single variable named '{variable}', \
             e.g. \"1/x\" or \"x**2\"."
        )
    )]
    NotUnivariate {
        expression: String,
        variable: String,
        found: String,
    },
}

// ---------------------------------------------------------------------------
// Evaluation errors
// ---------------------------------------------------------------------------

/// A failure while evaluating or post-processing a single substituted expression.
///
/// The featurizer recovers these locally: the affected output slot becomes a
/// missing value and the rest of the feature vector is unaffected.
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum EvalError {
    #[error("variable '{name}' is not bound")]
    #[diagnostic(
        code(symfeat::eval::unbound),
        help("Every free variable must be bound to an argument before evaluation.")
    )]
    UnboundVariable { name: String },

    #[error("division by zero")]
    #[diagnostic(code(symfeat::eval::division_by_zero))]
    DivisionByZero,

    #[error("{function} is undefined at {argument}")]
    #[diagnostic(
        code(symfeat::eval::domain),
        help("Evaluate in the complex domain to obtain values for negative arguments.")
    )]
    Domain { function: String, argument: String },

    #[error("result is not a number")]
    #[diagnostic(code(symfeat::eval::nan))]
    NotANumber,
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("multi_feature_depth must be at least 1, got {depth}")]
    #[diagnostic(
        code(symfeat::config::invalid_depth),
        help("Use 1 for single-variable features, 2 for pairwise combinations, and so on.")
    )]
    InvalidDepth { depth: usize },

    #[error("no base expressions configured")]
    #[diagnostic(
        code(symfeat::config::no_expressions),
        help("Provide at least one expression, or omit the list to use the defaults.")
    )]
    NoExpressions,

    #[error("combined expression {expression} at depth {depth} has free variables {{{found}}}, expected {{{expected}}}")]
    #[diagnostic(
        code(symfeat::config::free_variables),
        help(
            "The combining function must use every one of its inputs exactly as given \
             and must not introduce new variables."
        )
    )]
    FreeVariables {
        depth: usize,
        expression: String,
        expected: String,
        found: String,
    },

    #[error("equivalence check for depth {depth} stopped before saturation: {reason}")]
    #[diagnostic(
        code(symfeat::config::unsaturated),
        help(
            "Lower multi_feature_depth or shorten the expression list. An incomplete \
             check would keep equivalent features as separate outputs."
        )
    )]
    Unsaturated { depth: usize, reason: String },

    #[error("unknown combining function: {name}")]
    #[diagnostic(
        code(symfeat::config::unknown_combiner),
        help("Built-in combining functions are \"product\" and \"sum\".")
    )]
    UnknownCombiner { name: String },

    #[error("failed to read config {path}")]
    #[diagnostic(
        code(symfeat::config::read),
        help("Check that the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(symfeat::config::parse),
        help(
            "The config is TOML with optional keys `expressions` (list of strings), \
             `multi_feature_depth` (integer) and `combine` (\"product\" or \"sum\")."
        )
    )]
    Parse { path: String, message: String },
}

/// Convenience alias for expression-level results.
pub type ExprResult<T> = std::result::Result<T, ExprError>;

/// Convenience alias for evaluation results.
pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// Convenience alias for functions returning symfeat results.
pub type FeatResult<T> = std::result::Result<T, FeatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_feat_error() {
        let err = ConfigError::InvalidDepth { depth: 0 };
        let feat: FeatError = err.into();
        assert!(matches!(
            feat,
            FeatError::Config(ConfigError::InvalidDepth { depth: 0 })
        ));
    }

    #[test]
    fn expr_error_converts_to_feat_error() {
        let err = ExprError::NotUnivariate {
            expression: "y".into(),
            variable: "x".into(),
            found: "y".into(),
        };
        let feat: FeatError = err.into();
        assert!(matches!(feat, FeatError::Expr(ExprError::NotUnivariate { .. })));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = ConfigError::FreeVariables {
            depth: 2,
            expression: "x0".into(),
            expected: "x0, x1".into(),
            found: "x0".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("depth 2"));
        assert!(msg.contains("{x0, x1}"));

        let err = EvalError::Domain {
            function: "sqrt".into(),
            argument: "-4".into(),
        };
        assert_eq!(err.to_string(), "sqrt is undefined at -4");
    }
}
