// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # symfeat
//!
//! Symbolic function featurization for tabular data: expand a row of scalar
//! values into derived features (`1/x`, `sqrt(x)`, `x0*x1`, ...) with matching
//! plain-text or LaTeX labels.
//!
//! ## Architecture
//!
//! - **Expressions** (`expr`): parsing, normalization, evaluation and rendering
//! - **Symbolic equivalence** (`reason`): e-graph equality saturation via `egg`
//! - **Combination generation** (`combine`): multi-variable feature expressions, deduplicated
//! - **Featurization** (`featurize`): the combination table and the shared value/label traversal
//!
//! ## Library usage
//!
//! ```
//! use symfeat::featurize::{FeaturizerConfig, FunctionFeaturizer};
//!
//! let featurizer = FunctionFeaturizer::new(FeaturizerConfig::default()).unwrap();
//! let values = featurizer.featurize(&[2.0]);
//! let labels = featurizer.feature_labels(&["band_gap"], false).unwrap();
//! assert_eq!(labels[1], "1/band_gap");
//! assert_eq!(values[1], Some(0.5));
//! ```

pub mod combine;
pub mod error;
pub mod expr;
pub mod featurize;
pub mod reason;
