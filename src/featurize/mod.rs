//! Function featurizer: expand a row of scalar values into derived features.
//!
//! A [`FunctionFeaturizer`] is built once from a [`FeaturizerConfig`]. Construction
//! parses the base expressions and builds the [`CombinationTable`]; every
//! configuration error surfaces here. After that the featurizer is immutable
//! and can be shared across threads by reference.
//!
//! Values and labels come from the same traversal ([`Features`]), so for
//! argument tuples of equal length they line up position for position:
//!
//! ```
//! use symfeat::featurize::{FeaturizerConfig, FunctionFeaturizer};
//!
//! let config = FeaturizerConfig::default()
//!     .with_expressions(["x", "1/x"])
//!     .with_depth(2);
//! let featurizer = FunctionFeaturizer::new(config).unwrap();
//!
//! let values = featurizer.featurize(&[2.0, 4.0]);
//! let labels = featurizer.feature_labels(&["a", "b"], false).unwrap();
//! assert_eq!(values.len(), labels.len());
//! assert_eq!(labels[5], "a/b");
//! assert_eq!(values[5], Some(0.5));
//! ```

pub mod config;
pub mod table;
pub mod traverse;

use num_complex::Complex64;

use crate::combine::parse_base_expressions;
use crate::error::{FeatError, FeatResult};

pub use config::{DEFAULT_EXPRESSIONS, FeaturizerConfig};
pub use table::CombinationTable;
pub use traverse::{
    Complex, FeatureIter, Features, Label, LabelStyle, Outcomes, Postprocess, Real, Slots,
};

/// Generates features and feature labels from a fixed set of expressions.
#[derive(Debug, Clone)]
pub struct FunctionFeaturizer {
    config: FeaturizerConfig,
    table: CombinationTable,
}

impl FunctionFeaturizer {
    pub fn new(config: FeaturizerConfig) -> FeatResult<Self> {
        config.validate()?;
        let base = parse_base_expressions(&config.expressions)?;
        let table = CombinationTable::build(&base, config.multi_feature_depth, &config.combine)?;

        let per_depth: Vec<usize> = table.iter().map(|(_, exprs)| exprs.len()).collect();
        tracing::info!(
            expressions = config.expressions.len(),
            max_depth = table.max_depth(),
            combiner = %config.combine,
            ?per_depth,
            "function featurizer ready"
        );

        Ok(Self { config, table })
    }

    pub fn config(&self) -> &FeaturizerConfig {
        &self.config
    }

    pub fn table(&self) -> &CombinationTable {
        &self.table
    }

    /// Lazy feature sequence for `args` under an arbitrary postprocess.
    pub fn features<'a, A, P>(&'a self, args: &'a [A], postprocess: P) -> Features<'a, A, P>
    where
        P: Postprocess<A>,
    {
        Features::new(&self.table, args, postprocess)
    }

    /// Real-valued features; `None` where an expression is undefined.
    pub fn featurize(&self, args: &[f64]) -> Vec<Option<f64>> {
        self.features(args, Real).iter().collect()
    }

    /// Complex-valued features (principal branch).
    pub fn featurize_complex(&self, args: &[f64]) -> Vec<Option<Complex64>> {
        self.features(args, Complex).iter().collect()
    }

    pub fn featurize_with<A, P>(&self, args: &[A], postprocess: P) -> Vec<Option<P::Output>>
    where
        P: Postprocess<A>,
    {
        self.features(args, postprocess).iter().collect()
    }

    /// Labels for the features of a row whose columns are named `col_ids`.
    pub fn feature_labels<S: AsRef<str>>(
        &self,
        col_ids: &[S],
        latexify: bool,
    ) -> FeatResult<Vec<String>> {
        let style = if latexify {
            LabelStyle::Latex
        } else {
            LabelStyle::Plain
        };
        self.feature_labels_styled(col_ids, style)
    }

    pub fn feature_labels_styled<S: AsRef<str>>(
        &self,
        col_ids: &[S],
        style: LabelStyle,
    ) -> FeatResult<Vec<String>> {
        self.features(col_ids, Label { style })
            .iter()
            .outcomes()
            .enumerate()
            .map(|(index, rendered)| rendered.map_err(|source| FeatError::Label { index, source }))
            .collect()
    }

    /// Number of features for `n_args` arguments.
    pub fn feature_count(&self, n_args: usize) -> usize {
        self.table.feature_count(n_args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combine::Combiner;
    use crate::expr::Expr;
    use approx::assert_relative_eq;

    fn default_featurizer() -> FunctionFeaturizer {
        FunctionFeaturizer::new(FeaturizerConfig::default()).unwrap()
    }

    #[test]
    fn featurizer_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FunctionFeaturizer>();
    }

    #[test]
    fn default_depth_one_values() {
        let values = default_featurizer().featurize(&[2.0]);
        assert_eq!(values.len(), 12);
        assert_relative_eq!(values[0].unwrap(), 2.0);
        assert_relative_eq!(values[1].unwrap(), 0.5);
        assert_relative_eq!(values[2].unwrap(), std::f64::consts::SQRT_2);
        assert_relative_eq!(values[4].unwrap(), 4.0);
        assert_relative_eq!(values[7].unwrap(), 0.125);
        assert_relative_eq!(values[11].unwrap(), (-2.0f64).exp());
    }

    #[test]
    fn default_labels() {
        let labels = default_featurizer().feature_labels(&["t"], false).unwrap();
        assert_eq!(
            labels,
            [
                "t", "1/t", "sqrt(t)", "1/sqrt(t)", "t**2", "t**(-2)", "t**3", "t**(-3)",
                "log(t)", "1/log(t)", "exp(t)", "exp(-t)",
            ]
        );
    }

    #[test]
    fn latex_labels() {
        let labels = default_featurizer().feature_labels(&["x_1"], true).unwrap();
        assert_eq!(labels[0], "x_{1}");
        assert_eq!(labels[2], "\\sqrt{x_{1}}");
        assert_eq!(labels[11], "e^{- x_{1}}");
    }

    #[test]
    fn labels_and_values_have_equal_length() {
        let config = FeaturizerConfig::default()
            .with_expressions(["x", "1/x", "log(x)"])
            .with_depth(3);
        let featurizer = FunctionFeaturizer::new(config).unwrap();
        for n in 0..5 {
            let args: Vec<f64> = (1..=n).map(f64::from).collect();
            let cols: Vec<String> = (0..n).map(|i| format!("c{i}")).collect();
            let values = featurizer.featurize(&args);
            let labels = featurizer.feature_labels(&cols, false).unwrap();
            assert_eq!(values.len(), labels.len());
            assert_eq!(values.len(), featurizer.feature_count(n as usize));
        }
    }

    #[test]
    fn construction_errors_are_fatal() {
        let bad = FeaturizerConfig::default().with_expressions(["x", "y + 1"]);
        assert!(FunctionFeaturizer::new(bad).is_err());
        let bad = FeaturizerConfig::default().with_depth(0);
        assert!(FunctionFeaturizer::new(bad).is_err());
        let bad = FeaturizerConfig::default().with_expressions(["sqrt(x"]);
        assert!(FunctionFeaturizer::new(bad).is_err());
    }

    #[test]
    fn custom_postprocess_sees_slot_positions() {
        let config = FeaturizerConfig::default()
            .with_expressions(["x"])
            .with_depth(2);
        let featurizer = FunctionFeaturizer::new(config).unwrap();
        let positions = |_: &Expr, slots: &Slots<'_, f64>| -> crate::error::EvalResult<Vec<usize>> {
            Ok(slots.positions().to_vec())
        };
        let out = featurizer.featurize_with(&[1.0, 2.0, 3.0], positions);
        let out: Vec<Vec<usize>> = out.into_iter().flatten().collect();
        assert_eq!(
            out,
            [vec![0], vec![1], vec![2], vec![0, 1], vec![0, 2], vec![1, 2]]
        );
    }

    #[test]
    fn sum_combiner_values() {
        let config = FeaturizerConfig::default()
            .with_expressions(["x", "x**2"])
            .with_depth(2)
            .with_combiner(Combiner::Sum);
        let featurizer = FunctionFeaturizer::new(config).unwrap();
        let values: Vec<f64> = featurizer
            .featurize(&[2.0, 3.0])
            .into_iter()
            .map(Option::unwrap)
            .collect();
        assert_eq!(values, [2.0, 4.0, 3.0, 9.0, 5.0, 11.0, 7.0, 13.0]);
    }

    #[test]
    fn complex_features_fill_real_gaps() {
        let values = default_featurizer().featurize_complex(&[-4.0]);
        assert!(values[2].is_some());
        assert_relative_eq!(values[2].unwrap().im, 2.0, epsilon = 1e-12);
        assert!(values.iter().all(Option::is_some));
    }
}
