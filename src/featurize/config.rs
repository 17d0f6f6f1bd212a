//! Featurizer configuration.
//!
//! Every field has a default, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! expressions = ["x", "1/x", "log(x)"]
//! multi_feature_depth = 2
//! combine = "product"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::combine::Combiner;
use crate::error::{ConfigError, FeatResult};

/// Base expressions used when none are configured.
pub const DEFAULT_EXPRESSIONS: [&str; 12] = [
    "x",
    "1/x",
    "sqrt(x)",
    "1/sqrt(x)",
    "x**2",
    "x**-2",
    "x**3",
    "x**-3",
    "log(x)",
    "1/log(x)",
    "exp(x)",
    "exp(-x)",
];

/// Construction-time configuration of a [`FunctionFeaturizer`](super::FunctionFeaturizer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturizerConfig {
    /// Base expressions, each a function of the single variable `x`.
    pub expressions: Vec<String>,
    /// Largest number of arguments combined into one feature.
    pub multi_feature_depth: usize,
    /// How the operands of a multi-argument feature are joined.
    pub combine: Combiner,
}

impl Default for FeaturizerConfig {
    fn default() -> Self {
        Self {
            expressions: DEFAULT_EXPRESSIONS.iter().map(|s| s.to_string()).collect(),
            multi_feature_depth: 1,
            combine: Combiner::Product,
        }
    }
}

impl FeaturizerConfig {
    pub fn with_expressions<I, S>(mut self, expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expressions = expressions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.multi_feature_depth = depth;
        self
    }

    pub fn with_combiner(mut self, combine: Combiner) -> Self {
        self.combine = combine;
        self
    }

    /// Check the settings that do not require parsing.
    pub fn validate(&self) -> FeatResult<()> {
        if self.multi_feature_depth == 0 {
            return Err(ConfigError::InvalidDepth {
                depth: self.multi_feature_depth,
            }
            .into());
        }
        if self.expressions.is_empty() {
            return Err(ConfigError::NoExpressions.into());
        }
        Ok(())
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> FeatResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse_toml(&content, &path.display().to_string())
    }

    /// Parse from TOML text.
    pub fn from_toml_str(content: &str) -> FeatResult<Self> {
        Self::parse_toml(content, "<string>")
    }

    fn parse_toml(content: &str, origin: &str) -> FeatResult<Self> {
        let config = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        Ok(config)
    }

    /// Serialize to TOML. Custom combiners are written by name only.
    pub fn to_toml_string(&self) -> FeatResult<String> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeatError;

    #[test]
    fn default_config_has_twelve_expressions() {
        let config = FeaturizerConfig::default();
        assert_eq!(config.expressions.len(), 12);
        assert_eq!(config.expressions[0], "x");
        assert_eq!(config.multi_feature_depth, 1);
        assert_eq!(config.combine, Combiner::Product);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = FeaturizerConfig::from_toml_str("multi_feature_depth = 2\n").unwrap();
        assert_eq!(config.multi_feature_depth, 2);
        assert_eq!(config.expressions.len(), 12);

        let config = FeaturizerConfig::from_toml_str(
            "expressions = [\"x\", \"1/x\"]\ncombine = \"sum\"\n",
        )
        .unwrap();
        assert_eq!(config.expressions, ["x", "1/x"]);
        assert_eq!(config.combine, Combiner::Sum);
    }

    #[test]
    fn toml_round_trip() {
        let config = FeaturizerConfig::default()
            .with_expressions(["x", "exp(-x)"])
            .with_depth(3)
            .with_combiner(Combiner::Sum);
        let text = config.to_toml_string().unwrap();
        assert_eq!(FeaturizerConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn unknown_combiner_is_a_parse_error() {
        let err = FeaturizerConfig::from_toml_str("combine = \"max\"\n").unwrap_err();
        match err {
            FeatError::Config(ConfigError::Parse { message, .. }) => {
                assert!(message.contains("max"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_depth_and_empty_list() {
        let config = FeaturizerConfig::default().with_depth(0);
        assert!(matches!(
            config.validate(),
            Err(FeatError::Config(ConfigError::InvalidDepth { depth: 0 }))
        ));
        let config = FeaturizerConfig::default().with_expressions(Vec::<String>::new());
        assert!(matches!(
            config.validate(),
            Err(FeatError::Config(ConfigError::NoExpressions))
        ));
    }
}
