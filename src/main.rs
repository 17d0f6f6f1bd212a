//! symfeat CLI: symbolic function featurizer.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use symfeat::combine::Combiner;
use symfeat::featurize::{FeaturizerConfig, FunctionFeaturizer};

#[derive(Parser)]
#[command(name = "symfeat", version, about = "Symbolic function featurizer")]
struct Cli {
    /// TOML config file (expressions, multi_feature_depth, combine).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base expression in the variable x. Repeat to build a list; replaces
    /// the configured expressions.
    #[arg(long = "expr", global = true)]
    expressions: Vec<String>,

    /// Maximum number of arguments combined into one feature.
    #[arg(long, global = true)]
    depth: Option<usize>,

    /// Combining function: "product" or "sum".
    #[arg(long, global = true)]
    combine: Option<Combiner>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the combination table.
    Table,

    /// Print feature labels for the given column names.
    Labels {
        /// Column names (comma-separated, e.g. "a,b").
        #[arg(long, value_delimiter = ',', required = true)]
        columns: Vec<String>,

        /// Render labels as LaTeX.
        #[arg(long)]
        latex: bool,
    },

    /// Compute features for one row of values.
    Featurize {
        /// Argument values (comma-separated, e.g. "2,3").
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        values: Vec<f64>,

        /// Column names for labelling (defaults to x0, x1, ...).
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,

        /// Evaluate in the complex domain.
        #[arg(long)]
        complex: bool,

        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    fn featurizer_config(&self) -> Result<FeaturizerConfig> {
        let mut config = match &self.config {
            Some(path) => FeaturizerConfig::load(path)?,
            None => FeaturizerConfig::default(),
        };
        if !self.expressions.is_empty() {
            config = config.with_expressions(self.expressions.iter().cloned());
        }
        if let Some(depth) = self.depth {
            config = config.with_depth(depth);
        }
        if let Some(combine) = &self.combine {
            config = config.with_combiner(combine.clone());
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let featurizer = FunctionFeaturizer::new(cli.featurizer_config()?)?;

    match cli.command {
        Commands::Table => {
            let config = featurizer.config();
            println!(
                "{} base expressions, depth {}, combine = {}",
                config.expressions.len(),
                config.multi_feature_depth,
                config.combine
            );
            for (depth, exprs) in featurizer.table().iter() {
                println!("\ndepth {depth} ({} expressions):", exprs.len());
                for (i, expr) in exprs.iter().enumerate() {
                    println!("  {:>4}  {}", i, expr);
                }
            }
        }

        Commands::Labels { columns, latex } => {
            for label in featurizer.feature_labels(&columns, latex)? {
                println!("{label}");
            }
        }

        Commands::Featurize {
            values,
            columns,
            complex,
            json,
        } => {
            let columns =
                columns.unwrap_or_else(|| (0..values.len()).map(|i| format!("x{i}")).collect());
            if columns.len() != values.len() {
                miette::bail!(
                    "{} columns given for {} values; provide one name per value",
                    columns.len(),
                    values.len()
                );
            }
            let labels = featurizer.feature_labels(&columns, false)?;

            let rendered: Vec<serde_json::Value> = if complex {
                featurizer
                    .featurize_complex(&values)
                    .into_iter()
                    .map(|v| match v {
                        Some(c) => serde_json::json!([c.re, c.im]),
                        None => serde_json::Value::Null,
                    })
                    .collect()
            } else {
                featurizer
                    .featurize(&values)
                    .into_iter()
                    .map(|v| serde_json::json!(v))
                    .collect()
            };

            if json {
                let rows: Vec<serde_json::Value> = labels
                    .iter()
                    .zip(&rendered)
                    .map(|(label, value)| serde_json::json!({ "label": label, "value": value }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows).into_diagnostic()?);
            } else {
                let width = labels.iter().map(String::len).max().unwrap_or(0);
                for (label, value) in labels.iter().zip(&rendered) {
                    println!("{label:<width$}  {}", format_value(value));
                }
            }
        }
    }

    Ok(())
}

fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "missing".to_string(),
        serde_json::Value::Array(parts) => match (parts.first(), parts.get(1)) {
            (Some(re), Some(im)) => format!("{re} + {im}i"),
            _ => value.to_string(),
        },
        other => other.to_string(),
    }
}
