//! Command-line interface.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::{DEFAULT_HISTORY_PATH, DEFAULT_LISTEN_ADDR, EngineConfig};
use crate::estimation::{Advice, Engines, PredictionInput, PredictionResult, Product, advise};
use crate::server::EstimatorApi;

#[derive(Parser, Debug)]
#[command(
    name = "payroll-estimator",
    version,
    about = "Estimate effort for payroll bug reports"
)]
pub struct Cli {
    /// Historical resolved-issue dataset (CSV)
    #[arg(long, global = true, env = "ESTIMATOR_HISTORY_PATH", default_value = DEFAULT_HISTORY_PATH)]
    pub history: PathBuf,

    /// Model configuration (JSON); defaults to the known candidate names
    #[arg(long, global = true, env = "ESTIMATOR_MODEL_CONFIG")]
    pub model_config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Estimate effort for one bug
    Predict {
        /// Product line ("diecisiete" or "diez")
        #[arg(short, long)]
        product: Product,

        /// Affected client, exactly as recorded
        #[arg(short, long)]
        client: String,

        /// Short bug summary
        #[arg(short, long)]
        summary: String,

        /// Detailed description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Include recommendations
        #[arg(long)]
        advice: bool,
    },

    /// List known clients for a product line
    Clients {
        #[arg(short, long)]
        product: Product,
    },

    /// Show the statistics backing a product line
    Summary {
        #[arg(short, long)]
        product: Product,
    },

    /// Serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "ESTIMATOR_LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
        listen: SocketAddr,
    },
}

#[derive(Serialize)]
struct AdvisedPrediction {
    prediction: PredictionResult,
    advice: Advice,
}

impl Cli {
    /// Engine configuration from the parsed flags.
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig {
            history_path: self.history.clone(),
            ..Default::default()
        };
        if let Some(path) = &self.model_config {
            config.model_config_paths = vec![path.clone()];
        }
        if let Command::Serve { listen } = &self.command {
            config.listen_addr = *listen;
        }
        config
    }
}

/// Run a parsed command.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.engine_config();

    match cli.command {
        Command::Predict {
            product,
            client,
            summary,
            description,
            advice,
        } => {
            let input = PredictionInput::new(client, summary).with_description(description);
            input.validate()?;

            let engine = Engines::load_one(&config, product)
                .with_context(|| format!("Failed to load the {} estimator", product))?;
            let prediction = engine.predict(&input);

            if advice {
                let advice = advise(&prediction);
                print_json(&AdvisedPrediction { prediction, advice })
            } else {
                print_json(&prediction)
            }
        }
        Command::Clients { product } => {
            let engine = Engines::load_one(&config, product)
                .with_context(|| format!("Failed to load the {} estimator", product))?;
            for client in engine.clients() {
                println!("{}", client);
            }
            Ok(())
        }
        Command::Summary { product } => {
            let engine = Engines::load_one(&config, product)
                .with_context(|| format!("Failed to load the {} estimator", product))?;
            print_json(&engine.summary())
        }
        Command::Serve { .. } => {
            let engines = Engines::load(&config).context("Failed to load estimators")?;
            EstimatorApi::start(Arc::new(engines), config.listen_addr).await?;
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_predict() {
        let cli = Cli::try_parse_from([
            "payroll-estimator",
            "predict",
            "--product",
            "diez",
            "--client",
            "Acme",
            "--summary",
            "recibo mal",
        ])
        .unwrap();

        match cli.command {
            Command::Predict {
                product,
                client,
                description,
                advice,
                ..
            } => {
                assert_eq!(product, Product::Diez);
                assert_eq!(client, "Acme");
                assert_eq!(description, "");
                assert!(!advice);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_product() {
        let result = Cli::try_parse_from([
            "payroll-estimator",
            "clients",
            "--product",
            "nueve",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_model_config_flag_replaces_candidates() {
        let cli = Cli::try_parse_from([
            "payroll-estimator",
            "--model-config",
            "custom.json",
            "serve",
            "--listen",
            "0.0.0.0:9000",
        ])
        .unwrap();

        let config = cli.engine_config();
        assert_eq!(config.model_config_paths, vec![PathBuf::from("custom.json")]);
        assert_eq!(config.listen_addr.port(), 9000);
    }
}
