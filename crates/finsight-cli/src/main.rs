//! Command-line interface for finsight

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use finsight_llm::providers::OpenAICompatProvider;
use finsight_pipeline::server::{self, AppState};
use finsight_pipeline::{AnalysisConfig, AnalysisPipeline, AnalysisResult, NarrativeConfig};
use finsight_utils::{LogConfig, LogFormat, ServerConfig, init_tracing_with};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "finsight")]
#[command(about = "Price history analysis with forecasts and LLM commentary", long_about = None)]
struct Cli {
    /// Log output format (text or json)
    #[arg(long, global = true, env = "FINSIGHT_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// TCP port
        #[arg(long)]
        port: Option<u16>,

        /// Directory chart files are written to
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Run one analysis and print the result
    Analyze {
        /// Ticker symbol, e.g. AAPL
        ticker: String,

        /// First day of the history window (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the history window, today when omitted
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Number of periods to forecast
        #[arg(long, default_value_t = 7)]
        horizon: usize,

        /// Directory chart files are written to
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env()?;
    if let Some(format) = cli.log_format {
        log_config.format = format;
    }
    init_tracing_with(&log_config)?;

    match cli.command {
        Command::Serve {
            host,
            port,
            output_dir,
        } => serve(host, port, output_dir).await,
        Command::Analyze {
            ticker,
            start,
            end,
            horizon,
            output_dir,
            json,
        } => {
            let config = AnalysisConfig::builder()
                .horizon(horizon)
                .output_dir(output_dir)
                .narrative(NarrativeConfig::from_env()?)
                .build()?;
            let pipeline = default_pipeline(config)?;
            let result = pipeline.run(&ticker, start, end).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_report(&result);
            }
            Ok(())
        }
    }
}

async fn serve(host: Option<String>, port: Option<u16>, output_dir: PathBuf) -> anyhow::Result<()> {
    let mut server_config = ServerConfig::from_env()?;
    if let Some(host) = host {
        server_config.host = host;
    }
    if let Some(port) = port {
        server_config.port = port;
    }
    let addr = server_config.socket_addr()?;

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("cannot create output directory {}", output_dir.display()))?;

    let config = AnalysisConfig::builder()
        .output_dir(output_dir)
        .narrative(NarrativeConfig::from_env()?)
        .build()?;
    let pipeline = default_pipeline(config)?;

    info!("Starting finsight API server");
    server::serve(addr, AppState::new(pipeline)).await?;
    info!("Server stopped");
    Ok(())
}

fn default_pipeline(config: AnalysisConfig) -> anyhow::Result<AnalysisPipeline> {
    let provider = OpenAICompatProvider::from_env().context("LLM provider is not configured")?;
    Ok(AnalysisPipeline::with_default_stack(Arc::new(provider), config)?)
}

fn print_report(result: &AnalysisResult) {
    let forecast = result.prediction_results();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Period", "Forecast", "Lower", "Upper"]);
    for (period, (value, interval)) in forecast
        .forecast()
        .iter()
        .zip(forecast.confidence_interval())
        .enumerate()
    {
        table.add_row(vec![
            (period + 1).to_string(),
            format!("{value:.2}"),
            format!("{:.2}", interval.lower),
            format!("{:.2}", interval.upper),
        ]);
    }

    println!("Forecast for {}", result.ticker());
    println!("{table}");
    println!();
    println!("{}", result.market_insights());
    println!();
    for path in result.visualization_paths() {
        println!("Chart: {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from([
            "finsight", "analyze", "AAPL", "--start", "2023-01-01", "--end", "2023-12-31",
            "--horizon", "5", "--json",
        ])
        .unwrap();
        match cli.command {
            Command::Analyze {
                ticker,
                start,
                end,
                horizon,
                json,
                ..
            } => {
                assert_eq!(ticker, "AAPL");
                assert_eq!(start, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
                assert_eq!(end, NaiveDate::from_ymd_opt(2023, 12, 31));
                assert_eq!(horizon, 5);
                assert!(json);
            }
            Command::Serve { .. } => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        assert!(Cli::try_parse_from(["finsight", "analyze", "AAPL", "--start", "01/02/2023"]).is_err());
    }

    #[test]
    fn test_parse_serve_with_json_logs() {
        let cli =
            Cli::try_parse_from(["finsight", "--log-format", "json", "serve", "--port", "9000"])
                .unwrap();
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert!(matches!(cli.command, Command::Serve { port: Some(9000), .. }));
    }
}
