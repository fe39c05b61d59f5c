mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use coinsight_market_data::format::format_usd;
use coinsight_market_data::{format_market_context, Aggregator, MarketData};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use config::Config;

/// Coinsight token data CLI
#[derive(Parser)]
#[command(name = "coinsight")]
#[command(about = "Aggregated crypto token data from multiple providers", long_about = None)]
#[command(version)]
struct Cli {
    /// Print raw JSON instead of the formatted view
    #[arg(long, global = true)]
    json: bool,

    /// Price history window behind the technical indicators
    #[arg(long, global = true, value_enum)]
    timeframe: Option<Timeframe>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Market, on-chain, technical and social metrics for one token
    Token { symbol: String },

    /// Market data only, optionally bypassing the cache
    Market {
        symbol: String,
        #[arg(long)]
        refresh: bool,
    },

    /// Side-by-side market data for several tokens
    Compare {
        #[arg(required = true, num_args = 1..)]
        symbols: Vec<String>,
    },

    /// Descriptive token metadata
    Info { symbol: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Timeframe {
    #[value(name = "1h")]
    Hour,
    #[value(name = "24h")]
    Day,
    #[value(name = "7d")]
    Week,
    #[value(name = "30d")]
    Month,
}

impl Timeframe {
    /// CoinGecko serves intraday points for windows of one day or less.
    fn chart_days(self) -> u32 {
        match self {
            Self::Hour | Self::Day => 1,
            Self::Week => 7,
            Self::Month => 30,
        }
    }
}

fn init_tracing() {
    let log_format = std::env::var("COINSIGHT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    init_tracing();

    if let Some(timeframe) = cli.timeframe {
        config.chart_days = Some(timeframe.chart_days());
    }

    let aggregator = Aggregator::new(config.aggregator_config(), config.providers())
        .context("Failed to configure providers")?;

    match cli.command {
        Commands::Token { symbol } => {
            let data = aggregator.fetch_token_data(&symbol).await;
            if cli.json {
                print_json(&data)?;
            } else {
                print!("{}", format_market_context(&data));
                if let Some(errors) = &data.errors {
                    for error in errors {
                        tracing::warn!("{}", error);
                    }
                }
            }
        }
        Commands::Market { symbol, refresh } => {
            let result = if refresh {
                aggregator.refresh::<MarketData>(&symbol).await
            } else {
                aggregator.fetch::<MarketData>(&symbol).await
            };
            print_json(&result)?;
        }
        Commands::Compare { symbols } => {
            let symbols: Vec<&str> = symbols.iter().map(String::as_str).collect();
            let comparison = aggregator.compare_tokens(&symbols).await;
            if cli.json {
                print_json(&comparison)?;
            } else {
                println!(
                    "{:<10} {:>16} {:>10} {:>14} {:>14}",
                    "SYMBOL", "PRICE", "24H", "MARKET CAP", "VOLUME 24H"
                );
                for (symbol, result) in &comparison.tokens {
                    let market = &result.value;
                    println!(
                        "{:<10} {:>16.6} {:>9.2}% {:>14} {:>14}",
                        symbol,
                        market.price,
                        market.price_change_24h,
                        format_usd(market.market_cap),
                        format_usd(market.volume_24h)
                    );
                }
            }
        }
        Commands::Info { symbol } => {
            let info = aggregator.token_info(&symbol).await;
            print_json(&info)?;
        }
    }

    Ok(())
}
