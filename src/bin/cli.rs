//! NIFTY Greeks CLI
//!
//! Command-line interface for pricing, implied volatility, chain reports and
//! portfolio Greeks.
//!
//! # Commands
//!
//! - `nifty-greeks price` - Price one contract and print its Greeks
//! - `nifty-greeks iv` - Back out implied volatility from a premium
//! - `nifty-greeks chain` - Build a full chain report as JSON
//! - `nifty-greeks portfolio --file <positions.json>` - Aggregate position Greeks

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nifty_greeks::prelude::*;

/// Options analytics for Indian index options
#[derive(Parser)]
#[command(name = "nifty-greeks")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON settings file; environment variables still override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Underlying index
    #[arg(short, long, global = true)]
    symbol: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price one contract
    Price {
        #[arg(long)]
        spot: f64,
        #[arg(long)]
        strike: f64,
        /// Calendar days to expiry
        #[arg(long, default_value = "30")]
        days: f64,
        /// Volatility in percent (e.g. 15)
        #[arg(long, default_value = "15")]
        vol: f64,
        /// CE or PE
        #[arg(long, default_value = "CE")]
        side: OptionSide,
        /// Risk-free rate as a decimal; defaults to the configured rate
        #[arg(long)]
        rate: Option<f64>,
    },

    /// Solve implied volatility from a market premium
    Iv {
        #[arg(long)]
        price: f64,
        #[arg(long)]
        spot: f64,
        #[arg(long)]
        strike: f64,
        #[arg(long, default_value = "30")]
        days: f64,
        #[arg(long, default_value = "CE")]
        side: OptionSide,
    },

    /// Build a chain report
    Chain {
        /// Fixed spot; fetched from Yahoo Finance when omitted
        #[arg(long)]
        spot: Option<f64>,
        /// Volatility in percent; historical volatility when omitted
        #[arg(long)]
        vol: Option<f64>,
        /// Only strikes around ATM
        #[arg(long)]
        atm_only: bool,
        /// Generate open interest instead of requiring a feed
        #[arg(long)]
        synthetic_oi: bool,
        /// Seed for generated open interest
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Expiry date (YYYY-MM-DD); defaults to the front weekly expiry
        #[arg(long)]
        expiry: Option<NaiveDate>,
        /// Days to expiry, overriding the expiry calendar
        #[arg(long)]
        days: Option<f64>,
        /// Bypass the snapshot cache
        #[arg(long)]
        refresh: bool,
        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Aggregate Greeks over a list of positions
    Portfolio {
        /// JSON array of positions
        #[arg(short, long)]
        file: PathBuf,
        #[arg(long)]
        spot: f64,
    },
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T, output: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            tracing::info!("Wrote {:?}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(symbol) = cli.symbol {
        settings.symbol = symbol;
    }
    init_tracing(&settings.log_level);

    match cli.command {
        Commands::Price {
            spot,
            strike,
            days,
            vol,
            side,
            rate,
        } => {
            let rate = rate.unwrap_or(settings.risk_free_rate);
            let vol = VolatilityQuote::Percent(vol).to_fraction()?;
            let time = days / DAYS_PER_YEAR;

            let premium = bs_price(spot, strike, time, rate, vol, settings.dividend_yield, side)?;
            let greeks = bs_greeks(spot, strike, time, rate, vol, settings.dividend_yield, side)?;

            println!("{} {} {:.0} ({} days, vol {:.2}%)", settings.symbol, side, strike, days, vol * 100.0);
            println!("  Premium: {:.2}", premium);
            println!("  Delta:   {:.4}", greeks.delta);
            println!("  Gamma:   {:.6}", greeks.gamma);
            println!("  Theta:   {:.4} /day", greeks.theta);
            println!("  Vega:    {:.4} /vol pt", greeks.vega);
            println!("  Rho:     {:.4} /rate pt", greeks.rho);
        }

        Commands::Iv {
            price,
            spot,
            strike,
            days,
            side,
        } => {
            let solution = ImpliedVolSolver::new().solve(
                price,
                spot,
                strike,
                days / DAYS_PER_YEAR,
                settings.risk_free_rate,
                side,
                settings.dividend_yield,
            )?;
            println!(
                "Implied volatility: {:.2}% ({} iterations, price error {:.2e})",
                solution.volatility_percent(),
                solution.iterations,
                solution.price_error
            );
        }

        Commands::Chain {
            spot,
            vol,
            atm_only,
            synthetic_oi,
            seed,
            expiry,
            days,
            refresh,
            output,
        } => {
            if let Some(v) = vol {
                settings.default_volatility = Some(VolatilityQuote::Percent(v).to_fraction()?);
            }

            let now = Local::now().naive_local();
            let expiry = expiry.unwrap_or_else(|| next_weekly_expiry(now));
            let days = days.unwrap_or_else(|| days_to_expiry(expiry, now.date()).max(1) as f64);
            let request = ReportRequest {
                atm_only,
                expiry: Some(expiry),
                days_to_expiry: Some(days),
                quotes: Vec::new(),
            };

            let base: Box<dyn MarketDataProvider> = match spot {
                Some(spot) => Box::new(StaticProvider::new(spot)),
                None => Box::new(YahooClient::new(settings.request_timeout())?),
            };
            let synthetic;
            let provider: &dyn MarketDataProvider = if synthetic_oi {
                synthetic = SyntheticOiProvider::new(base.as_ref(), ScenarioGenerator::new(seed), days);
                &synthetic
            } else {
                base.as_ref()
            };

            // Fixed inputs are never cached
            let mut cache_config = settings.cache_config();
            cache_config.enabled &= spot.is_none();

            let builder = ChainBuilder::new(settings.chain_config(atm_only));
            let fetcher = CachedFetcher::new(provider, cache_config)?;
            let strikes_for = |s: f64| builder.strikes(s);
            let snapshot = if refresh {
                fetcher.refresh_snapshot(&settings.symbol, settings.default_volatility, strikes_for)?
            } else {
                fetcher.get_snapshot(&settings.symbol, settings.default_volatility, strikes_for)?
            };

            let report = report_from_snapshot(&snapshot, &settings, &request, now)?;
            print_json(&report, output.as_ref())?;
        }

        Commands::Portfolio { file, spot } => {
            let summary = PortfolioAggregator::new(settings.risk_free_rate)
                .with_dividend_yield(settings.dividend_yield)
                .aggregate_json(&fs::read_to_string(&file)?, spot)?;
            if !summary.is_complete() {
                tracing::warn!(
                    "{} of {} positions skipped",
                    summary.errors.len(),
                    summary.errors.len() + summary.position_count
                );
            }
            print_json(&summary, None)?;
        }
    }

    Ok(())
}
