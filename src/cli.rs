//! CLI definition and dispatch.

use chrono::NaiveTime;
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_feed::CsvFeedAdapter;
use crate::adapters::file_param_adapter::FileParameterAdapter;
use crate::adapters::jsonl_insight_adapter::{JsonlInsightSink, RecordingInsightSink};
use crate::adapters::sim_broker::SimBroker;
use crate::domain::controller::{StrategyController, StrategySettings};
use crate::domain::error::AlphacoreError;
use crate::domain::instrument::{AssetClass, Instrument, InstrumentId, TradingCalendar};
use crate::domain::order::OrderStatus;
use crate::ports::broker_port::BrokerPort;
use crate::ports::insight_port::InsightSink;

#[derive(Parser, Debug)]
#[command(name = "alphacore", about = "Signal-to-order strategy session runner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum AssetClassArg {
    Equity,
    Crypto,
    Forex,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a CSV price series through the strategy core
    Run {
        /// INI file with a [parameters] section
        #[arg(short, long)]
        params: Option<PathBuf>,
        /// CSV file with timestamp,price,volume rows
        #[arg(long)]
        prices: PathBuf,
        #[arg(short, long)]
        symbol: String,
        #[arg(long, value_enum, default_value = "crypto")]
        asset_class: AssetClassArg,
        /// Write accepted insights as JSON lines
        #[arg(long)]
        insights_out: Option<PathBuf>,
        /// Skip shutdown liquidation
        #[arg(long)]
        no_liquidate: bool,
        #[arg(long, default_value_t = 100_000.0)]
        cash: f64,
    },
    /// Resolve and print the effective parameters from a file
    Validate {
        #[arg(short, long)]
        params: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            params,
            prices,
            symbol,
            asset_class,
            insights_out,
            no_liquidate,
            cash,
        } => run_session(
            params.as_ref(),
            &prices,
            &symbol,
            asset_class,
            insights_out.as_ref(),
            no_liquidate,
            cash,
        ),
        Command::Validate { params } => run_validate(&params),
    }
}

pub fn load_settings(path: Option<&PathBuf>) -> Result<StrategySettings, AlphacoreError> {
    match path {
        Some(path) => {
            let adapter =
                FileParameterAdapter::from_file(path).map_err(|e| AlphacoreError::ConfigParse {
                    file: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            Ok(StrategySettings::from_parameters(&adapter))
        }
        None => Ok(StrategySettings::default()),
    }
}

pub fn build_instrument(symbol: &str, asset_class: AssetClassArg) -> Instrument {
    match asset_class {
        AssetClassArg::Crypto => Instrument::crypto(symbol),
        AssetClassArg::Forex => Instrument {
            id: InstrumentId::new(symbol),
            asset_class: AssetClass::Forex,
            calendar: TradingCalendar::Continuous,
        },
        AssetClassArg::Equity => Instrument::equity(
            symbol,
            NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN),
        ),
    }
}

fn run_session(
    params_path: Option<&PathBuf>,
    prices_path: &PathBuf,
    symbol: &str,
    asset_class: AssetClassArg,
    insights_out: Option<&PathBuf>,
    no_liquidate: bool,
    cash: f64,
) -> ExitCode {
    // Stage 1: Resolve parameters
    let settings = match load_settings(params_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    info!(
        "parameters: fast={} slow={} max_insights={}",
        settings.fast_period, settings.slow_period, settings.max_insights
    );

    // Stage 2: Load the price series
    let instrument = build_instrument(symbol, asset_class);
    let feed = CsvFeedAdapter::new(prices_path.clone());
    let snapshots = match feed.load(&instrument.id) {
        Ok(snapshots) => snapshots,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if snapshots.is_empty() {
        let e = AlphacoreError::PriceData {
            reason: format!("no rows in {}", prices_path.display()),
        };
        eprintln!("error: {e}");
        return (&e).into();
    }
    info!("loaded {} snapshots from {}", snapshots.len(), prices_path.display());

    // Stage 3: Wire controller, broker, insight sink
    let mut controller = StrategyController::new(settings);
    controller.register_instrument(instrument.clone());
    let mut broker = SimBroker::new(cash);

    let mut sink: Box<dyn InsightSink> = match insights_out {
        Some(path) => match File::create(path) {
            Ok(file) => Box::new(JsonlInsightSink::new(file)),
            Err(e) => {
                let e = AlphacoreError::Io(e);
                eprintln!("error: {e}");
                return (&e).into();
            }
        },
        None => Box::new(RecordingInsightSink::new()),
    };

    // Stage 4: Replay the session
    for snapshot in &snapshots {
        broker.update(snapshot);
        controller.on_snapshot(snapshot, &mut broker, sink.as_mut());
    }

    // Stage 5: Shutdown liquidation
    if !no_liquidate {
        controller.on_terminate(&mut broker);
    }

    // Stage 6: Summary
    println!("state:      {:?}", controller.state());
    println!("insights:   {}", controller.insights_emitted());
    println!(
        "orders:     {} filled, {} expired, {} cancelled, {} open",
        controller.order_count_with_status(OrderStatus::Filled),
        controller.order_count_with_status(OrderStatus::Expired),
        controller.order_count_with_status(OrderStatus::Cancelled),
        controller.order_count_with_status(OrderStatus::Active),
    );
    println!("rejected:   {}", controller.rejected_submissions());
    println!("holding:    {:+.6} {}", broker.holding(&instrument.id), instrument.id);
    println!("equity:     {:.2}", broker.equity());

    ExitCode::SUCCESS
}

fn run_validate(params_path: &PathBuf) -> ExitCode {
    let settings = match load_settings(Some(params_path)) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    println!("sma_fast:            {}", settings.fast_period);
    println!("sma_slow:            {}", settings.slow_period);
    println!("max_insights:        {}", settings.max_insights);
    println!("insight_period_days: {}", settings.insight_period.num_days());
    println!("insight_confidence:  {}", settings.insight_confidence);

    if settings.fast_period >= settings.slow_period {
        let e = AlphacoreError::ParameterInvalid {
            key: "sma_fast".into(),
            reason: format!(
                "fast period {} is not below slow period {}",
                settings.fast_period, settings.slow_period
            ),
        };
        eprintln!("error: {e}");
        return (&e).into();
    }
    ExitCode::SUCCESS
}
