//! CLI definition and dispatch.
//!
//! Every subcommand loads and validates its configuration before touching
//! price data. Reports go to stdout; progress and diagnostics go through
//! `tracing`.

use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::{FileConfigAdapter, strategy_params_to_ini};
use crate::adapters::random_search::RandomSearch;
use crate::domain::backtest::BacktestConfig;
use crate::domain::config_validation::{
    SearchSettings, load_backtest_config, load_data_settings, load_search_settings,
    load_split_ratios, load_strategy_params, load_walk_forward_folds,
};
use crate::domain::error::WftraderError;
use crate::domain::evaluator::Evaluator;
use crate::domain::indicator::IndicatorSet;
use crate::domain::metrics::{
    Metrics, Period, PeriodReturn, buy_and_hold_return, period_returns,
};
use crate::domain::ohlcv::Bar;
use crate::domain::search::{ParamSpace, SearchOutcome};
use crate::domain::signal::validate_quorum;
use crate::domain::split::{SplitRatios, split_bars};
use crate::domain::strategy::StrategyParams;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::search_port::ParamSearch;

#[derive(Parser, Debug)]
#[command(name = "wftrader", about = "Walk-forward backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command that runs a strategy.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[arg(short, long)]
    pub config: PathBuf,
    /// INI file with a [strategy] section; overrides the one in --config
    #[arg(short, long)]
    pub params: Option<PathBuf>,
    /// Directory holding <SYMBOL>.csv files
    #[arg(long)]
    pub data: Option<PathBuf>,
    #[arg(long)]
    pub symbol: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one backtest over the full series
    Backtest {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Score fixed parameters over walk-forward folds
    WalkForward {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long)]
        folds: Option<usize>,
    },
    /// Random search for parameters maximizing the walk-forward score
    Optimize {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long)]
        folds: Option<usize>,
        #[arg(long)]
        trials: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        /// Write the best parameters as a [strategy] INI file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replay fixed parameters on train/test/validation segments
    Replay {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Validate a configuration file without running anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        params: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let mut out = io::stdout().lock();
    let outcome = match cli.command {
        Command::Backtest { run } => run_backtest(&run, &mut out),
        Command::WalkForward { run, folds } => run_walk_forward(&run, folds, &mut out),
        Command::Optimize {
            run,
            folds,
            trials,
            seed,
            output,
        } => run_optimize(&run, folds, trials, seed, output.as_deref(), &mut out),
        Command::Replay { run } => run_replay(&run, &mut out),
        Command::Validate { config, params } => run_validate(&config, params.as_deref(), &mut out),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::from(&e)
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, WftraderError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

/// Strategy parameters from `params_path` when given, else from `config`.
pub fn resolve_params(
    config: &dyn ConfigPort,
    params_path: Option<&Path>,
) -> Result<StrategyParams, WftraderError> {
    match params_path {
        Some(path) => {
            info!(path = %path.display(), "loading strategy parameters");
            load_strategy_params(&load_config(path)?)
        }
        None => load_strategy_params(config),
    }
}

/// Everything a run needs, validated and loaded.
struct Session {
    adapter: FileConfigAdapter,
    config: BacktestConfig,
    params: StrategyParams,
    bars: Vec<Bar>,
}

impl Session {
    fn evaluator(&self) -> Evaluator {
        Evaluator::new(
            self.bars.clone(),
            self.config.clone(),
            IndicatorSet::standard(),
        )
    }
}

fn load_session(run: &RunArgs) -> Result<Session, WftraderError> {
    let adapter = load_config(&run.config)?;
    let config = load_backtest_config(&adapter)?;
    validate_quorum(config.quorum, IndicatorSet::standard().len())?;
    let params = resolve_params(&adapter, run.params.as_deref())?;
    let data = load_data_settings(&adapter, run.data.clone(), run.symbol.clone())?;

    let data_port = CsvAdapter::new(data.directory);
    let bars = fetch_bars(&data_port, &data.symbol)?;
    Ok(Session {
        adapter,
        config,
        params,
        bars,
    })
}

pub fn fetch_bars(data_port: &dyn DataPort, symbol: &str) -> Result<Vec<Bar>, WftraderError> {
    let bars = data_port.fetch_bars(symbol)?;
    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        info!(
            symbol,
            bars = bars.len(),
            from = %first.timestamp,
            to = %last.timestamp,
            "loaded bars"
        );
    }
    Ok(bars)
}

fn run_backtest(run: &RunArgs, out: &mut dyn Write) -> Result<(), WftraderError> {
    let session = load_session(run)?;
    backtest_report(&session.evaluator(), &session.params, out)
}

fn run_walk_forward(
    run: &RunArgs,
    folds: Option<usize>,
    out: &mut dyn Write,
) -> Result<(), WftraderError> {
    let session = load_session(run)?;
    let folds = resolve_folds(&session.adapter, folds)?;
    walk_forward_report(&session.evaluator(), &session.params, folds, out)
}

fn run_optimize(
    run: &RunArgs,
    folds: Option<usize>,
    trials: Option<usize>,
    seed: Option<u64>,
    output: Option<&Path>,
    out: &mut dyn Write,
) -> Result<(), WftraderError> {
    let session = load_session(run)?;
    let folds = resolve_folds(&session.adapter, folds)?;
    let file_settings = load_search_settings(&session.adapter)?;
    let settings = SearchSettings {
        trials: trials.unwrap_or(file_settings.trials),
        seed: seed.unwrap_or(file_settings.seed),
    };

    let outcome = optimize_report(&session.evaluator(), folds, settings, out)?;
    if let (Some(path), Some(best)) = (output, &outcome.best) {
        fs::write(path, strategy_params_to_ini(&best.params))?;
        info!(path = %path.display(), "best parameters written");
    }
    Ok(())
}

fn run_replay(run: &RunArgs, out: &mut dyn Write) -> Result<(), WftraderError> {
    let session = load_session(run)?;
    let ratios = load_split_ratios(&session.adapter)?;
    replay_report(&session.bars, &session.config, &session.params, ratios, out)
}

fn run_validate(
    config_path: &Path,
    params_path: Option<&Path>,
    out: &mut dyn Write,
) -> Result<(), WftraderError> {
    let adapter = load_config(config_path)?;
    validate_all(&adapter, params_path)?;
    writeln!(out, "Configuration OK: {}", config_path.display())?;
    Ok(())
}

/// Every section a run reads, checked without loading data.
pub fn validate_all(
    adapter: &dyn ConfigPort,
    params_path: Option<&Path>,
) -> Result<(), WftraderError> {
    let config = load_backtest_config(adapter)?;
    let sources = IndicatorSet::standard();
    validate_quorum(config.quorum, sources.len())?;
    let params = resolve_params(adapter, params_path)?;
    load_walk_forward_folds(adapter)?;
    load_search_settings(adapter)?;
    split_bars(&[], load_split_ratios(adapter)?)?;

    let warmup = sources.warmup(&params);
    info!(quorum = config.quorum, warmup, "configuration valid");
    Ok(())
}

fn resolve_folds(adapter: &dyn ConfigPort, folds: Option<usize>) -> Result<usize, WftraderError> {
    match folds {
        Some(0) => Err(WftraderError::config_invalid(
            "walk_forward",
            "folds",
            "must be at least 1",
        )),
        Some(n) => Ok(n),
        None => load_walk_forward_folds(adapter),
    }
}

fn write_period_returns(
    out: &mut dyn Write,
    title: &str,
    rows: &[PeriodReturn],
) -> io::Result<()> {
    writeln!(out, "{title}")?;
    for row in rows {
        writeln!(out, "  {:<10} {:>+8.2}%", row.to_string(), row.value * 100.0)?;
    }
    Ok(())
}

fn write_metrics(out: &mut dyn Write, m: &Metrics) -> io::Result<()> {
    writeln!(out, "Final Value:      {:.2}", m.final_value)?;
    writeln!(out, "Total Return:     {:.2}%", m.total_return * 100.0)?;
    writeln!(out, "Annualized:       {:.2}%", m.annualized_return * 100.0)?;
    writeln!(out, "Sharpe Ratio:     {:.2}", m.sharpe_ratio)?;
    writeln!(out, "Sortino Ratio:    {:.2}", m.sortino_ratio)?;
    writeln!(out, "Calmar Ratio:     {:.2}", m.calmar_ratio)?;
    writeln!(out, "Max Drawdown:     -{:.1}%", m.max_drawdown * 100.0)?;
    writeln!(out, "Win Rate:         {:.1}%", m.win_rate * 100.0)?;
    writeln!(out, "Total Trades:     {}", m.total_trades)
}

pub fn backtest_report(
    evaluator: &Evaluator,
    params: &StrategyParams,
    out: &mut dyn Write,
) -> Result<(), WftraderError> {
    info!(bars = evaluator.bars().len(), "running backtest");
    let report = evaluator.run(params)?;

    writeln!(out, "=== Backtest Results ===")?;
    write_metrics(out, &report.metrics)?;
    writeln!(out, "Lowest Cash:      {:.2}", report.result.min_cash)?;
    writeln!(
        out,
        "Buy and Hold:     {:.2}%",
        buy_and_hold_return(evaluator.bars()) * 100.0
    )?;
    Ok(())
}

pub fn walk_forward_report(
    evaluator: &Evaluator,
    params: &StrategyParams,
    folds: usize,
    out: &mut dyn Write,
) -> Result<(), WftraderError> {
    info!(folds, bars = evaluator.bars().len(), "running walk-forward");
    let result = evaluator.walk_forward(params, folds)?;
    let bars = evaluator.bars();

    writeln!(out, "=== Walk-Forward Results ({folds} folds) ===")?;
    for score in &result.scores {
        let test = &score.fold.test;
        writeln!(
            out,
            "  fold {}: {} to {} ({} bars)  calmar {:.3}  return {:.2}%  trades {}",
            score.fold.index,
            bars[test.start].timestamp,
            bars[test.end - 1].timestamp,
            test.len(),
            score.calmar,
            score.metrics.total_return * 100.0,
            score.metrics.total_trades,
        )?;
    }
    for failure in &result.failures {
        writeln!(out, "  fold {}: failed ({})", failure.fold.index, failure.error)?;
    }
    writeln!(out, "Mean Calmar:      {:.3}", result.mean_score())?;
    Ok(())
}

pub fn optimize_report(
    evaluator: &Evaluator,
    folds: usize,
    settings: SearchSettings,
    out: &mut dyn Write,
) -> Result<SearchOutcome, WftraderError> {
    info!(
        trials = settings.trials,
        seed = settings.seed,
        folds,
        "starting random search"
    );
    let search = RandomSearch::new(ParamSpace::default(), settings.trials, settings.seed);
    let outcome = search.optimize(&|params| evaluator.evaluate_walk_forward(params, folds))?;

    writeln!(out, "=== Search Results ===")?;
    writeln!(
        out,
        "Trials:           {} ({} failed)",
        outcome.trials.len(),
        outcome.failed_count()
    )?;
    match &outcome.best {
        Some(best) => {
            writeln!(out, "Best Trial:       {}", best.number)?;
            writeln!(out, "Best Score:       {:.3}", best.score)?;
            writeln!(out)?;
            write!(out, "{}", strategy_params_to_ini(&best.params))?;
        }
        None => {
            warn!("every trial failed; no parameters to report");
            writeln!(out, "Best Trial:       none")?;
        }
    }
    Ok(outcome)
}

/// Run `params` separately on each split segment next to buy-and-hold.
/// A segment too short to trade is reported and skipped.
pub fn replay_report(
    bars: &[Bar],
    config: &BacktestConfig,
    params: &StrategyParams,
    ratios: SplitRatios,
    out: &mut dyn Write,
) -> Result<(), WftraderError> {
    let split = split_bars(bars, ratios)?;
    writeln!(out, "=== Replay ===")?;
    for (name, segment) in [
        ("train", split.train),
        ("test", split.test),
        ("validation", split.validation),
    ] {
        writeln!(out, "--- {name} ({} bars) ---", segment.len())?;
        let evaluator = Evaluator::new(segment.to_vec(), config.clone(), IndicatorSet::standard());
        match evaluator.run(params) {
            Ok(report) => {
                write_metrics(out, &report.metrics)?;
                for (title, period) in [
                    ("Monthly Returns:", Period::Month),
                    ("Quarterly Returns:", Period::Quarter),
                    ("Annual Returns:", Period::Year),
                ] {
                    let rows =
                        period_returns(&report.result.timestamps, &report.result.values, period);
                    write_period_returns(out, title, &rows)?;
                }
            }
            Err(e) if e.is_data_error() => {
                warn!(segment = name, error = %e, "segment skipped");
                writeln!(out, "skipped: {e}")?;
            }
            Err(e) => return Err(e),
        }
        writeln!(
            out,
            "Buy and Hold:     {:.2}%",
            buy_and_hold_return(segment) * 100.0
        )?;
    }
    Ok(())
}
