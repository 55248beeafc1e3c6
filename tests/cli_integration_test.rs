//! CLI orchestration tests against real INI and CSV files on disk.

mod common;

use clap::Parser;
use common::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wftrader::adapters::csv_adapter::CsvAdapter;
use wftrader::adapters::file_config_adapter::{FileConfigAdapter, strategy_params_to_ini};
use wftrader::cli::{self, Cli, Command};
use wftrader::domain::backtest::BacktestConfig;
use wftrader::domain::config_validation::{SearchSettings, load_data_settings};
use wftrader::domain::error::WftraderError;
use wftrader::domain::evaluator::Evaluator;
use wftrader::domain::indicator::IndicatorSet;
use wftrader::domain::split::SplitRatios;
use wftrader::domain::strategy::StrategyParams;

const VALID_INI: &str = r#"
[backtest]
initial_cash = 1000000
commission = 0.00125
periods_per_year = 8760
quorum = 2
exit_boundary = inclusive

[strategy]
rsi_window = 14
macd_fast = 12
macd_slow = 26
stop_loss = 0.03
take_profit = 0.08
n_shares = 1

[walk_forward]
folds = 3

[search]
trials = 4
seed = 7

[split]
train_pct = 60
test_pct = 20
validation_pct = 20
"#;

fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn output_of<F>(f: F) -> String
where
    F: FnOnce(&mut Vec<u8>) -> Result<(), WftraderError>,
{
    let mut buf = Vec::new();
    f(&mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

fn evaluator(n: usize) -> Evaluator {
    Evaluator::new(
        bars_from_closes(&wavy_closes(n)),
        BacktestConfig::default(),
        IndicatorSet::standard(),
    )
}

mod argument_parsing {
    use super::*;

    #[test]
    fn optimize_flags_parse() {
        let cli = Cli::try_parse_from([
            "wftrader",
            "optimize",
            "--config",
            "wf.ini",
            "--symbol",
            "ETHUSDT",
            "--trials",
            "5",
            "--output",
            "best.ini",
        ])
        .unwrap();
        match cli.command {
            Command::Optimize {
                run,
                trials,
                seed,
                output,
                ..
            } => {
                assert_eq!(run.config.to_str(), Some("wf.ini"));
                assert_eq!(run.symbol.as_deref(), Some("ETHUSDT"));
                assert_eq!(trials, Some(5));
                assert_eq!(seed, None);
                assert_eq!(output.as_deref().and_then(Path::to_str), Some("best.ini"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn walk_forward_subcommand_is_kebab_case() {
        let cli =
            Cli::try_parse_from(["wftrader", "walk-forward", "-c", "wf.ini", "--folds", "4"])
                .unwrap();
        assert!(matches!(cli.command, Command::WalkForward { folds: Some(4), .. }));
    }

    #[test]
    fn config_is_required() {
        assert!(Cli::try_parse_from(["wftrader", "backtest"]).is_err());
    }
}

mod config_loading {
    use super::*;

    #[test]
    fn valid_config_passes_validation() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        assert!(cli::validate_all(&adapter, None).is_ok());
    }

    #[test]
    fn bad_split_fails_validation() {
        let ini = VALID_INI.replace("train_pct = 60", "train_pct = 90");
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        assert!(
            cli::validate_all(&adapter, None)
                .unwrap_err()
                .is_configuration_error()
        );
    }

    #[test]
    fn quorum_above_source_count_fails_validation() {
        let ini = VALID_INI.replace("quorum = 2", "quorum = 7");
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let err = cli::validate_all(&adapter, None).unwrap_err();
        assert!(matches!(
            err,
            WftraderError::ConfigInvalid { ref key, .. } if key == "quorum"
        ));
    }

    #[test]
    fn quorum_equal_to_source_count_passes_validation() {
        let ini = VALID_INI.replace("quorum = 2", "quorum = 6");
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        assert!(cli::validate_all(&adapter, None).is_ok());
    }

    #[test]
    fn params_file_overrides_config_strategy() {
        let dir = TempDir::new().unwrap();
        let best = StrategyParams {
            rsi_window: 21,
            take_profit: 0.12,
            ..StrategyParams::default()
        };
        let path = write_file(dir.path(), "best.ini", &strategy_params_to_ini(&best));

        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        assert_eq!(cli::resolve_params(&adapter, Some(&path)).unwrap(), best);
        assert_eq!(cli::resolve_params(&adapter, None).unwrap().rsi_window, 14);
    }

    #[test]
    fn missing_params_file_is_config_error() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let err = cli::resolve_params(&adapter, Some(Path::new("/nonexistent/best.ini")))
            .unwrap_err();
        assert!(matches!(err, WftraderError::ConfigParse { .. }));
    }

    #[test]
    fn config_and_csv_from_disk() {
        let dir = TempDir::new().unwrap();
        let bars = bars_from_closes(&wavy_closes(300));
        write_file(dir.path(), "BTCUSDT.csv", &csv_content(&bars));
        let ini = format!(
            "{VALID_INI}\n[data]\ndirectory = {}\nsymbol = BTCUSDT\n",
            dir.path().display()
        );
        let config_path = write_file(dir.path(), "wf.ini", &ini);

        let adapter = cli::load_config(&config_path).unwrap();
        let data = load_data_settings(&adapter, None, None).unwrap();
        let loaded = cli::fetch_bars(&CsvAdapter::new(data.directory), &data.symbol).unwrap();
        assert_eq!(loaded, bars);
    }
}

mod reports {
    use super::*;

    #[test]
    fn backtest_report_prints_metrics() {
        let e = evaluator(400);
        let out = output_of(|buf| cli::backtest_report(&e, &StrategyParams::default(), buf));
        assert!(out.contains("=== Backtest Results ==="));
        assert!(out.contains("Calmar Ratio:"));
        assert!(out.contains("Buy and Hold:"));
    }

    #[test]
    fn backtest_report_propagates_data_errors() {
        let e = evaluator(10);
        let mut buf = Vec::new();
        let err = cli::backtest_report(&e, &StrategyParams::default(), &mut buf).unwrap_err();
        assert!(err.is_data_error());
    }

    #[test]
    fn walk_forward_report_lists_folds() {
        let e = evaluator(600);
        let out =
            output_of(|buf| cli::walk_forward_report(&e, &StrategyParams::default(), 3, buf));
        assert!(out.contains("(3 folds)"));
        assert!(out.contains("fold 0:"));
        assert!(out.contains("fold 2:"));
        assert!(out.contains("Mean Calmar:"));
    }

    #[test]
    fn optimize_report_runs_every_trial() {
        let e = evaluator(600);
        let settings = SearchSettings { trials: 3, seed: 1 };
        let mut buf = Vec::new();
        let outcome = cli::optimize_report(&e, 2, settings, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();

        assert_eq!(outcome.trials.len(), 3);
        assert!(out.contains("Trials:           3"));
        if let Some(best) = &outcome.best {
            assert!(out.contains("[strategy]"));
            assert!(best.score.is_finite());
        }
    }

    #[test]
    fn replay_report_covers_each_segment() {
        let bars = bars_from_closes(&wavy_closes(500));
        let out = output_of(|buf| {
            cli::replay_report(
                &bars,
                &BacktestConfig::default(),
                &StrategyParams::default(),
                SplitRatios::default(),
                buf,
            )
        });
        assert!(out.contains("--- train (300 bars) ---"));
        assert!(out.contains("--- test (100 bars) ---"));
        assert!(out.contains("--- validation (100 bars) ---"));
        assert_eq!(out.matches("Buy and Hold:").count(), 3);
        let skipped = out.matches("skipped:").count();
        assert!(skipped < 3);
        assert_eq!(out.matches("Monthly Returns:").count(), 3 - skipped);
        assert_eq!(out.matches("Annual Returns:").count(), 3 - skipped);
        assert!(out.contains("  2024-01 "));
        assert!(out.contains("  2024-Q1 "));
    }

    #[test]
    fn replay_skips_segments_too_short_to_trade() {
        let bars = bars_from_closes(&wavy_closes(30));
        let out = output_of(|buf| {
            cli::replay_report(
                &bars,
                &BacktestConfig::default(),
                &StrategyParams::default(),
                SplitRatios::default(),
                buf,
            )
        });
        assert_eq!(out.matches("skipped:").count(), 3);
    }
}
