//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::adapters::strategy_file::{load_strategies, load_strategy, strategy_from_config};
use crate::domain::backtest::{
    self as backtest_engine, BacktestConfig, BacktestResult, DEFAULT_INITIAL_CAPITAL,
};
use crate::domain::config_validation::{
    get_optional_double, validate_backtest_config, validate_strategy_config,
};
use crate::domain::error::{ForgeError, RuleKind};
use crate::domain::rule_parser;
use crate::domain::signal::check_signal;
use crate::domain::strategy::{Strategy, StrategyConfig};
use crate::domain::sweep::run_sweep;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "ruleforge", about = "Rule-based strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Bar file (CSV)
        #[arg(short, long)]
        data: PathBuf,
        /// Strategy file (INI or JSON); defaults to the config's [strategy]
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a strategy configuration
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// Evaluate a strategy against the latest bar
    Signal {
        #[arg(short, long)]
        strategy: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
    },
    /// Run many strategies over the same bars in parallel
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        /// JSON document holding an array of strategies
        #[arg(long)]
        strategies: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            strategy,
            output,
        } => run_backtest(&config, &data, strategy.as_ref(), output.as_ref()),
        Command::Validate { strategy } => run_validate(&strategy),
        Command::Signal { strategy, data } => run_signal(&strategy, &data),
        Command::Sweep {
            config,
            data,
            strategies,
            output,
        } => run_sweep_command(&config, &data, &strategies, output.as_ref()),
    }
}

/// Print `err` and map it to its exit code. Rule errors get a caret under
/// the offending character.
pub fn report_error(err: &ForgeError) -> ExitCode {
    match err {
        ForgeError::RuleParse {
            kind,
            index,
            rule,
            source,
        } => eprintln!(
            "error: failed to parse {kind} rule #{index}:\n{}",
            source.display_with_context(rule)
        ),
        _ => eprintln!("error: {err}"),
    }
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| report_error(&e))
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, ForgeError> {
    validate_backtest_config(adapter)?;
    Ok(BacktestConfig {
        initial_capital: adapter.get_double(
            "backtest",
            "initial_capital",
            DEFAULT_INITIAL_CAPITAL,
        ),
        commission: get_optional_double(adapter, "backtest", "commission")?,
        slippage: get_optional_double(adapter, "backtest", "slippage")?,
    })
}

/// Optional `[backtest] start_date` / `end_date` bounds.
pub fn build_date_range(
    adapter: &dyn ConfigPort,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), ForgeError> {
    let parse = |key: &str| -> Result<Option<NaiveDate>, ForgeError> {
        match adapter.get_string("backtest", key) {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(Some)
                .map_err(|_| ForgeError::ConfigInvalid {
                    section: "backtest".into(),
                    key: key.into(),
                    reason: "invalid date format (expected YYYY-MM-DD)".into(),
                }),
        }
    };
    let (start, end) = (parse("start_date")?, parse("end_date")?);
    if start.zip(end).is_some_and(|(s, e)| s > e) {
        return Err(ForgeError::ConfigInvalid {
            section: "backtest".into(),
            key: "end_date".into(),
            reason: "end_date is before start_date".into(),
        });
    }
    Ok((start, end))
}

/// Strategy from `--strategy` when given, otherwise the config's own
/// `[strategy]` section.
pub fn resolve_strategy_config(
    adapter: &dyn ConfigPort,
    strategy_path: Option<&PathBuf>,
) -> Result<StrategyConfig, ForgeError> {
    match strategy_path {
        Some(path) => {
            eprintln!("Loading strategy from {}", path.display());
            load_strategy(path)
        }
        None => {
            validate_strategy_config(adapter)?;
            strategy_from_config(adapter)
        }
    }
}

/// Split a bar file path into a CSV data port over its directory and the
/// symbol it serves.
pub fn open_data(path: &Path) -> Result<(CsvAdapter, String), ForgeError> {
    let symbol = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| ForgeError::Data {
            reason: format!("not a bar file: {}", path.display()),
        })?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((CsvAdapter::new(dir), symbol))
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    symbol: &str,
    date_range: (Option<NaiveDate>, Option<NaiveDate>),
    strategy: &Strategy,
    bt_config: &BacktestConfig,
) -> Result<BacktestResult, ForgeError> {
    let (start, end) = date_range;
    let bars = data_port.fetch_bars(symbol, start, end)?;
    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        eprintln!(
            "Running backtest: {} ({} bars, {} to {})",
            symbol,
            bars.len(),
            first.date,
            last.date
        );
    }
    backtest_engine::run_backtest(strategy, &bars, bt_config)
}

pub fn print_summary(strategy: &Strategy, result: &BacktestResult) {
    let m = &result.metrics;
    eprintln!("\n=== {} ===", strategy.name);
    eprintln!("Total Return:     {:.2}%", m.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", m.annual_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    eprintln!("Max Drawdown:     {:.1}%", m.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", m.total_trades);
    eprintln!("Win Rate:         {:.1}%", m.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", m.profit_factor);
    eprintln!("Avg Trade:        {:.2}", m.avg_trade);
    eprintln!("Final Equity:     {:.2}", m.final_equity);
    if let Some(pos) = &result.open_position {
        eprintln!(
            "Open Position:    {} shares @ {:.2} since {}",
            pos.shares, pos.entry_price, pos.entry_date
        );
    }
}

fn run_backtest(
    config_path: &Path,
    data_path: &Path,
    strategy_path: Option<&PathBuf>,
    output_path: Option<&PathBuf>,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Run parameters
    let (bt_config, date_range) =
        match build_backtest_config(&adapter).and_then(|c| Ok((c, build_date_range(&adapter)?))) {
            Ok(v) => v,
            Err(e) => return report_error(&e),
        };

    // Stage 3: Strategy
    let strategy = match resolve_strategy_config(&adapter, strategy_path)
        .and_then(|c| Strategy::new(&c))
    {
        Ok(s) => s,
        Err(e) => return report_error(&e),
    };
    eprintln!("Loaded strategy: {}", strategy.name);

    // Stage 4: Data and replay
    let result = match open_data(data_path).and_then(|(port, symbol)| {
        run_backtest_pipeline(&port, &symbol, date_range, &strategy, &bt_config)
    }) {
        Ok(r) => r,
        Err(e) => return report_error(&e),
    };

    // Stage 5: Summary and report
    print_summary(&strategy, &result);

    let reporter = JsonReportAdapter::new(adapter.get_bool("report", "pretty", false));
    let written = match output_path {
        Some(path) => reporter
            .write(&result, &strategy, &path.to_string_lossy())
            .map(|_| eprintln!("\nReport written to: {}", path.display())),
        None => reporter.render(&result, &strategy).map(|json| println!("{json}")),
    };
    match written {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_error(&e),
    }
}

fn run_validate(strategy_path: &Path) -> ExitCode {
    eprintln!("Validating strategy: {}", strategy_path.display());
    match validate_strategy_file(strategy_path, &mut std::io::stderr()) {
        Ok(()) => {
            eprintln!("\nStrategy configuration is valid.");
            ExitCode::SUCCESS
        }
        Err(e @ ForgeError::RuleParse { .. }) => {
            eprintln!("\nerror: {e}");
            (&e).into()
        }
        Err(e) => report_error(&e),
    }
}

/// Writes every rule of every strategy in `path` to `out`, either in
/// canonical form or with a caret under the parse error. All rules are
/// listed before the first rule error is returned.
pub fn validate_strategy_file(path: &Path, out: &mut dyn Write) -> Result<(), ForgeError> {
    let configs = load_strategies(path)?;

    let mut first_error: Option<ForgeError> = None;
    for sc in &configs {
        writeln!(out, "\nStrategy: {}", sc.name)?;
        for (kind, rules) in [
            (RuleKind::Entry, &sc.entry_rules),
            (RuleKind::Exit, &sc.exit_rules),
        ] {
            for (index, raw) in rules.iter().enumerate() {
                writeln!(out, "{kind} rule #{index}:")?;
                match rule_parser::parse(raw) {
                    Ok(expr) => {
                        writeln!(out, "  Parsed: {expr}")?;
                        writeln!(out, "  Raw:    {raw}")?;
                    }
                    Err(source) => {
                        writeln!(out, "  error:\n{}", source.display_with_context(raw))?;
                        if first_error.is_none() {
                            first_error = Some(ForgeError::RuleParse {
                                kind,
                                index,
                                rule: raw.clone(),
                                source,
                            });
                        }
                    }
                }
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    for sc in &configs {
        Strategy::new(sc)?;
    }
    Ok(())
}

fn run_signal(strategy_path: &Path, data_path: &Path) -> ExitCode {
    match signal_json(strategy_path, data_path) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

/// Pretty JSON signal check of the strategy in `strategy_path` against the
/// latest bars in `data_path`.
pub fn signal_json(strategy_path: &Path, data_path: &Path) -> Result<String, ForgeError> {
    let strategy = Strategy::new(&load_strategy(strategy_path)?)?;
    let (port, symbol) = open_data(data_path)?;
    let bars = port.fetch_bars(&symbol, None, None)?;
    let check = check_signal(&strategy, &bars)?;
    serde_json::to_string_pretty(&check).map_err(|e| ForgeError::Data {
        reason: format!("failed to serialize signal: {e}"),
    })
}

fn run_sweep_command(
    config_path: &Path,
    data_path: &Path,
    strategies_path: &Path,
    output_path: Option<&PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let (bt_config, date_range) =
        match build_backtest_config(&adapter).and_then(|c| Ok((c, build_date_range(&adapter)?))) {
            Ok(v) => v,
            Err(e) => return report_error(&e),
        };

    let strategies = match load_strategies(strategies_path).and_then(|configs| {
        configs
            .iter()
            .map(Strategy::new)
            .collect::<Result<Vec<_>, _>>()
    }) {
        Ok(s) => s,
        Err(e) => return report_error(&e),
    };

    let bars = match open_data(data_path)
        .and_then(|(port, symbol)| port.fetch_bars(&symbol, date_range.0, date_range.1))
    {
        Ok(b) => b,
        Err(e) => return report_error(&e),
    };

    let pool = match build_thread_pool(&adapter) {
        Ok(p) => p,
        Err(e) => return report_error(&e),
    };
    info!(
        strategies = strategies.len(),
        threads = pool.current_num_threads(),
        "starting sweep"
    );
    let results = pool.install(|| run_sweep(&strategies, &bars, &bt_config));

    eprintln!(
        "\n{:<24} {:>10} {:>8} {:>8} {:>7}",
        "Strategy", "Return", "Sharpe", "MaxDD", "Trades"
    );
    let mut first_error: Option<ForgeError> = None;
    let mut completed = Vec::with_capacity(results.len());
    for (strategy, result) in strategies.iter().zip(results) {
        match result {
            Ok(r) => {
                eprintln!(
                    "{:<24} {:>9.2}% {:>8.2} {:>7.1}% {:>7}",
                    strategy.name,
                    r.metrics.total_return * 100.0,
                    r.metrics.sharpe_ratio,
                    r.metrics.max_drawdown * 100.0,
                    r.metrics.total_trades
                );
                completed.push((strategy, r));
            }
            Err(e) => {
                eprintln!("{:<24} error: {e}", strategy.name);
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(path) = output_path {
        let reporter = JsonReportAdapter::new(adapter.get_bool("report", "pretty", false));
        let refs: Vec<(&Strategy, &BacktestResult)> =
            completed.iter().map(|(s, r)| (*s, r)).collect();
        if let Err(e) = reporter.write_sweep(&refs, &path.to_string_lossy()) {
            return report_error(&e);
        }
        eprintln!("\nReports written to: {}.N", path.display());
    }

    match first_error {
        Some(e) => (&e).into(),
        None => ExitCode::SUCCESS,
    }
}

/// Worker pool sized by `[sweep] threads`; 0 or absent uses rayon's default.
pub fn build_thread_pool(adapter: &dyn ConfigPort) -> Result<rayon::ThreadPool, ForgeError> {
    let threads = adapter.get_int("sweep", "threads", 0);
    let threads = usize::try_from(threads).map_err(|_| ForgeError::ConfigInvalid {
        section: "sweep".into(),
        key: "threads".into(),
        reason: "threads must be non-negative".into(),
    })?;
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| ForgeError::ConfigInvalid {
            section: "sweep".into(),
            key: "threads".into(),
            reason: e.to_string(),
        })
}
