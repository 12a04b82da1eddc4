//! BlockFlow CLI — catalog, compile, validate and simulate strategy graphs.
//!
//! Commands:
//! - `catalog` — list registered block types
//! - `compile` / `decompile` — convert between editor form and interchange form
//! - `validate` — static analysis; exits with status 1 when the graph is invalid
//! - `backtest` — one simulation run, with optional CSV and artifact output
//! - `monte-carlo` — N runs under resampled market regimes
//! - `sandbox` — validation plus a short synthetic dry run
//! - `estimate` — expected return band over a horizon

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use blockflow_core::catalog::BlockCatalog;
use blockflow_core::compiler::GraphCompiler;
use blockflow_core::domain::{BlockCategory, Strategy};
use blockflow_core::validator::{GraphValidator, ValidationResult};
use blockflow_runner::{
    export_equity_csv, export_trades_csv, save_artifacts, BacktestCache, BacktestResult,
    BlockflowConfig, CsvPriceProvider, MonteCarloResult, PerformanceEstimate, PriceMode,
    SandboxReport, Simulator,
};

/// Longest horizon `estimate` accepts, about ten years.
const MAX_HORIZON_DAYS: u32 = 3_650;

#[derive(Parser)]
#[command(
    name = "blockflow",
    about = "BlockFlow CLI — visual strategy graphs: validation and simulation"
)]
struct Cli {
    /// Print machine-readable JSON instead of a human summary.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered block types.
    Catalog {
        /// Only show one category: trigger, condition, action, risk, capital, utility.
        #[arg(long)]
        category: Option<String>,
    },
    /// Compile an editor-form strategy into the interchange form.
    Compile {
        strategy: PathBuf,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rebuild an editor-form strategy from the interchange form.
    Decompile {
        compiled: PathBuf,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Statically validate a strategy graph.
    Validate {
        strategy: PathBuf,

        /// TOML file with [simulation] and [validator] tables.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Treat warnings as failures.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Run one backtest over the configured period.
    Backtest {
        strategy: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the equity/drawdown curve as CSV.
        #[arg(long)]
        equity_csv: Option<PathBuf>,

        /// Write the trade tape as CSV.
        #[arg(long)]
        trades_csv: Option<PathBuf>,

        /// Directory of `<TOKEN>.csv` price files; switches to historical mode.
        #[arg(long)]
        prices_dir: Option<PathBuf>,

        /// Save result.json, trades.csv and equity.csv under this directory.
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },
    /// Run a Monte Carlo simulation under resampled market regimes.
    MonteCarlo {
        strategy: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of runs.
        #[arg(long, default_value_t = 100)]
        runs: usize,
    },
    /// Validate and dry-run a strategy on synthetic prices.
    Sandbox {
        strategy: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Estimate returns over a horizon.
    Estimate {
        strategy: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, default_value_t = 30)]
        horizon_days: u32,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let json = cli.json;

    match cli.command {
        Commands::Catalog { category } => run_catalog(category.as_deref(), json),
        Commands::Compile { strategy, output } => run_compile(&strategy, output.as_deref()),
        Commands::Decompile { compiled, output } => run_decompile(&compiled, output.as_deref()),
        Commands::Validate {
            strategy,
            config,
            strict,
        } => run_validate(&strategy, config.as_deref(), strict, json),
        Commands::Backtest {
            strategy,
            config,
            equity_csv,
            trades_csv,
            prices_dir,
            artifacts,
        } => run_backtest_cmd(
            &strategy,
            config.as_deref(),
            BacktestOutputs {
                equity_csv,
                trades_csv,
                prices_dir,
                artifacts,
            },
            json,
        ),
        Commands::MonteCarlo {
            strategy,
            config,
            runs,
        } => run_monte_carlo_cmd(&strategy, config.as_deref(), runs, json),
        Commands::Sandbox { strategy, config } => {
            run_sandbox_cmd(&strategy, config.as_deref(), json)
        }
        Commands::Estimate {
            strategy,
            config,
            horizon_days,
        } => run_estimate_cmd(&strategy, config.as_deref(), horizon_days, json),
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("blockflow=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ─── Loading ────────────────────────────────────────────────────────

fn catalog() -> Arc<BlockCatalog> {
    Arc::new(BlockCatalog::with_defaults())
}

fn load_strategy(path: &Path) -> Result<Strategy> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read strategy: {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("failed to parse strategy: {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<BlockflowConfig> {
    match path {
        Some(path) => BlockflowConfig::from_file(path)
            .with_context(|| format!("failed to load config: {}", path.display())),
        None => Ok(BlockflowConfig::default()),
    }
}

fn simulator(config: &BlockflowConfig) -> Simulator {
    Simulator::new(catalog())
        .with_cache(BacktestCache::default())
        .with_validator_config(config.validator.clone())
}

fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{text}");
    Ok(())
}

// ─── Graph commands ─────────────────────────────────────────────────

fn run_catalog(category: Option<&str>, json: bool) -> Result<()> {
    let catalog = catalog();
    let definitions: Vec<_> = match category {
        Some(name) => {
            let Some(category) = BlockCategory::parse(name) else {
                bail!(
                    "unknown category '{name}'. Valid: trigger, condition, action, risk, capital, utility"
                );
            };
            catalog.by_category(category)
        }
        None => catalog.definitions().iter().collect(),
    };

    if json {
        return print_json(&definitions);
    }

    println!("{:<20} {:<10} {:<24} Ports (in -> out)", "Type", "Category", "Name");
    println!("{}", "-".repeat(80));
    for def in definitions {
        let inputs: Vec<&str> = def.inputs.iter().map(|p| p.id.as_str()).collect();
        let outputs: Vec<&str> = def.outputs.iter().map(|p| p.id.as_str()).collect();
        println!(
            "{:<20} {:<10} {:<24} [{}] -> [{}]",
            def.block_type,
            def.category.as_str(),
            def.name,
            inputs.join(", "),
            outputs.join(", ")
        );
    }
    Ok(())
}

fn run_compile(strategy_path: &Path, output: Option<&Path>) -> Result<()> {
    let strategy = load_strategy(strategy_path)?;
    let compiler = GraphCompiler::new(catalog());
    let compiled = compiler.compile(&strategy);
    let text = compiler
        .to_json(&compiled)
        .context("failed to serialize compiled strategy")?;
    write_output(&text, output)
}

fn run_decompile(compiled_path: &Path, output: Option<&Path>) -> Result<()> {
    let json = std::fs::read_to_string(compiled_path)
        .with_context(|| format!("failed to read {}", compiled_path.display()))?;
    let compiler = GraphCompiler::new(catalog());
    let compiled = compiler
        .from_json(&json)
        .with_context(|| format!("failed to parse {}", compiled_path.display()))?;
    if !compiler.verify_hash(&compiled) {
        tracing::warn!(strategy = %compiled.id, "content hash does not match graph");
    }
    let strategy = compiler.decompile(&compiled);
    let text = serde_json::to_string_pretty(&strategy).context("failed to serialize strategy")?;
    write_output(&text, output)
}

fn run_validate(
    strategy_path: &Path,
    config_path: Option<&Path>,
    strict: bool,
    json: bool,
) -> Result<()> {
    let strategy = load_strategy(strategy_path)?;
    let mut config = load_config(config_path)?;
    config.validator.strict |= strict;

    let result = GraphValidator::new(catalog(), config.validator).validate(&strategy);
    if json {
        print_json(&result)?;
    } else {
        print_validation(&strategy, &result);
    }
    if !result.valid {
        std::process::exit(1);
    }
    Ok(())
}

// ─── Simulation commands ────────────────────────────────────────────

struct BacktestOutputs {
    equity_csv: Option<PathBuf>,
    trades_csv: Option<PathBuf>,
    prices_dir: Option<PathBuf>,
    artifacts: Option<PathBuf>,
}

fn run_backtest_cmd(
    strategy_path: &Path,
    config_path: Option<&Path>,
    outputs: BacktestOutputs,
    json: bool,
) -> Result<()> {
    let strategy = load_strategy(strategy_path)?;
    let mut config = load_config(config_path)?;

    let mut sim = simulator(&config);
    if let Some(dir) = &outputs.prices_dir {
        config.simulation.mode = PriceMode::Historical;
        sim = sim.with_provider(Arc::new(CsvPriceProvider::new(dir)));
    }

    let result = sim
        .run_backtest(&strategy, &config.simulation)
        .with_context(|| format!("backtest failed for '{}'", strategy.id))?;

    if let Some(path) = &outputs.equity_csv {
        let csv = export_equity_csv(&result.equity_curve, &result.drawdown_curve)?;
        std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))?;
    }
    if let Some(path) = &outputs.trades_csv {
        let csv = export_trades_csv(&result.trades)?;
        std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))?;
    }

    if json {
        print_json(&result)?;
    } else {
        print_backtest(&result);
    }

    if let Some(dir) = &outputs.artifacts {
        let run_dir = save_artifacts(&result, dir)?;
        eprintln!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn run_monte_carlo_cmd(
    strategy_path: &Path,
    config_path: Option<&Path>,
    runs: usize,
    json: bool,
) -> Result<()> {
    let strategy = load_strategy(strategy_path)?;
    let config = load_config(config_path)?;
    let result = simulator(&config)
        .run_monte_carlo(&strategy, &config.simulation, runs)
        .with_context(|| format!("monte carlo failed for '{}'", strategy.id))?;

    if json {
        print_json(&result)
    } else {
        print_monte_carlo(&result);
        Ok(())
    }
}

fn run_sandbox_cmd(strategy_path: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    let strategy = load_strategy(strategy_path)?;
    let config = load_config(config_path)?;
    let report = simulator(&config)
        .run_sandbox(&strategy, &config.simulation)
        .with_context(|| format!("sandbox failed for '{}'", strategy.id))?;

    if json {
        print_json(&report)?;
    } else {
        print_sandbox(&strategy, &report);
    }
    if !report.passed {
        std::process::exit(1);
    }
    Ok(())
}

fn run_estimate_cmd(
    strategy_path: &Path,
    config_path: Option<&Path>,
    horizon_days: u32,
    json: bool,
) -> Result<()> {
    if !(1..=MAX_HORIZON_DAYS).contains(&horizon_days) {
        bail!("--horizon-days must be between 1 and {MAX_HORIZON_DAYS}");
    }
    let strategy = load_strategy(strategy_path)?;
    let config = load_config(config_path)?;
    let estimate = simulator(&config)
        .estimate_performance(&strategy, &config.simulation, horizon_days)
        .with_context(|| format!("estimate failed for '{}'", strategy.id))?;

    if json {
        print_json(&estimate)
    } else {
        print_estimate(&estimate);
        Ok(())
    }
}

// ─── Human summaries ────────────────────────────────────────────────

fn print_validation(strategy: &Strategy, result: &ValidationResult) {
    println!();
    println!("=== Validation: {} ===", strategy.name);
    println!("Valid:          {}", if result.valid { "yes" } else { "NO" });
    println!("Risk score:     {}/100", result.risk_score);
    println!("Gas estimate:   {}", result.gas_estimate);
    for (label, findings) in [
        ("Errors", &result.errors),
        ("Warnings", &result.warnings),
        ("Info", &result.info),
    ] {
        if findings.is_empty() {
            continue;
        }
        println!();
        println!("--- {label} ({}) ---", findings.len());
        for f in findings {
            match &f.block_id {
                Some(block) => println!("  [{:?}] {} ({block})", f.code, f.message),
                None => println!("  [{:?}] {}", f.code, f.message),
            }
        }
    }
    println!();
    println!("--- Security checklist ---");
    for check in &result.security_checks {
        let mark = if check.passed { "PASS" } else { "FAIL" };
        println!("  {mark}  {:<24} {}", check.name, check.message);
    }
    println!();
}

fn print_backtest(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Strategy:       {} (v{})", result.strategy_id, result.strategy_version);
    println!(
        "Period:         {} to {}",
        result.period_start.to_rfc3339(),
        result.period_end.to_rfc3339()
    );
    println!("Ticks:          {}", result.equity_curve.len());
    println!("Trigger fires:  {}", result.trigger_firings);
    println!("Trades:         {}", m.total_trades);
    println!();
    println!("--- Performance ---");
    println!("Initial:        {:.2}", result.initial_capital);
    println!("Final equity:   {:.2}", result.final_equity);
    println!("Total Return:   {:.2}%", m.total_return);
    println!("Annualized:     {:.2}%", m.annualized_return);
    println!("Volatility:     {:.4}", m.volatility);
    println!("Sharpe:         {:.3}", m.sharpe_ratio);
    println!("Sortino:        {:.3}", m.sortino_ratio);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    if m.profit_factor.is_infinite() {
        println!("Profit Factor:  inf");
    } else {
        println!("Profit Factor:  {:.2}", m.profit_factor);
    }
    println!("Gas spent:      {:.4}", result.gas_spent);
    if let Some(reason) = &result.terminated {
        println!();
        println!("WARNING: run terminated early ({reason:?})");
    }
    for token in &result.fallback_tokens {
        println!("WARNING: {token} priced from fallback");
    }
    println!();
}

fn print_monte_carlo(result: &MonteCarloResult) {
    println!();
    println!("=== Monte Carlo ({} runs) ===", result.runs);
    println!("Median return:  {:.2}%", result.median_return);
    println!("Mean return:    {:.2}%", result.mean_return);
    println!(
        "P5 / P95:       {:.2}% / {:.2}%",
        result.percentile5_return, result.percentile95_return
    );
    println!("Median DD:      {:.2}%", result.median_drawdown);
    println!("Worst DD:       {:.2}%", result.max_drawdown);
    println!("Mean Sharpe:    {:.3}", result.mean_sharpe);
    println!();
}

fn print_sandbox(strategy: &Strategy, report: &SandboxReport) {
    println!();
    println!("=== Sandbox: {} ({}h) ===", strategy.name, report.hours);
    println!("Passed:         {}", if report.passed { "yes" } else { "NO" });
    println!("Valid graph:    {}", report.validation.valid);
    println!("Trades:         {}", report.backtest.trades.len());
    println!("Final equity:   {:.2}", report.backtest.final_equity);
    for issue in &report.issues {
        println!("ISSUE: {issue}");
    }
    println!();
}

fn print_estimate(estimate: &PerformanceEstimate) {
    println!();
    println!("=== Estimate ({} days) ===", estimate.horizon_days);
    println!("Expected:       {:.2}%", estimate.expected_return);
    println!("Best case:      {:.2}%", estimate.best_case);
    println!("Worst case:     {:.2}%", estimate.worst_case);
    println!("Baseline Sharpe:{:.3}", estimate.baseline.sharpe_ratio);
    println!("Confidence:     {:.0}%", estimate.confidence * 100.0);
    println!();
}
