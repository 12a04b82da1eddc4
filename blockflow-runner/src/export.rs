//! Export — JSON and CSV artifacts for backtest results.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade tape and equity/drawdown curve for external tools
//!
//! Persisted results carry a `schemaVersion` field. Newer versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use blockflow_core::engine::{DrawdownPoint, EquityPoint, Trade};

use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: timestamp, tick, block_id, kind, from_token, to_token, amount_in,
/// amount_out, price, slippage_pct, gas, pnl
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "tick",
        "block_id",
        "kind",
        "from_token",
        "to_token",
        "amount_in",
        "amount_out",
        "price",
        "slippage_pct",
        "gas",
        "pnl",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.timestamp.to_rfc3339(),
            &t.tick.to_string(),
            t.block_id.as_str(),
            &format!("{:?}", t.kind).to_lowercase(),
            &t.from_token,
            &t.to_token,
            &format!("{:.8}", t.amount_in),
            &format!("{:.8}", t.amount_out),
            &format!("{:.6}", t.price),
            &format!("{:.4}", t.slippage),
            &format!("{:.4}", t.gas),
            &format!("{:.4}", t.pnl),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: tick, timestamp, equity, drawdown_pct.
pub fn export_equity_csv(equity: &[EquityPoint], drawdown: &[DrawdownPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["tick", "timestamp", "equity", "drawdown_pct"])?;
    for (i, point) in equity.iter().enumerate() {
        let dd = drawdown.get(i).map(|d| d.drawdown).unwrap_or(0.0);
        wtr.write_record([
            &i.to_string(),
            &point.timestamp.to_rfc3339(),
            &format!("{:.2}", point.equity),
            &format!("{:.4}", dd),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `result.json`, `trades.csv` and `equity.csv` into
/// `{strategy}_v{version}/` under `output_dir`. Returns the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let id = result.strategy_id.as_str();
    if id.is_empty() || id.contains(['/', '\\', ':']) || id.contains("..") {
        bail!("strategy id '{id}' cannot be used as an artifact directory name");
    }
    let run_dir = output_dir.join(format!(
        "{}_v{}",
        result.strategy_id, result.strategy_version
    ));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("result.json"), export_json(result)?)?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&result.trades)?)?;
    std::fs::write(
        run_dir.join("equity.csv"),
        export_equity_csv(&result.equity_curve, &result.drawdown_curve)?,
    )?;
    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's `result.json`.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
