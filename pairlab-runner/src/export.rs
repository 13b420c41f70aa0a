//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for backtest results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade ledger and summary table for external analysis tools
//! - **Markdown**: human-readable single-run report
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use pairlab_core::domain::Trade;

use crate::metrics::SummaryRow;
use crate::runner::{BacktestResult, SCHEMA_VERSION};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

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

/// Export the trade ledger as CSV. Exit columns are blank for open trades.
///
/// Columns: entry_time, leg, side, entry_price, target_price,
/// stop_loss_price, exit_time, exit_price, profit, exit_reason
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "entry_time",
        "leg",
        "side",
        "entry_price",
        "target_price",
        "stop_loss_price",
        "exit_time",
        "exit_price",
        "profit",
        "exit_reason",
    ])?;

    for t in trades {
        let (exit_time, exit_price, profit, reason) = match t.exit {
            Some(exit) => (
                exit.exit_time.format(TIME_FORMAT).to_string(),
                format!("{:.6}", exit.exit_price),
                format!("{:.6}", exit.profit),
                exit.reason.label().to_string(),
            ),
            None => Default::default(),
        };
        wtr.write_record([
            &t.entry_time.format(TIME_FORMAT).to_string(),
            &t.leg.to_string(),
            &t.side.to_string(),
            &format!("{:.6}", t.entry_price),
            &format!("{:.6}", t.target_price),
            &format!("{:.6}", t.stop_loss_price),
            &exit_time,
            &exit_price,
            &profit,
            &reason,
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export summary rows as CSV with metric, value and info columns.
pub fn export_summary_csv(rows: &[SummaryRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["metric", "value", "info"])?;
    for row in rows {
        wtr.write_record([&row.metric, &row.value, &row.info])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates a directory named `{run_hash_prefix}_{timestamp}/` under
/// `output_dir` containing:
/// - `manifest.json`: the full `BacktestResult`
/// - `trades.csv`: trade ledger
/// - `summary.csv`: summary table
/// - `report.md`: Markdown report
///
/// Returns the path to the created directory.
pub fn save_artifacts(
    result: &BacktestResult,
    output_dir: &Path,
    include_monthly: bool,
) -> Result<PathBuf> {
    let hash = &result.fingerprint.run_hash;
    let dirname = format!(
        "{}_{}",
        &hash[..hash.len().min(12)],
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(result)?;
    std::fs::write(run_dir.join("manifest.json"), &json)?;

    let trades_csv = export_trades_csv(&result.trades)?;
    std::fs::write(run_dir.join("trades.csv"), &trades_csv)?;

    let summary_csv = export_summary_csv(&result.summary_rows(include_monthly))?;
    std::fs::write(run_dir.join("summary.csv"), &summary_csv)?;

    std::fs::write(
        run_dir.join("report.md"),
        generate_report(result, include_monthly),
    )?;

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult, include_monthly: bool) -> String {
    let mut md = String::with_capacity(2048);
    let fp = &result.fingerprint;

    md.push_str("# Backtest Report\n\n");

    // Metadata
    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Source | {} |\n", result.source));
    let fmt_time = |t: Option<chrono::NaiveDateTime>| {
        t.map(|t| t.format(TIME_FORMAT).to_string())
            .unwrap_or_else(|| "-".into())
    };
    md.push_str(&format!(
        "| Period | {} to {} |\n",
        fmt_time(fp.first_time),
        fmt_time(fp.last_time)
    ));
    md.push_str(&format!("| Points | {} |\n", fp.points));
    md.push_str(&format!("| Signals | {} |\n", result.signal_count));
    md.push_str(&format!(
        "| Throttle | {} trips, {} blocked steps |\n",
        result.throttle_trips, result.blocked_steps
    ));
    md.push_str(&format!("| Dataset Hash | {} |\n", fp.run_id.dataset_hash));
    md.push_str(&format!("| Run Hash | {} |\n", fp.run_hash));
    if result.dropped_points > 0 {
        md.push_str(&format!(
            "| Dropped Points | {} (unmatched timestamps) |\n",
            result.dropped_points
        ));
    }
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    // Parameters
    let s = &result.config.signal;
    let e = &result.config.engine;
    md.push_str("## Parameters\n\n");
    md.push_str(&format!("- **Signal:** {}\n", fp.signal_name));
    md.push_str(&format!(
        "  - momentum_diff_threshold: {}\n",
        s.momentum_diff_threshold
    ));
    md.push_str(&format!("  - stop_loss_percentage: {}\n", s.stop_loss_percentage));
    md.push_str(&format!("  - lookback_periods: {}\n", s.lookback_periods));
    md.push_str(&format!(
        "- **Throttle:** {} losses within {}s\n",
        e.max_consecutive_losses, e.cooling_period_secs
    ));
    md.push_str(&format!(
        "- **End-of-run exit:** {}\n\n",
        if e.perform_end_of_backtest_exit { "on" } else { "off" }
    ));

    // Summary
    md.push_str("## Performance\n\n");
    md.push_str("| Metric | Value | Info |\n");
    md.push_str("| --- | --- | --- |\n");
    for row in result.summary_rows(include_monthly) {
        md.push_str(&format!("| {} | {} | {} |\n", row.metric, row.value, row.info));
    }
    md.push('\n');

    // Trade ledger
    md.push_str(&format!("## Trades ({})\n\n", result.trades.len()));
    if result.trades.is_empty() {
        md.push_str("No trades.\n");
    } else {
        md.push_str(
            "| # | Entry | Leg | Side | Entry Price | Exit Price | Profit | Exit Reason |\n",
        );
        md.push_str("| --- | --- | --- | --- | --- | --- | --- | --- |\n");
        for t in &result.trades {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {:.4} | {} | {} | {} |\n",
                t.id,
                t.entry_time.format(TIME_FORMAT),
                t.leg,
                t.side,
                t.entry_price,
                t.exit_price().map_or("-".into(), |p| format!("{p:.4}")),
                t.profit().map_or("-".into(), |p| format!("{p:.4}")),
                t.exit_reason().map_or("open", |r| r.label()),
            ));
        }
    }

    md
}
