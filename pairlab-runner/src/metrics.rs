//! Performance summary: pure functions over a finished trade ledger.
//!
//! Only closed trades count. Every metric is a pure function: trade list in,
//! scalar out. No dependencies on the runner, data loading, or engine.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use pairlab_core::domain::{ExitReason, Trade};
use serde::{Deserialize, Serialize};

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSummary {
    pub total_trades: usize,
    pub profitable_trades: usize,
    pub losing_trades: usize,
    pub total_profit: f64,
    pub max_investment: f64,
    pub avg_max_investment: f64,
    /// Percent of average daily peak investment.
    pub roi_pct: f64,
    pub avg_profit_per_trade: f64,
    pub avg_winning_trade: f64,
    pub avg_losing_trade: f64,
    /// `+inf` when no trade lost money.
    #[serde(with = "unbounded_f64")]
    pub profit_factor: f64,
    /// Percent of trades that exited on their stop.
    pub stop_loss_rate: f64,
    pub monthly: Vec<MonthlyProfit>,
}

/// Profit of the trades entered in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyProfit {
    /// `YYYY-MM`
    pub month: String,
    pub total_profit: f64,
    pub trade_count: usize,
}

/// One line of the tabular summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub metric: String,
    pub value: String,
    pub info: String,
}

impl SummaryRow {
    fn new(metric: impl Into<String>, value: impl Into<String>, info: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            value: value.into(),
            info: info.into(),
        }
    }

    /// Row emitted in place of the table when nothing closed.
    pub fn no_trades() -> Self {
        Self::new("Status", "No trades executed", "No data available")
    }
}

impl TradingSummary {
    /// Compute all metrics from the closed trades in `trades`.
    ///
    /// Returns `None` when no trade has closed.
    pub fn compute(trades: &[Trade]) -> Option<Self> {
        let closed: Vec<&Trade> = trades.iter().filter(|t| t.is_closed()).collect();
        if closed.is_empty() {
            return None;
        }

        let profits: Vec<f64> = closed.iter().filter_map(|t| t.profit()).collect();
        let wins: Vec<f64> = profits.iter().copied().filter(|p| *p > 0.0).collect();
        let losses: Vec<f64> = profits.iter().copied().filter(|p| *p <= 0.0).collect();
        let total_profit: f64 = profits.iter().sum();

        let timeline = exposure_timeline(&closed);
        let max_investment = max_investment(&timeline);
        let avg_max_investment = avg_daily_max_investment(&timeline);

        Some(Self {
            total_trades: closed.len(),
            profitable_trades: wins.len(),
            losing_trades: losses.len(),
            total_profit,
            max_investment,
            avg_max_investment,
            roi_pct: roi_pct(total_profit, avg_max_investment),
            avg_profit_per_trade: mean_or_zero(&profits),
            avg_winning_trade: mean_or_zero(&wins),
            avg_losing_trade: mean_or_zero(&losses),
            profit_factor: profit_factor(&wins, &losses),
            stop_loss_rate: stop_loss_rate(&closed),
            monthly: monthly_profits(&closed),
        })
    }

    /// Render the summary as metric rows, optionally followed by the monthly rollup.
    pub fn rows(&self, include_monthly: bool) -> Vec<SummaryRow> {
        let pct_of_total = |n: usize| {
            format!(
                "{:.1}% of total trades",
                n as f64 / self.total_trades as f64 * 100.0
            )
        };

        let mut rows = vec![
            SummaryRow::new(
                "Total Trades",
                self.total_trades.to_string(),
                format!("{} executed trades", self.total_trades),
            ),
            SummaryRow::new(
                "Profitable Trades",
                self.profitable_trades.to_string(),
                pct_of_total(self.profitable_trades),
            ),
            SummaryRow::new(
                "Losing Trades",
                self.losing_trades.to_string(),
                pct_of_total(self.losing_trades),
            ),
            money_row("Total Profit", self.total_profit),
            money_row("Maximum Investment", self.max_investment),
            money_row("Average Maximum Investment", self.avg_max_investment),
            SummaryRow::new(
                "Return on Investment (ROI)",
                fmt_value(self.roi_pct),
                format!("{:.2}% (based on avg max investment)", self.roi_pct),
            ),
            money_row("Average Profit per Trade", self.avg_profit_per_trade),
            money_row("Average Winning Trade", self.avg_winning_trade),
            money_row("Average Losing Trade", self.avg_losing_trade),
            SummaryRow::new(
                "Profit Factor",
                fmt_value(self.profit_factor),
                format!("{:.2}x return ratio", self.profit_factor),
            ),
            SummaryRow::new(
                "Stop Loss Hit Rate",
                fmt_value(self.stop_loss_rate),
                format!("{:.1}% of total trades", self.stop_loss_rate),
            ),
        ];

        if include_monthly {
            rows.extend(self.monthly.iter().map(|m| {
                SummaryRow::new(
                    format!("Month {}", m.month),
                    fmt_value(m.total_profit),
                    format!("{} trades, ${:.2} profit", m.trade_count, m.total_profit),
                )
            }));
        }
        rows
    }
}

/// Summary table for a ledger: the metric rows, or the single sentinel row
/// when no trade closed.
pub fn summary_rows(trades: &[Trade], include_monthly: bool) -> Vec<SummaryRow> {
    match TradingSummary::compute(trades) {
        Some(summary) => summary.rows(include_monthly),
        None => vec![SummaryRow::no_trades()],
    }
}

fn money_row(metric: &str, value: f64) -> SummaryRow {
    SummaryRow::new(metric, fmt_value(value), format!("${value:.2}"))
}

fn fmt_value(value: f64) -> String {
    if value.is_infinite() {
        let text = if value > 0.0 { "inf" } else { "-inf" };
        text.to_string()
    } else {
        format!("{value:.6}")
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Capital invested after each open/close event, in event order.
///
/// Each trade contributes `+entry_price` at entry and `-entry_price` at exit.
/// Events sort by time; ties keep insertion order, so a trade's own open
/// always precedes its close.
pub fn exposure_timeline(trades: &[&Trade]) -> Vec<(NaiveDateTime, f64)> {
    let mut events: Vec<(NaiveDateTime, f64)> = Vec::with_capacity(trades.len() * 2);
    for trade in trades {
        if let Some(exit_time) = trade.exit_time() {
            events.push((trade.entry_time, trade.entry_price));
            events.push((exit_time, -trade.entry_price));
        }
    }
    events.sort_by_key(|(time, _)| *time);

    let mut invested = 0.0;
    events
        .into_iter()
        .map(|(time, delta)| {
            invested += delta;
            (time, invested)
        })
        .collect()
}

/// Peak invested capital over the timeline (0 when empty).
pub fn max_investment(timeline: &[(NaiveDateTime, f64)]) -> f64 {
    timeline
        .iter()
        .map(|(_, invested)| *invested)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
        .unwrap_or(0.0)
}

/// Mean over calendar days of each day's peak invested capital.
pub fn avg_daily_max_investment(timeline: &[(NaiveDateTime, f64)]) -> f64 {
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (time, invested) in timeline {
        daily
            .entry(time.date())
            .and_modify(|peak| *peak = peak.max(*invested))
            .or_insert(*invested);
    }
    let peaks: Vec<f64> = daily.into_values().collect();
    mean_or_zero(&peaks)
}

/// Total profit as a percent of average daily peak investment; 0 when the
/// denominator is not positive.
pub fn roi_pct(total_profit: f64, avg_max_investment: f64) -> f64 {
    if avg_max_investment > 0.0 {
        total_profit / avg_max_investment * 100.0
    } else {
        0.0
    }
}

/// |Σ wins / Σ losses|, or `+inf` when losses sum to zero.
pub fn profit_factor(wins: &[f64], losses: &[f64]) -> f64 {
    let gross_loss: f64 = losses.iter().sum();
    if gross_loss == 0.0 {
        return f64::INFINITY;
    }
    let gross_profit: f64 = wins.iter().sum();
    (gross_profit / gross_loss).abs()
}

/// Percent of trades closed by their stop.
pub fn stop_loss_rate(trades: &[&Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let stopped = trades
        .iter()
        .filter(|t| t.exit_reason() == Some(ExitReason::StopHit))
        .count();
    stopped as f64 / trades.len() as f64 * 100.0
}

/// Profit and count per entry month, in calendar order.
pub fn monthly_profits(trades: &[&Trade]) -> Vec<MonthlyProfit> {
    let mut months: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for trade in trades {
        let Some(profit) = trade.profit() else {
            continue;
        };
        let bucket = months
            .entry(trade.entry_time.format("%Y-%m").to_string())
            .or_insert((0.0, 0));
        bucket.0 += profit;
        bucket.1 += 1;
    }
    months
        .into_iter()
        .map(|(month, (total_profit, trade_count))| MonthlyProfit {
            month,
            total_profit,
            trade_count,
        })
        .collect()
}

fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// JSON has no infinity; `+inf` round-trips as the string `"inf"`.
mod unbounded_f64 {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() && *value > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(s) if s == "inf" => Ok(f64::INFINITY),
            Repr::Text(s) => Err(D::Error::custom(format!("invalid number: {s}"))),
        }
    }
}
