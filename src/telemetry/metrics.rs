//! Prometheus metrics

use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// One pipeline evaluation
    Evaluation,
    /// A full scan cycle
    ScanCycle,
    /// One market or settlement fetch
    SourceFetch,
    /// A calibration rebuild
    Calibration,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Realized bankroll
    Bankroll,
    /// Stakes reserved by open positions
    Committed,
    /// Open position count
    OpenPositions,
    /// Current drawdown from peak
    DrawdownPct,
    /// Markets seen in the last scan
    ActiveMarkets,
    /// Confidence parameter version
    ParamsVersion,
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::Evaluation => "polyedge_evaluation_latency_ms",
        LatencyMetric::ScanCycle => "polyedge_scan_cycle_latency_ms",
        LatencyMetric::SourceFetch => "polyedge_source_fetch_latency_ms",
        LatencyMetric::Calibration => "polyedge_calibration_latency_ms",
    };

    metrics::histogram!(metric_name).record(duration.as_secs_f64() * 1000.0);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::Bankroll => "polyedge_bankroll_usd",
        GaugeMetric::Committed => "polyedge_committed_usd",
        GaugeMetric::OpenPositions => "polyedge_open_positions",
        GaugeMetric::DrawdownPct => "polyedge_drawdown_pct",
        GaugeMetric::ActiveMarkets => "polyedge_active_markets",
        GaugeMetric::ParamsVersion => "polyedge_confidence_params_version",
    };

    metrics::gauge!(metric_name).set(value);
}

/// Count one pipeline decision by reason code
pub fn record_signal(decision: &'static str, reason: &str) {
    metrics::counter!(
        "polyedge_signals_total",
        "decision" => decision,
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Count a position lifecycle transition
pub fn record_position(status: &'static str, group: &'static str) {
    metrics::counter!(
        "polyedge_positions_total",
        "status" => status,
        "group" => group
    )
    .increment(1);
}

/// Count a failed fetch
pub fn record_source_failure(source: &str) {
    metrics::counter!("polyedge_source_failures_total", "source" => source.to_string())
        .increment(1);
}

/// Count a refused ledger mutation
pub fn record_ledger_refusal(reason: &'static str) {
    metrics::counter!("polyedge_ledger_refusals_total", "reason" => reason).increment(1);
}
