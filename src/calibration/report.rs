//! Calibration report and the loop step that applies it

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use super::curve::{build_curve, CalibrationCurve};
use super::rebuild::rebuild_params;
use super::skill::{score_sources, SourceSkill};
use crate::classifier::Archetype;
use crate::config::CalibrationConfig;
use crate::confidence::{ConfidenceEngine, ConfidenceParams};
use crate::portfolio::Position;
use crate::signal::{Side, SignalPipeline, SourceWeights};
use crate::store::{JsonFile, StoreError};
use crate::telemetry::{record_latency, set_gauge, GaugeMetric, LatencyMetric};

/// Realized record for one archetype and side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinRateRow {
    pub archetype: Archetype,
    pub side: Side,
    pub wins: u64,
    pub total: u64,
    pub win_rate: Decimal,
    pub pnl: Decimal,
}

/// Per-(archetype, side) win rates over resolved wins and losses
pub fn win_rate_table(resolved: &[Position]) -> Vec<WinRateRow> {
    let mut rows: BTreeMap<(Archetype, Side), (u64, u64, Decimal)> = BTreeMap::new();
    for position in resolved {
        let Some(won) = position.won() else {
            continue;
        };
        let row = rows
            .entry((position.archetype, position.side))
            .or_insert((0, 0, Decimal::ZERO));
        row.1 += 1;
        if won {
            row.0 += 1;
        }
        row.2 += position.pnl.unwrap_or(Decimal::ZERO);
    }

    rows.into_iter()
        .map(|((archetype, side), (wins, total, pnl))| WinRateRow {
            archetype,
            side,
            wins,
            total,
            win_rate: (Decimal::from(wins) / Decimal::from(total)).round_dp(4),
            pnl,
        })
        .collect()
}

/// Everything one calibration pass produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub generated_at: DateTime<Utc>,
    pub params_version: u32,
    pub total_resolved: u64,
    pub win_rates: Vec<WinRateRow>,
    pub curve: CalibrationCurve,
    pub sources: Vec<SourceSkill>,
    /// Weights handed to the signal pipeline
    pub weights: SourceWeights,
}

/// Runs calibration passes and keeps their output on disk
#[derive(Debug, Clone)]
pub struct Calibrator {
    config: CalibrationConfig,
    params_store: JsonFile,
    report_store: JsonFile,
}

impl Calibrator {
    pub fn new(config: CalibrationConfig, params_path: impl Into<std::path::PathBuf>) -> Self {
        let report_store = JsonFile::new(&config.report_path);
        Self {
            config,
            params_store: JsonFile::new(params_path),
            report_store,
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Persisted parameters, or the seed set on first start
    pub fn load_params(&self) -> Result<ConfidenceParams, StoreError> {
        match self.params_store.load()? {
            Some(params) => Ok(params),
            None => {
                tracing::info!(
                    path = %self.params_store.path().display(),
                    "No confidence parameters on disk, using seeds"
                );
                Ok(ConfidenceParams::seeded())
            }
        }
    }

    /// Last persisted report
    pub fn load_report(&self) -> Result<Option<CalibrationReport>, StoreError> {
        self.report_store.load()
    }

    /// Source weights from the last report; neutral when none exists
    pub fn load_weights(&self) -> Result<SourceWeights, StoreError> {
        Ok(self
            .load_report()?
            .map(|r| r.weights)
            .unwrap_or_default())
    }

    /// Rebuild parameters and weights from `resolved`, persist both and
    /// install them on the engine and pipeline
    pub fn run(
        &self,
        engine: &ConfidenceEngine,
        pipeline: &SignalPipeline,
        resolved: &[Position],
        now: DateTime<Utc>,
    ) -> Result<CalibrationReport, StoreError> {
        let start = Instant::now();

        let params = rebuild_params(&engine.params(), resolved, now);
        let (sources, weights) = score_sources(resolved, &self.config);
        let report = CalibrationReport {
            generated_at: now,
            params_version: params.version,
            total_resolved: params.total_resolved,
            win_rates: win_rate_table(resolved),
            curve: build_curve(resolved),
            sources,
            weights: weights.clone(),
        };

        // params first: a report never names a version that was not saved
        self.params_store.save(&params)?;
        self.report_store.save(&report)?;

        set_gauge(GaugeMetric::ParamsVersion, f64::from(params.version));
        engine.replace_params(params);
        pipeline.set_source_weights(weights);
        record_latency(LatencyMetric::Calibration, start.elapsed());

        for skill in report.sources.iter().filter(|s| s.disabled) {
            tracing::warn!(
                source = %skill.source,
                samples = skill.samples,
                ic = ?skill.ic,
                "Source disabled, no predictive skill"
            );
        }
        tracing::info!(
            version = report.params_version,
            total_resolved = report.total_resolved,
            brier = ?report.curve.brier_score,
            "Calibration complete"
        );

        Ok(report)
    }
}
