//! Configuration types for poly-edge

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::classifier::Archetype;
use crate::portfolio::CorrelationGroup;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub portfolio: PortfolioConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Scan and resolve loop timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Seconds between scan cycles
    #[serde(default = "default_scan_interval")]
    pub interval_secs: u64,

    /// A cycle abandons unevaluated markets after this many seconds
    #[serde(default = "default_cycle_budget")]
    pub cycle_budget_secs: u64,

    /// Markets evaluated concurrently within a cycle
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Seconds between resolution checks
    #[serde(default = "default_resolve_interval")]
    pub resolve_interval_secs: u64,

    /// Trailing window of price/volume samples kept per market
    #[serde(default = "default_history_window_minutes")]
    pub history_window_minutes: i64,

    #[serde(default = "default_history_max_samples")]
    pub history_max_samples: usize,
}

fn default_scan_interval() -> u64 {
    180
}
fn default_cycle_budget() -> u64 {
    120
}
fn default_max_concurrency() -> usize {
    8
}
fn default_resolve_interval() -> u64 {
    300
}
fn default_history_window_minutes() -> i64 {
    24 * 60
}
fn default_history_max_samples() -> usize {
    480
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_scan_interval(),
            cycle_budget_secs: default_cycle_budget(),
            max_concurrency: default_max_concurrency(),
            resolve_interval_secs: default_resolve_interval(),
            history_window_minutes: default_history_window_minutes(),
            history_max_samples: default_history_max_samples(),
        }
    }
}

impl ScanConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn cycle_budget(&self) -> Duration {
        Duration::from_secs(self.cycle_budget_secs)
    }

    pub fn resolve_interval(&self) -> Duration {
        Duration::from_secs(self.resolve_interval_secs)
    }
}

/// Market and settlement feeds
///
/// Each feed is either an HTTP endpoint or a local JSON file; the URL wins
/// when both are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub markets_url: Option<String>,
    #[serde(default)]
    pub markets_file: Option<PathBuf>,
    #[serde(default)]
    pub settlements_url: Option<String>,
    #[serde(default)]
    pub settlements_file: Option<PathBuf>,

    /// Per-request timeout
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,

    /// Consecutive failures that open a source's circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds an open circuit waits before a trial request
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
}

fn default_source_timeout() -> u64 {
    10
}
fn default_failure_threshold() -> u32 {
    3
}
fn default_cooldown() -> u64 {
    300
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            markets_url: None,
            markets_file: None,
            settlements_url: None,
            settlements_file: None,
            timeout_secs: default_source_timeout(),
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Confidence engine parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    /// Parameter file written by calibration and read on start
    #[serde(default = "default_params_path")]
    pub params_path: PathBuf,

    /// Win rate used when an archetype has no prior
    #[serde(default = "default_base_rate")]
    pub base_rate: Decimal,
}

fn default_params_path() -> PathBuf {
    PathBuf::from("state/confidence_params.json")
}
fn default_base_rate() -> Decimal {
    Decimal::new(55, 2) // 0.55
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            params_path: default_params_path(),
            base_rate: default_base_rate(),
        }
    }
}

/// Kelly sizing, operating phases and the uncertainty haircut
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingConfig {
    #[serde(default = "default_conservative_fraction")]
    pub conservative_fraction: Decimal,

    #[serde(default = "default_growth_fraction")]
    pub growth_fraction: Decimal,

    #[serde(default = "default_defensive_fraction")]
    pub defensive_fraction: Decimal,

    /// Resolved trades required before the growth phase is considered
    #[serde(default = "default_min_resolved_for_growth")]
    pub min_resolved_for_growth: u64,

    /// Rolling win rate required for growth
    #[serde(default = "default_growth_min_win_rate")]
    pub growth_min_win_rate: Decimal,

    /// Growth is allowed only at or below this drawdown
    #[serde(default = "default_growth_max_drawdown")]
    pub growth_max_drawdown: Decimal,

    /// Drawdown at which sizing turns defensive
    #[serde(default = "default_breach_drawdown")]
    pub breach_drawdown: Decimal,

    /// Number of recent resolutions in the rolling win rate
    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,

    /// Position ceiling as a fraction of bankroll
    #[serde(default = "default_max_position_pct")]
    pub max_position_pct: Decimal,

    /// Bets smaller than this are skipped
    #[serde(default = "default_min_bet_usd")]
    pub min_bet_usd: Decimal,

    /// Bootstrap resamples per haircut; zero disables the haircut
    #[serde(default = "default_bootstrap_iterations")]
    pub bootstrap_iterations: usize,

    /// Lower percentile of the resampled Kelly fractions (0-100)
    #[serde(default = "default_bootstrap_percentile")]
    pub bootstrap_percentile: u8,

    /// Upper bound on effective outcomes drawn per resample
    #[serde(default = "default_bootstrap_max_outcomes")]
    pub bootstrap_max_outcomes: u64,

    #[serde(default = "default_bootstrap_seed")]
    pub bootstrap_seed: u64,
}

fn default_conservative_fraction() -> Decimal {
    Decimal::new(125, 3) // 1/8
}
fn default_growth_fraction() -> Decimal {
    Decimal::new(25, 2) // 1/4
}
fn default_defensive_fraction() -> Decimal {
    Decimal::new(625, 4) // 1/16
}
fn default_min_resolved_for_growth() -> u64 {
    50
}
fn default_growth_min_win_rate() -> Decimal {
    Decimal::new(60, 2)
}
fn default_growth_max_drawdown() -> Decimal {
    Decimal::new(10, 2)
}
fn default_breach_drawdown() -> Decimal {
    Decimal::new(20, 2)
}
fn default_rolling_window() -> usize {
    50
}
fn default_max_position_pct() -> Decimal {
    Decimal::new(5, 2) // 5%
}
fn default_min_bet_usd() -> Decimal {
    Decimal::new(5, 0)
}
fn default_bootstrap_iterations() -> usize {
    400
}
fn default_bootstrap_percentile() -> u8 {
    25
}
fn default_bootstrap_max_outcomes() -> u64 {
    500
}
fn default_bootstrap_seed() -> u64 {
    0x5eed
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            conservative_fraction: default_conservative_fraction(),
            growth_fraction: default_growth_fraction(),
            defensive_fraction: default_defensive_fraction(),
            min_resolved_for_growth: default_min_resolved_for_growth(),
            growth_min_win_rate: default_growth_min_win_rate(),
            growth_max_drawdown: default_growth_max_drawdown(),
            breach_drawdown: default_breach_drawdown(),
            rolling_window: default_rolling_window(),
            max_position_pct: default_max_position_pct(),
            min_bet_usd: default_min_bet_usd(),
            bootstrap_iterations: default_bootstrap_iterations(),
            bootstrap_percentile: default_bootstrap_percentile(),
            bootstrap_max_outcomes: default_bootstrap_max_outcomes(),
            bootstrap_seed: default_bootstrap_seed(),
        }
    }
}

/// Pipeline thresholds and modifier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Minimum confidence minus entry cost
    #[serde(default = "default_min_edge")]
    pub min_edge: Decimal,

    /// Entry prices below this are treated as priced-in long shots
    #[serde(default = "default_min_implied_probability")]
    pub min_implied_probability: Decimal,

    /// Allowed deviation of yes + no from 1
    #[serde(default = "default_price_sum_tolerance")]
    pub price_sum_tolerance: Decimal,

    /// Volume increment z-score that counts as a spike
    #[serde(default = "default_volume_spike_z")]
    pub volume_spike_z: f64,

    #[serde(default = "default_volume_spike_boost")]
    pub volume_spike_boost: Decimal,

    /// Earlier increments needed before a z-score is trusted
    #[serde(default = "default_min_volume_increments")]
    pub min_volume_increments: usize,

    /// Trailing window for price drift (minutes)
    #[serde(default = "default_momentum_lookback_minutes")]
    pub momentum_lookback_minutes: i64,

    /// Drift toward the side that earns the momentum boost
    #[serde(default = "default_momentum_min_drift")]
    pub momentum_min_drift: Decimal,

    #[serde(default = "default_momentum_boost")]
    pub momentum_boost: Decimal,

    /// Drift against the side that blocks the bet outright
    #[serde(default = "default_momentum_block_drift")]
    pub momentum_block_drift: Decimal,

    /// Per-archetype size multipliers
    #[serde(default = "default_archetype_boosts")]
    pub archetype_boosts: HashMap<Archetype, Decimal>,
}

fn default_min_edge() -> Decimal {
    Decimal::new(2, 2) // 0.02
}
fn default_min_implied_probability() -> Decimal {
    Decimal::new(20, 2)
}
fn default_price_sum_tolerance() -> Decimal {
    Decimal::new(5, 2)
}
fn default_volume_spike_z() -> f64 {
    2.0
}
fn default_volume_spike_boost() -> Decimal {
    Decimal::new(110, 2) // 1.10
}
fn default_min_volume_increments() -> usize {
    5
}
fn default_momentum_lookback_minutes() -> i64 {
    60
}
fn default_momentum_min_drift() -> Decimal {
    Decimal::new(2, 2)
}
fn default_momentum_boost() -> Decimal {
    Decimal::new(105, 2)
}
fn default_momentum_block_drift() -> Decimal {
    Decimal::new(8, 2)
}
fn default_archetype_boosts() -> HashMap<Archetype, Decimal> {
    HashMap::from([
        (Archetype::DailyUpdown, Decimal::new(110, 2)),
        (Archetype::Election, Decimal::new(105, 2)),
    ])
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            min_edge: default_min_edge(),
            min_implied_probability: default_min_implied_probability(),
            price_sum_tolerance: default_price_sum_tolerance(),
            volume_spike_z: default_volume_spike_z(),
            volume_spike_boost: default_volume_spike_boost(),
            min_volume_increments: default_min_volume_increments(),
            momentum_lookback_minutes: default_momentum_lookback_minutes(),
            momentum_min_drift: default_momentum_min_drift(),
            momentum_boost: default_momentum_boost(),
            momentum_block_drift: default_momentum_block_drift(),
            archetype_boosts: default_archetype_boosts(),
        }
    }
}

/// Ledger limits and persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConfig {
    #[serde(default = "default_initial_bankroll")]
    pub initial_bankroll: Decimal,

    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Global cap on open positions
    #[serde(default = "default_max_open_positions")]
    pub max_open_positions: usize,

    /// Open positions allowed per correlation group without an override
    #[serde(default = "default_group_cap")]
    pub default_group_cap: usize,

    #[serde(default)]
    pub group_caps: HashMap<CorrelationGroup, usize>,
}

fn default_initial_bankroll() -> Decimal {
    Decimal::new(10_000, 0)
}
fn default_state_path() -> PathBuf {
    PathBuf::from("state/portfolio.json")
}
fn default_max_open_positions() -> usize {
    20
}
fn default_group_cap() -> usize {
    3
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            initial_bankroll: default_initial_bankroll(),
            state_path: default_state_path(),
            max_open_positions: default_max_open_positions(),
            default_group_cap: default_group_cap(),
            group_caps: HashMap::new(),
        }
    }
}

impl PortfolioConfig {
    /// Cap for one correlation group
    pub fn group_cap(&self, group: CorrelationGroup) -> usize {
        self.group_caps
            .get(&group)
            .copied()
            .unwrap_or(self.default_group_cap)
    }
}

/// Feedback loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Rebuild after this many new resolutions
    #[serde(default = "default_every_n_resolutions")]
    pub every_n_resolutions: u64,

    /// Samples a source needs before it can be disabled
    #[serde(default = "default_min_skill_samples")]
    pub min_skill_samples: usize,

    /// Sources whose IC stays below this are disabled
    #[serde(default = "default_noise_ic")]
    pub noise_ic: f64,

    /// IC at which a source carries full weight
    #[serde(default = "default_full_weight_ic")]
    pub full_weight_ic: f64,

    /// Where the latest calibration report is written
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
}

fn default_every_n_resolutions() -> u64 {
    10
}
fn default_min_skill_samples() -> usize {
    30
}
fn default_noise_ic() -> f64 {
    0.05
}
fn default_full_weight_ic() -> f64 {
    0.20
}
fn default_report_path() -> PathBuf {
    PathBuf::from("state/calibration_report.json")
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            every_n_resolutions: default_every_n_resolutions(),
            min_skill_samples: default_min_skill_samples(),
            noise_ic: default_noise_ic(),
            full_weight_ic: default_full_weight_ic(),
            report_path: default_report_path(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Prometheus exporter port; no exporter when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: None,
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            [scan]
            interval_secs = 60
            cycle_budget_secs = 45
            max_concurrency = 4

            [source]
            markets_url = "http://localhost:8080/markets"
            settlements_file = "./settlements.json"
            failure_threshold = 5

            [sizing]
            conservative_fraction = 0.125
            max_position_pct = 0.05
            min_bet_usd = 10

            [signal]
            min_edge = 0.03

            [signal.archetype_boosts]
            daily_updown = 1.2
            weather = 0.9

            [portfolio]
            initial_bankroll = 2500
            default_group_cap = 2

            [portfolio.group_caps]
            crypto = 4

            [telemetry]
            metrics_port = 9090
            log_level = "debug"
            log_format = "json"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.scan.max_concurrency, 4);
        assert_eq!(config.source.failure_threshold, 5);
        assert_eq!(config.source.timeout_secs, 10);
        assert_eq!(config.sizing.min_bet_usd, dec!(10));
        assert_eq!(config.signal.min_edge, dec!(0.03));
        assert_eq!(config.signal.archetype_boosts[&Archetype::Weather], dec!(0.9));
        assert_eq!(config.portfolio.group_cap(CorrelationGroup::Crypto), 4);
        assert_eq!(config.portfolio.group_cap(CorrelationGroup::Sports), 2);
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        assert_eq!(config.telemetry.metrics_port, Some(9090));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.sizing.conservative_fraction, dec!(0.125));
        assert_eq!(config.sizing.growth_fraction, dec!(0.25));
        assert_eq!(config.sizing.defensive_fraction, dec!(0.0625));
        assert_eq!(config.portfolio.default_group_cap, 3);
        assert_eq!(config.portfolio.max_open_positions, 20);
        assert_eq!(config.confidence.base_rate, dec!(0.55));
        assert!(config.telemetry.metrics_port.is_none());
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(include_str!("../config.toml.example")).unwrap();
        assert_eq!(config.sizing.bootstrap_percentile, 25);
    }

    #[test]
    fn test_durations() {
        let scan = ScanConfig::default();
        assert_eq!(scan.interval(), Duration::from_secs(180));
        assert_eq!(SourceConfig::default().cooldown(), Duration::from_secs(300));
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }
}
