//! Status and report commands

use rust_decimal_macros::dec;

use crate::calibration::Calibrator;
use crate::config::Config;
use crate::portfolio::{PortfolioLimits, PortfolioState};
use crate::store::JsonFile;

/// Print the persisted portfolio
pub fn print_status(config: &Config) -> anyhow::Result<()> {
    let store = JsonFile::new(&config.portfolio.state_path);
    let Some(state) = store.load::<PortfolioState>()? else {
        println!("No portfolio state at {}", store.path().display());
        return Ok(());
    };

    let limits = PortfolioLimits::from_config(&config.portfolio);
    let view = state.view(&limits, config.sizing.rolling_window);

    println!("poly-edge status");
    println!("  Bankroll:   ${} (peak ${})", state.bankroll, state.peak_bankroll);
    println!("  Available:  ${}", view.available);
    println!("  Committed:  ${}", state.committed);
    println!("  Drawdown:   {}%", (state.drawdown_pct * dec!(100)).round_dp(2));
    println!("  Resolved:   {}", view.total_resolved);
    match view.rolling_win_rate {
        Some(rate) => println!("  Win rate:   {}% (last {})", (rate * dec!(100)).round_dp(1), config.sizing.rolling_window),
        None => println!("  Win rate:   n/a"),
    }
    println!("  Open:       {}/{}", view.open_count, limits.max_open_positions);

    for position in &state.open_positions {
        println!(
            "    {} {} {} @ {} ${} [{}] {}",
            position.id,
            position.market_id,
            position.side,
            position.entry_price,
            position.size_usd,
            position.correlation_group,
            position.title
        );
    }
    Ok(())
}

/// Print the last calibration report
pub fn print_report(config: &Config) -> anyhow::Result<()> {
    let calibrator = Calibrator::new(
        config.calibration.clone(),
        config.confidence.params_path.clone(),
    );
    let Some(report) = calibrator.load_report()? else {
        println!("No calibration report at {}", config.calibration.report_path.display());
        return Ok(());
    };

    println!("Calibration report ({})", report.generated_at);
    println!("  Params version: {}", report.params_version);
    println!("  Resolved:       {}", report.total_resolved);
    if let Some(brier) = report.curve.brier_score {
        println!("  Brier score:    {:.4}", brier);
    }
    if let Some(over) = report.curve.mean_overconfidence {
        println!("  Overconfidence: {:+.4}", over);
    }

    println!();
    println!("  {:<20} {:<4} {:>6} {:>8} {:>10}", "archetype", "side", "n", "win%", "pnl");
    for row in &report.win_rates {
        println!(
            "  {:<20} {:<4} {:>6} {:>8} {:>10}",
            row.archetype.to_string(),
            row.side.to_string(),
            row.total,
            (row.win_rate * dec!(100)).round_dp(1).to_string(),
            row.pnl.round_dp(2).to_string()
        );
    }

    println!();
    println!("  {:<10} {:>6} {:>10} {:>10}", "decile", "n", "predicted", "observed");
    for bucket in &report.curve.buckets {
        println!(
            "  {:.1}-{:.1}    {:>6} {:>10.3} {:>10.3}",
            bucket.lower, bucket.upper, bucket.count, bucket.mean_predicted, bucket.observed_win_rate
        );
    }

    println!();
    println!("  {:<20} {:>6} {:>8} {:>8}", "source", "n", "ic", "weight");
    for skill in &report.sources {
        let ic = skill.ic.map(|ic| format!("{:.3}", ic)).unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<20} {:>6} {:>8} {:>8}{}",
            skill.source,
            skill.samples,
            ic,
            skill.weight.to_string(),
            if skill.informational {
                " informational"
            } else if skill.disabled {
                " disabled"
            } else {
                ""
            }
        );
    }
    Ok(())
}
