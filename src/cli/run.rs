//! Run command implementation

use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

use crate::calibration::Calibrator;
use crate::config::{Config, SourceConfig};
use crate::confidence::ConfidenceEngine;
use crate::market::{
    FileMarketSource, FileResolutionFeed, HttpMarketSource, HttpResolutionFeed, MarketSource,
    ResolutionFeed,
};
use crate::portfolio::Ledger;
use crate::scheduler::{Resolver, Scanner, Scheduler};
use crate::signal::SignalPipeline;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Read markets from this file instead of the configured source
    #[arg(long)]
    pub markets_file: Option<PathBuf>,

    /// Read settlements from this file instead of the configured feed
    #[arg(long)]
    pub settlements_file: Option<PathBuf>,

    /// Recalibrate from the ledger's resolved positions before starting
    #[arg(long)]
    pub calibrate_first: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut source_config = config.source.clone();
        if let Some(path) = &self.markets_file {
            source_config.markets_url = None;
            source_config.markets_file = Some(path.clone());
        }
        if let Some(path) = &self.settlements_file {
            source_config.settlements_url = None;
            source_config.settlements_file = Some(path.clone());
        }

        let (calibrator, _engine, pipeline) = decision_core(config)?;
        let ledger = Arc::new(Ledger::load(&config.portfolio, config.sizing.rolling_window)?);

        let resolver = Resolver::new(
            resolution_feed(&source_config)?,
            Arc::clone(&ledger),
            Arc::clone(&pipeline),
            calibrator,
            config.scan.resolve_interval(),
            &source_config,
        );
        if self.calibrate_first {
            resolver.calibrate().await;
        }

        let scanner = Scanner::new(
            market_source(&source_config)?,
            pipeline,
            ledger,
            config.scan.clone(),
            &source_config,
        );
        let scheduler = Scheduler::new(scanner, resolver);

        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown requested");
                let _ = tx.send(true);
            }
        });

        scheduler.run(rx).await
    }
}

/// Engine with persisted parameters and a pipeline with persisted weights
pub(crate) fn decision_core(
    config: &Config,
) -> anyhow::Result<(Calibrator, Arc<ConfidenceEngine>, Arc<SignalPipeline>)> {
    let calibrator = Calibrator::new(
        config.calibration.clone(),
        config.confidence.params_path.clone(),
    );

    let mut params = calibrator.load_params()?;
    if params.version == 0 {
        params.base_rate = config.confidence.base_rate;
    }
    tracing::info!(
        version = params.version,
        total_resolved = params.total_resolved,
        "Confidence parameters loaded"
    );

    let engine = Arc::new(ConfidenceEngine::new(params));
    let pipeline = Arc::new(SignalPipeline::from_config(config, Arc::clone(&engine)));
    pipeline.set_source_weights(calibrator.load_weights()?);
    Ok((calibrator, engine, pipeline))
}

/// The URL wins when both a URL and a file are configured
pub(crate) fn market_source(config: &SourceConfig) -> anyhow::Result<Arc<dyn MarketSource>> {
    if let Some(url) = &config.markets_url {
        return Ok(Arc::new(HttpMarketSource::new("markets", url.clone(), config.timeout())?));
    }
    if let Some(path) = &config.markets_file {
        return Ok(Arc::new(FileMarketSource::new(path.clone())));
    }
    anyhow::bail!("no market source configured: set source.markets_url or source.markets_file")
}

pub(crate) fn resolution_feed(config: &SourceConfig) -> anyhow::Result<Arc<dyn ResolutionFeed>> {
    if let Some(url) = &config.settlements_url {
        return Ok(Arc::new(HttpResolutionFeed::new("settlements", url.clone(), config.timeout())?));
    }
    if let Some(path) = &config.settlements_file {
        return Ok(Arc::new(FileResolutionFeed::new(path.clone())));
    }
    anyhow::bail!("no resolution feed configured: set source.settlements_url or source.settlements_file")
}
