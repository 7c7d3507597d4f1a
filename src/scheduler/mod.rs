//! The two periodic tasks
//!
//! The scan loop and the resolve loop run independently and share nothing
//! but the ledger, the pipeline and the confidence engine.

mod circuit;
mod resolve;
mod scan;

pub use circuit::{CircuitBreaker, CircuitState, SourceGuard, SourceHealth};
pub use resolve::{ResolveSummary, Resolver};
pub use scan::{ScanSummary, Scanner};

use std::sync::Arc;
use tokio::sync::watch;

/// Runs both loops until shutdown
pub struct Scheduler {
    scanner: Arc<Scanner>,
    resolver: Arc<Resolver>,
}

impl Scheduler {
    pub fn new(scanner: Scanner, resolver: Resolver) -> Self {
        Self {
            scanner: Arc::new(scanner),
            resolver: Arc::new(resolver),
        }
    }

    /// Source-health report across both feeds
    pub fn health(&self) -> Vec<SourceHealth> {
        vec![self.scanner.health(), self.resolver.health()]
    }

    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let scanner = Arc::clone(&self.scanner);
        let scan_shutdown = shutdown.clone();
        let scan = tokio::spawn(async move { scanner.run(scan_shutdown).await });

        let resolver = Arc::clone(&self.resolver);
        let resolve = tokio::spawn(async move { resolver.run(shutdown).await });

        let (scan, resolve) = tokio::join!(scan, resolve);
        scan?;
        resolve?;

        for health in self.health() {
            tracing::info!(
                source = %health.source,
                state = ?health.state,
                total_failures = health.total_failures,
                "Source health at shutdown"
            );
        }
        Ok(())
    }
}
