//! Sweep scheduling engine.
//!
//! Spawns one tokio task per configured subnet, each sweeping at its
//! own interval. A semaphore caps concurrent sweeps; cancelling the
//! shared token drains the loops.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;

use umbra_core::types::SubnetPrefix;

use crate::config::{AgentConfig, SubnetSchedule};
use crate::error::Result;
use crate::pipeline::SweepPipeline;

pub struct SweepScheduler {
    config: AgentConfig,
    pipeline: Arc<SweepPipeline>,
    concurrency: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl SweepScheduler {
    pub fn new(config: AgentConfig, pipeline: SweepPipeline, cancel: CancellationToken) -> Self {
        let concurrency = Arc::new(Semaphore::new(config.max_concurrent_sweeps));
        Self {
            config,
            pipeline: Arc::new(pipeline),
            concurrency,
            cancel,
        }
    }

    /// Run the scheduler until cancellation. A malformed subnet prefix
    /// is fatal here, before any probing starts.
    pub async fn run(&self) -> Result<()> {
        let mut schedules = Vec::new();
        for subnet in &self.config.subnets {
            if !subnet.enabled {
                tracing::info!(prefix = %subnet.prefix, "Subnet disabled, skipping");
                continue;
            }
            let prefix: SubnetPrefix = subnet.prefix.parse()?;
            schedules.push((prefix, subnet.clone()));
        }

        let mut handles = Vec::new();
        for (prefix, subnet) in schedules {
            let pipeline = self.pipeline.clone();
            let semaphore = self.concurrency.clone();
            let cancel = self.cancel.clone();

            let handle = tokio::spawn(async move {
                run_subnet_loop(pipeline, prefix, subnet, semaphore, cancel).await;
            });
            handles.push(handle);
        }

        tracing::info!(subnet_count = handles.len(), "Scheduler started");

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Subnet sweep task panicked");
            }
        }

        Ok(())
    }
}

/// Per-subnet sweep loop with its configured interval.
async fn run_subnet_loop(
    pipeline: Arc<SweepPipeline>,
    prefix: SubnetPrefix,
    subnet: SubnetSchedule,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) {
    let mut ticker = interval(Duration::from_secs(subnet.interval_secs));

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel.cancelled() => break,
        }

        let Ok(_permit) = semaphore.acquire().await else {
            break;
        };
        if cancel.is_cancelled() {
            break;
        }

        tracing::info!(
            subnet = %prefix,
            name = subnet.name.as_deref().unwrap_or(""),
            "Scheduled sweep triggered"
        );

        if let Err(e) = pipeline.run(prefix, &cancel).await {
            tracing::error!(subnet = %prefix, error = %e, "Scheduled sweep failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_store::HistoryStore;

    use crate::alert::NullAlerter;
    use crate::testutil::FakeProber;

    fn scheduler_with(config: AgentConfig, cancel: CancellationToken) -> SweepScheduler {
        let pipeline = SweepPipeline::new(
            &config,
            Arc::new(FakeProber::new()),
            HistoryStore::in_memory().unwrap(),
            Arc::new(NullAlerter),
        )
        .unwrap();
        SweepScheduler::new(config, pipeline, cancel)
    }

    fn schedule(prefix: &str, enabled: bool) -> SubnetSchedule {
        SubnetSchedule {
            prefix: prefix.to_string(),
            name: None,
            interval_secs: 3600,
            enabled,
        }
    }

    #[tokio::test]
    async fn malformed_prefix_is_fatal_before_probing() {
        let config = AgentConfig {
            subnets: vec![schedule("10.0.1.0/24", true)],
            ..AgentConfig::default()
        };
        let scheduler = scheduler_with(config, CancellationToken::new());
        assert!(scheduler.run().await.is_err());
    }

    #[tokio::test]
    async fn disabled_subnets_are_skipped_even_if_malformed() {
        let config = AgentConfig {
            subnets: vec![schedule("not-a-prefix", false)],
            ..AgentConfig::default()
        };
        let scheduler = scheduler_with(config, CancellationToken::new());
        assert!(scheduler.run().await.is_ok());
    }

    #[tokio::test]
    async fn cancelled_scheduler_drains() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let config = AgentConfig {
            subnets: vec![schedule("10.0.1", true)],
            ..AgentConfig::default()
        };
        let scheduler = scheduler_with(config, cancel);
        assert!(scheduler.run().await.is_ok());
    }
}
