use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::commands::giveaway::SharedStore;
use crate::commands::giveaway::terminator::{TerminationOutcome, Terminator};

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct SweepReport {
    // Active giveaways past their end time
    pub due: usize,
    // Giveaways closed by this sweep
    pub ended: usize,
    // Already ended, missing or claimed by another termination
    pub skipped: usize,
    pub failed: usize,
}

// Periodically closes every giveaway whose end time has passed. The end time
// lives in the store, so nothing is lost across restarts: giveaways that
// expired while the bot was down are closed by the first sweep.
#[derive(Clone)]
pub struct Sweeper {
    store: SharedStore,
    terminator: Terminator,
    interval: Duration,
}

impl Sweeper {
    pub fn new(store: SharedStore, terminator: Terminator, interval: Duration) -> Self {
        Sweeper {
            store,
            terminator,
            interval,
        }
    }

    // Sweeps right away, then again `interval` after each sweep finishes.
    pub async fn run(self) {
        info!("Starting the giveaway sweeper (every {:?})", self.interval);
        loop {
            let report = self.sweep_once(Utc::now()).await;
            if report.due > 0 {
                info!(
                    "Sweep finished: {} due, {} ended, {} skipped, {} failed",
                    report.due, report.ended, report.skipped, report.failed
                );
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    pub async fn sweep_once(&self, now: DateTime<Utc>) -> SweepReport {
        let active = match self.store.scan_active().await {
            Ok(active) => active,
            Err(err) => {
                error!("Can't scan active giveaways: {}", err);
                return SweepReport::default();
            }
        };

        let due = active
            .into_iter()
            .filter(|giveaway| giveaway.is_due(now))
            .map(|giveaway| giveaway.id)
            .collect::<Vec<String>>();
        let mut report = SweepReport {
            due: due.len(),
            ..SweepReport::default()
        };

        // One task per giveaway, awaited in turn: a panic stays inside it.
        for id in due {
            let terminator = self.terminator.clone();
            let task_id = id.clone();
            let task = tokio::spawn(async move { terminator.terminate(&task_id).await });

            match task.await {
                Ok(Ok(outcome)) => match outcome {
                    TerminationOutcome::Missing
                    | TerminationOutcome::AlreadyEnded
                    | TerminationOutcome::InProgress => {
                        debug!("Skipped giveaway {}: {:?}", id, outcome);
                        report.skipped += 1;
                    }
                    _ => report.ended += 1,
                },
                Ok(Err(err)) => {
                    error!("Can't terminate giveaway {}: {}", id, err);
                    report.failed += 1;
                }
                Err(err) => {
                    error!("Termination of giveaway {} crashed: {}", id, err);
                    report.failed += 1;
                }
            }
        }

        report
    }
}
