//! Fixed-rate scheduling of workers. Invocations of one worker are not
//! serialized: a slow target leaves several requests of the same worker in
//! flight, so do not add a lock here.

use crate::error::{Error, Result};
use crate::model::{Config, RequestTemplate, WorkerIdentity};
use crate::output::RecordSender;
use crate::worker::Worker;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Owns the schedules of all workers. Dropping it stops every schedule.
pub struct Dispatcher {
    identities: Vec<WorkerIdentity>,
    shutdown: watch::Sender<bool>,
    schedules: JoinSet<()>,
}

impl Dispatcher {
    /// Must be called from within a tokio runtime.
    pub fn start(config: &Config, template: RequestTemplate, tx: RecordSender) -> Result<Self> {
        if config.workers < 1 {
            return Err(Error::InvalidConfiguration(format!(
                "worker count must be at least 1, got {}",
                config.workers
            )));
        }

        let template = Arc::new(template);
        let workers = (0..config.workers)
            .map(|rank| {
                Worker::new(WorkerIdentity::from(rank), template.clone(), tx.clone()).map(Arc::new)
            })
            .collect::<Result<Vec<_>>>()?;
        let identities = workers.iter().map(|w| w.identity().clone()).collect();

        // client construction is slow; taking `start` earlier leaves a backlog of ticks
        let period = config.period();
        let (shutdown, _) = watch::channel(false);
        let start = Instant::now();

        let mut schedules = JoinSet::new();
        for worker in workers {
            schedules.spawn(schedule(start, period, shutdown.subscribe(), move || {
                let worker = worker.clone();
                async move { worker.run().await }
            }));
        }

        info!(
            workers = config.workers,
            period_ms = config.period_ms,
            url = %template.url,
            "schedules started"
        );

        Ok(Self {
            identities,
            shutdown,
            schedules,
        })
    }

    pub fn identities(&self) -> &[WorkerIdentity] {
        &self.identities
    }

    /// In-flight invocations are aborted.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    pub async fn join(&mut self) {
        while let Some(res) = self.schedules.join_next().await {
            if let Err(e) = res {
                if e.is_panic() {
                    error!("schedule task panicked: {}", e);
                }
            }
        }
        info!("schedules stopped");
    }

    pub async fn shutdown(mut self) {
        self.stop();
        self.join().await;
    }

    /// Drives `printer` alongside the schedules. A printer error stops every
    /// schedule and is returned.
    pub async fn run_with_printer<P>(mut self, printer: P) -> Result<()>
    where
        P: Future<Output = Result<u64>>,
    {
        let res = tokio::select! {
            res = printer => res,
            _ = self.join() => return Ok(()),
        };
        self.shutdown().await;
        res.map(|_| ())
    }
}

/// A zero period runs the invocations back to back instead.
pub async fn schedule<F, Fut>(
    start: Instant,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut invoke: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    if period.is_zero() {
        loop {
            let mut handle = tokio::spawn(invoke());
            tokio::select! {
                _ = shutdown.changed() => {
                    handle.abort();
                    break;
                }
                res = &mut handle => {
                    if let Err(e) = res {
                        if e.is_panic() {
                            error!("invocation panicked: {}", e);
                        }
                    }
                }
            }
            tokio::task::yield_now().await;
        }
        debug!("back-to-back schedule stopped");
        return;
    }

    let mut ticker = time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    let mut in_flight = JoinSet::new();
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                while in_flight.try_join_next().is_some() {}
                in_flight.spawn(invoke());
            }
        }
    }
    debug!(in_flight = in_flight.len(), "schedule stopped");
}
