//! Sharded event pipeline
//!
//! The dispatcher routes each incoming event to a worker shard keyed by
//! the path's hash, so all events for one path flow through one FIFO
//! queue while distinct paths run in parallel. Workers hand events to
//! `Tracker::process` and escalate fatal journal failures into the
//! shared stop signal.
//!
//! Shutdown contract: the stop signal closes intake, in-flight critical
//! sections finish, queued-but-unstarted events are discarded, the
//! journal is flushed, and the session counters come back to the caller.
//! If the event source closes on its own instead, workers drain their
//! queues completely before exiting.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

use vigil_watcher::RawEvent;

use crate::tracker::{Outcome, SessionStats, Tracker};

const SHARD_QUEUE_DEPTH: usize = 256;

/// Running pipeline. Dropping it without `shutdown` aborts nothing; call
/// `shutdown` to stop cleanly.
pub struct TrackerHandle {
    tracker: Arc<Tracker>,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
    dispatcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

/// Start the worker pool over `events`.
pub fn spawn_pipeline(
    tracker: Arc<Tracker>,
    events: mpsc::Receiver<RawEvent>,
) -> TrackerHandle {
    let shard_count = tracker.config().workers.max(1);
    let (stop_tx, stop_rx) = watch::channel(false);
    let stop_tx = Arc::new(stop_tx);

    let mut shard_txs = Vec::with_capacity(shard_count);
    let mut workers = Vec::with_capacity(shard_count);
    for shard in 0..shard_count {
        let (tx, rx) = mpsc::channel::<RawEvent>(SHARD_QUEUE_DEPTH);
        shard_txs.push(tx);
        workers.push(tokio::spawn(worker_loop(
            shard,
            tracker.clone(),
            rx,
            stop_rx.clone(),
            stop_tx.clone(),
        )));
    }

    let dispatcher = tokio::spawn(dispatch_loop(
        tracker.clone(),
        events,
        shard_txs,
        stop_rx.clone(),
    ));

    TrackerHandle {
        tracker,
        stop_tx,
        stop_rx,
        dispatcher,
        workers,
    }
}

impl TrackerHandle {
    /// A receiver that resolves to `true` once the pipeline is stopping,
    /// whether by request or by a fatal storage failure.
    pub fn stopped(&self) -> watch::Receiver<bool> {
        self.stop_rx.clone()
    }

    /// Stop intake, let in-flight work finish, flush the journal and
    /// return the session counters.
    pub async fn shutdown(self) -> Result<SessionStats> {
        let _ = self.stop_tx.send(true);

        let _ = self.dispatcher.await;
        for worker in self.workers {
            let _ = worker.await;
        }

        self.tracker
            .flush()
            .context("flushing the change journal")?;
        Ok(self.tracker.stats())
    }
}

async fn dispatch_loop(
    tracker: Arc<Tracker>,
    mut events: mpsc::Receiver<RawEvent>,
    shards: Vec<mpsc::Sender<RawEvent>>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        // Biased so a signaled stop beats queued events when both are ready.
        tokio::select! {
            biased;

            _ = stop.changed() => {
                if *stop.borrow() {
                    break;
                }
            }
            maybe = events.recv() => match maybe {
                Some(event) => {
                    let shard = tracker.shard_for(&event.path, shards.len());
                    if shards[shard].send(event).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }
    // Dropping the shard senders ends the workers' queues.
}

async fn worker_loop(
    shard: usize,
    tracker: Arc<Tracker>,
    mut queue: mpsc::Receiver<RawEvent>,
    mut stop: watch::Receiver<bool>,
    stop_tx: Arc<watch::Sender<bool>>,
) {
    loop {
        // Biased so a signaled stop beats queued events when both are ready.
        tokio::select! {
            biased;

            _ = stop.changed() => {
                if *stop.borrow() {
                    break;
                }
            }
            maybe = queue.recv() => match maybe {
                Some(event) => {
                    let path = event.path.clone();
                    match tracker.process(event).await {
                        Ok(Outcome::Recorded(notice)) => {
                            debug!(shard, seq = notice.seq, path = %notice.record.path, "change recorded");
                        }
                        Ok(Outcome::Skipped(reason)) => {
                            trace!(shard, path = %path.display(), ?reason, "event skipped");
                        }
                        Err(e) if e.is_fatal() => {
                            error!(shard, error = %e, "unrecoverable journal failure, stopping session");
                            tracker.mark_fatal();
                            let _ = stop_tx.send(true);
                        }
                        Err(e) => {
                            warn!(shard, path = %path.display(), error = %e, "event dropped");
                        }
                    }
                }
                None => break,
            },
        }
    }
}
