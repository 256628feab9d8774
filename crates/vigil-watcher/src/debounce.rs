//! Per-path debouncing
//!
//! A single editor save usually arrives as a burst of raw notifications.
//! The debouncer holds the newest event per path until that path has been
//! quiet for one full window, then releases a single coalesced event
//! downstream. Distinct paths have independent timers. When the input
//! side closes, everything still pending is released immediately.

use crate::RawEvent;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// Default quiet window between a burst and its release.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(200);

/// Spawn the debounce stage, returning its output stream.
pub fn spawn(input: mpsc::Receiver<RawEvent>, window: Duration) -> mpsc::Receiver<RawEvent> {
    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(run(input, tx, window));
    rx
}

async fn run(
    mut input: mpsc::Receiver<RawEvent>,
    output: mpsc::Sender<RawEvent>,
    window: Duration,
) {
    let mut pending: HashMap<PathBuf, Pending> = HashMap::new();

    loop {
        let next_deadline = pending.values().map(|p| p.deadline).min();

        tokio::select! {
            maybe = input.recv() => match maybe {
                Some(ev) => {
                    let deadline = Instant::now() + window;
                    pending
                        .entry(ev.path)
                        .and_modify(|p| {
                            p.kind = p.kind.coalesce(ev.kind);
                            p.deadline = deadline;
                        })
                        .or_insert(Pending { kind: ev.kind, deadline });
                }
                None => break,
            },
            _ = sleep_until(next_deadline.unwrap_or_else(Instant::now)), if next_deadline.is_some() => {
                let now = Instant::now();
                let due: Vec<PathBuf> = pending
                    .iter()
                    .filter(|(_, p)| p.deadline <= now)
                    .map(|(path, _)| path.clone())
                    .collect();
                for path in due {
                    if let Some(p) = pending.remove(&path) {
                        let released = RawEvent { path, kind: p.kind };
                        if output.send(released).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    }

    // Input closed; drain whatever is still waiting on a timer.
    for (path, p) in pending.drain() {
        let released = RawEvent { path, kind: p.kind };
        if output.send(released).await.is_err() {
            return;
        }
    }
}

struct Pending {
    kind: crate::RawEventKind,
    deadline: Instant,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawEventKind;
    use std::time::Duration;

    const WINDOW: Duration = Duration::from_millis(50);

    async fn recv_soon(rx: &mut mpsc::Receiver<RawEvent>) -> Option<RawEvent> {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test]
    async fn test_burst_collapses_to_one_event() {
        let (tx, input) = mpsc::channel(32);
        let mut out = spawn(input, WINDOW);

        for _ in 0..5 {
            tx.send(RawEvent {
                path: PathBuf::from("/w/a.txt"),
                kind: RawEventKind::Modified,
            })
            .await
            .unwrap();
        }

        let ev = recv_soon(&mut out).await.unwrap();
        assert_eq!(ev.path, PathBuf::from("/w/a.txt"));
        assert_eq!(ev.kind, RawEventKind::Modified);

        // Nothing else queued for that burst.
        tokio::time::sleep(WINDOW * 3).await;
        assert!(out.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_created_wins_coalescing() {
        let (tx, input) = mpsc::channel(32);
        let mut out = spawn(input, WINDOW);

        let path = PathBuf::from("/w/new.txt");
        tx.send(RawEvent { path: path.clone(), kind: RawEventKind::Created }).await.unwrap();
        tx.send(RawEvent { path: path.clone(), kind: RawEventKind::Modified }).await.unwrap();
        tx.send(RawEvent { path: path.clone(), kind: RawEventKind::Modified }).await.unwrap();

        let ev = recv_soon(&mut out).await.unwrap();
        assert_eq!(ev.kind, RawEventKind::Created);
    }

    #[tokio::test]
    async fn test_distinct_paths_released_independently() {
        let (tx, input) = mpsc::channel(32);
        let mut out = spawn(input, WINDOW);

        tx.send(RawEvent { path: PathBuf::from("/w/a"), kind: RawEventKind::Modified }).await.unwrap();
        tx.send(RawEvent { path: PathBuf::from("/w/b"), kind: RawEventKind::Modified }).await.unwrap();

        let first = recv_soon(&mut out).await.unwrap();
        let second = recv_soon(&mut out).await.unwrap();
        let mut paths = vec![first.path, second.path];
        paths.sort();
        assert_eq!(paths, vec![PathBuf::from("/w/a"), PathBuf::from("/w/b")]);
    }

    #[tokio::test]
    async fn test_separate_bursts_become_separate_events() {
        let (tx, input) = mpsc::channel(32);
        let mut out = spawn(input, WINDOW);
        let path = PathBuf::from("/w/a.txt");

        tx.send(RawEvent { path: path.clone(), kind: RawEventKind::Modified }).await.unwrap();
        assert!(recv_soon(&mut out).await.is_some());

        tokio::time::sleep(WINDOW * 2).await;
        tx.send(RawEvent { path: path.clone(), kind: RawEventKind::Modified }).await.unwrap();
        assert!(recv_soon(&mut out).await.is_some());
    }

    #[tokio::test]
    async fn test_close_drains_pending() {
        let (tx, input) = mpsc::channel(32);
        let mut out = spawn(input, Duration::from_secs(60));

        tx.send(RawEvent { path: PathBuf::from("/w/a"), kind: RawEventKind::Created }).await.unwrap();
        drop(tx);

        // Released without waiting out the one-minute window.
        let ev = recv_soon(&mut out).await.unwrap();
        assert_eq!(ev.kind, RawEventKind::Created);
        assert!(out.recv().await.is_none());
    }
}
