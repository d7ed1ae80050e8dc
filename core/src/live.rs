//! Live driver — run a scheduler against real time on a single task.
//!
//! Inputs arrive over an mpsc channel; timers are served with `sleep_until`
//! on the scheduler's next deadline. Everything happens on the one task, so
//! the scheduler needs no locking. Each committed pass is published through a
//! `watch` channel, which hands readers a whole `Snapshot` or nothing.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};

use crate::labeling::scheduler::{Commit, SettleScheduler};
use crate::tree::{ChangeBatch, Tree};
use crate::types::record::Snapshot;


/// A mutation applied to the tree on the driver's task.
pub type Mutation<T> = Box<dyn FnOnce(&mut T) + Send>;


pub enum LiveInput<T: Tree> {
    /// Notifications from a host observer.
    Changes(ChangeBatch<T::Node>),
    /// Mutate the tree; the resulting changes are observed like any other.
    Mutate(Mutation<T>),
    /// Relabel immediately.
    RelabelNow,
    /// Stop the driver and hand the scheduler back.
    Shutdown,
}


/// Drive `scheduler` until `Shutdown` arrives or every sender is dropped.
///
/// Returns the scheduler (stopped) together with every commit made.
pub async fn run_live<T>(
    mut scheduler: SettleScheduler<T>,
    mut inputs: mpsc::Receiver<LiveInput<T>>,
    publish: watch::Sender<Snapshot>,
) -> (SettleScheduler<T>, Vec<Commit>)
where
    T: Tree,
{
    let epoch = Instant::now();
    let now_ms = move || Instant::now().duration_since(epoch).as_millis() as u64;
    let mut commits = Vec::new();

    scheduler.start(now_ms());
    loop {
        let deadline = scheduler.next_deadline();
        let wake = epoch + Duration::from_millis(deadline.unwrap_or(0));

        let committed = tokio::select! {
            input = inputs.recv() => match input {
                None | Some(LiveInput::Shutdown) => break,
                Some(LiveInput::Changes(batch)) => {
                    scheduler.observe(&batch, now_ms());
                    None
                }
                Some(LiveInput::Mutate(mutate)) => {
                    mutate(scheduler.tree_mut());
                    None
                }
                Some(LiveInput::RelabelNow) => scheduler.relabel_now(now_ms()),
            },
            () = sleep_until(wake), if deadline.is_some() => scheduler.tick(now_ms()),
        };
        scheduler.pump(now_ms());

        if let Some(commit) = committed {
            // A closed receiver only means nobody is reading.
            let _ = publish.send(scheduler.snapshot());
            commits.push(commit);
        }
    }

    scheduler.stop();
    tracing::info!(target: "settle::live", commits = commits.len(), "live driver stopped");
    (scheduler, commits)
}
