use crate::command::Command;
use crate::labeling::scheduler::SettleScheduler;
use crate::labeling::{export, snapshot};
use crate::response::Response;
use crate::tree::Tree;
use crate::types::record::Snapshot;


/// Central runtime for one monitored tree. Dispatches commands to its
/// scheduler.
pub struct Sys<T: Tree> {
    scheduler: SettleScheduler<T>,
}


impl<T: Tree> Sys<T> {
    pub fn new(scheduler: SettleScheduler<T>) -> Sys<T> {
        Sys { scheduler }
    }

    pub fn scheduler(&self) -> &SettleScheduler<T> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut SettleScheduler<T> {
        &mut self.scheduler
    }

    pub fn into_scheduler(self) -> SettleScheduler<T> {
        self.scheduler
    }

    /// The single dispatch method. `now_ms` is the caller's clock.
    pub fn execute(&mut self, cmd: Command, now_ms: u64) -> Response {
        match cmd {
            Command::Status => self.cmd_status(now_ms),
            Command::Snapshot => self.cmd_snapshot(),
            Command::Labels => self.cmd_labels(),
            Command::RelabelNow => self.cmd_relabel_now(now_ms),
            Command::Export { annotations } => self.cmd_export(&annotations),
            Command::Help { topic } => self.cmd_help(topic),
        }
    }

    /// The published snapshot, or a read-only one taken from the tree when
    /// nothing has been published yet.
    pub fn current_snapshot(&self) -> Snapshot {
        let published = self.scheduler.snapshot();
        if !published.is_empty() {
            return published;
        }
        let tree = self.scheduler.tree();
        let container = self.scheduler.container().or_else(|| {
            crate::labeling::root::find_container(tree, self.scheduler.settings().max_ancestor_depth)
        });
        snapshot::peek(tree, container)
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    fn cmd_status(&self, now_ms: u64) -> Response {
        let s = &self.scheduler;
        let status = serde_json::json!({
            "state": s.state(now_ms),
            "running": s.is_running(),
            "container": s.container().is_some(),
            "items": s.snapshot().len(),
            "commits": s.commit_count(),
            "bring_up_pending": s.bring_up_pending(),
            "next_deadline_ms": s.next_deadline(),
        });
        Response::ok(status.to_string())
    }

    fn cmd_snapshot(&self) -> Response {
        match serde_json::to_string_pretty(&self.current_snapshot()) {
            Ok(json) => Response::ok(json),
            Err(e) => Response::error(format!("Failed to serialize snapshot: {}", e)),
        }
    }

    fn cmd_labels(&self) -> Response {
        let tree = self.scheduler.tree();
        let Some(container) = self.scheduler.container() else {
            return Response::ok("");
        };
        let lines: Vec<String> = tree
            .items(Some(container))
            .into_iter()
            .map(|node| tree.text(node).unwrap_or_default())
            .collect();
        Response::ok(lines.join("\n"))
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    fn cmd_relabel_now(&mut self, now_ms: u64) -> Response {
        match self.scheduler.relabel_now(now_ms) {
            Some(commit) => Response::ok(format!(
                "Relabeled {} items ({} writes)",
                commit.items, commit.writes
            )),
            None => Response::error("Monitor is stopped; nothing was relabeled"),
        }
    }

    fn cmd_export(&self, annotations: &[String]) -> Response {
        Response::ok(export::export_text(&self.current_snapshot(), annotations))
    }

    // -----------------------------------------------------------------------
    // Help
    // -----------------------------------------------------------------------

    fn cmd_help(&self, topic: Option<String>) -> Response {
        Response::ok(crate::help::help_text(topic.as_deref()))
    }
}
