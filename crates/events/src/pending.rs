use crate::messages::{Task, TaskId, TaskKind, TaskResult};
use chrono::{DateTime, Utc};

/// Caller-owned handle for a submitted task.
///
/// The execution context never tracks which request a caller considers current;
/// the caller keeps this token and checks each incoming result against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRequest {
    pub task_id: TaskId,
    pub kind: TaskKind,
    pub submitted_at: DateTime<Utc>,
}

impl PendingRequest {
    pub fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.id,
            kind: task.kind(),
            submitted_at: task.submitted_at,
        }
    }

    pub fn matches(&self, result: &TaskResult) -> bool {
        result.task_id == self.task_id
    }
}

/// Tracks the single request a caller currently cares about, e.g. the latest
/// recompute triggered by a dashboard filter change.
#[derive(Debug, Default)]
pub struct ActiveRequest {
    current: Option<PendingRequest>,
}

impl ActiveRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `request` current and hands back the one it supersedes, which the
    /// caller will usually cancel.
    pub fn replace(&mut self, request: PendingRequest) -> Option<PendingRequest> {
        self.current.replace(request)
    }

    pub fn current(&self) -> Option<&PendingRequest> {
        self.current.as_ref()
    }

    /// Returns the result only if it belongs to the current request, clearing it.
    /// Stale results are dropped.
    pub fn accept(&mut self, result: TaskResult) -> Option<TaskResult> {
        match self.current {
            Some(pending) if pending.matches(&result) => {
                self.current = None;
                Some(result)
            }
            _ => {
                tracing::debug!(task_id = %result.task_id, "Discarding stale task result.");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pending(kind: TaskKind) -> PendingRequest {
        PendingRequest {
            task_id: TaskId::new(),
            kind,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn stale_results_are_discarded() {
        let mut active = ActiveRequest::new();
        let first = pending(TaskKind::CausalRecompute);
        let second = pending(TaskKind::CausalRecompute);

        assert!(active.replace(first).is_none());
        assert_eq!(active.replace(second), Some(first));

        let stale = TaskResult::failure(first.task_id, "late", Duration::ZERO);
        assert!(active.accept(stale).is_none());

        let fresh = TaskResult::failure(second.task_id, "done", Duration::ZERO);
        assert!(active.accept(fresh).is_some());
        assert!(active.current().is_none());
    }
}
