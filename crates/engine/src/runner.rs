use crate::error::EngineError;
use crate::executor::{AnalyticsExecutor, TaskExecutor};
use configuration::Settings;
use core_types::Priority;
use events::{PendingRequest, Task, TaskEnvelope, TaskId, TaskResult};
use std::any::Any;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};

enum Command {
    Submit(Task),
    Cancel(TaskId),
}

/// Caller-side handle to the background execution context.
///
/// Tasks are queued by priority (high, then medium, then low; FIFO within a
/// priority) and run on tokio's blocking pool, at most `workers` at a time.
/// Results arrive on the receiver returned by [`TaskRunner::start`].
pub struct TaskRunner {
    commands: mpsc::UnboundedSender<Command>,
    dispatcher: JoinHandle<()>,
}

impl TaskRunner {
    /// Starts a runner that executes tasks with the analytics engines.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(settings: Settings) -> Result<(Self, mpsc::Receiver<TaskResult>), EngineError> {
        settings.validate()?;
        let workers = settings.worker.effective_workers();
        let buffer = settings.worker.result_buffer;
        Ok(Self::with_executor(
            Arc::new(AnalyticsExecutor::new(settings)),
            workers,
            buffer,
        ))
    }

    /// Starts a runner around a custom executor.
    pub fn with_executor(
        executor: Arc<dyn TaskExecutor>,
        workers: usize,
        result_buffer: usize,
    ) -> (Self, mpsc::Receiver<TaskResult>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::channel(result_buffer.max(1));

        let dispatcher = Dispatcher {
            executor,
            workers: workers.max(1),
            results: result_tx,
            queue: BinaryHeap::new(),
            sequence: 0,
            known: HashSet::new(),
            cancelled: HashSet::new(),
        };
        tracing::info!(workers = dispatcher.workers, "Task runner started.");
        let dispatcher = tokio::spawn(dispatcher.run(command_rx));

        (
            Self {
                commands: command_tx,
                dispatcher,
            },
            result_rx,
        )
    }

    /// Hands `task` to the execution context and returns the caller's token for it.
    pub fn submit(&self, task: Task) -> Result<PendingRequest, EngineError> {
        let pending = PendingRequest::from_task(&task);
        self.commands
            .send(Command::Submit(task))
            .map_err(|_| EngineError::RunnerClosed)?;
        Ok(pending)
    }

    /// Decodes a raw envelope and submits it. Unknown kinds and payloads that do
    /// not match their kind are rejected here, before anything is queued.
    pub fn submit_envelope(&self, envelope: TaskEnvelope) -> Result<PendingRequest, EngineError> {
        let task = Task::try_from(envelope)?;
        self.submit(task)
    }

    /// Requests cancellation. A queued task is dropped without running; a running
    /// task finishes but its result is never delivered.
    pub fn cancel(&self, task_id: TaskId) -> Result<(), EngineError> {
        self.commands
            .send(Command::Cancel(task_id))
            .map_err(|_| EngineError::RunnerClosed)
    }

    /// Stops accepting commands, runs everything already queued, and waits for
    /// the dispatcher to hand the last result to the result stream, which then
    /// closes.
    ///
    /// The result stream is bounded, so when more results are outstanding than
    /// it can buffer the caller must keep reading it while this future runs.
    /// [`shutdown_and_collect`](Self::shutdown_and_collect) does both.
    pub async fn shutdown(self) -> Result<(), EngineError> {
        drop(self.commands);
        self.dispatcher.await?;
        Ok(())
    }

    /// Shuts down while draining `results`, returning every result delivered
    /// after the call in arrival order.
    pub async fn shutdown_and_collect(
        self,
        mut results: mpsc::Receiver<TaskResult>,
    ) -> Result<Vec<TaskResult>, EngineError> {
        let collect = async move {
            let mut collected = Vec::new();
            while let Some(result) = results.recv().await {
                collected.push(result);
            }
            collected
        };
        let (shutdown, collected) = tokio::join!(self.shutdown(), collect);
        shutdown?;
        Ok(collected)
    }
}

struct Queued {
    priority: Priority,
    sequence: u64,
    task: Task,
    dequeued: Option<Instant>,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    // Max-heap: higher priority first, then the earlier submission.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

struct Dispatcher {
    executor: Arc<dyn TaskExecutor>,
    workers: usize,
    results: mpsc::Sender<TaskResult>,
    queue: BinaryHeap<Queued>,
    sequence: u64,
    /// Queued or running.
    known: HashSet<TaskId>,
    cancelled: HashSet<TaskId>,
}

impl Dispatcher {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut running: JoinSet<TaskResult> = JoinSet::new();
        let mut accepting = true;

        loop {
            self.dispatch(&mut running);
            if !accepting && running.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                command = commands.recv(), if accepting => match command {
                    Some(Command::Submit(task)) => self.enqueue(task),
                    Some(Command::Cancel(task_id)) => self.cancel(task_id),
                    None => {
                        tracing::info!(queued = self.queue.len(), "Task runner draining.");
                        accepting = false;
                    }
                },
                Some(joined) = running.join_next() => self.complete(joined).await,
                else => break,
            }
        }

        tracing::info!("Task runner stopped.");
    }

    fn enqueue(&mut self, task: Task) {
        if !self.known.insert(task.id) {
            tracing::warn!(task_id = %task.id, "Duplicate task id; ignoring submission.");
            return;
        }
        tracing::debug!(
            task_id = %task.id,
            kind = %task.kind(),
            priority = ?task.priority,
            "Task queued."
        );
        self.sequence += 1;
        self.queue.push(Queued {
            priority: task.priority,
            sequence: self.sequence,
            task,
            dequeued: None,
        });
    }

    fn cancel(&mut self, task_id: TaskId) {
        if self.known.contains(&task_id) {
            tracing::debug!(task_id = %task_id, "Task cancelled.");
            self.cancelled.insert(task_id);
        } else {
            tracing::debug!(task_id = %task_id, "Cancel for unknown or finished task ignored.");
        }
    }

    fn dispatch(&mut self, running: &mut JoinSet<TaskResult>) {
        while running.len() < self.workers {
            let Some(mut next) = self.queue.pop() else {
                break;
            };
            let task_id = next.task.id;
            if self.cancelled.remove(&task_id) {
                self.known.remove(&task_id);
                tracing::debug!(task_id = %task_id, "Skipping cancelled task.");
                continue;
            }

            next.dequeued = Some(Instant::now());
            let executor = Arc::clone(&self.executor);
            running.spawn_blocking(move || run_task(executor.as_ref(), next));
        }
    }

    async fn complete(&mut self, joined: Result<TaskResult, JoinError>) {
        let result = match joined {
            Ok(result) => result,
            Err(e) => {
                // Panics are caught inside the task, so this only happens on abort.
                tracing::error!(error = %e, "Worker task did not complete.");
                return;
            }
        };

        self.known.remove(&result.task_id);
        if self.cancelled.remove(&result.task_id) {
            tracing::debug!(task_id = %result.task_id, "Suppressing result of cancelled task.");
            return;
        }

        if self.results.send(result).await.is_err() {
            tracing::warn!("Result receiver dropped; discarding task result.");
        }
    }
}

/// Runs one task to completion. Errors and panics both become a failed result.
fn run_task(executor: &dyn TaskExecutor, queued: Queued) -> TaskResult {
    let started = queued.dequeued.unwrap_or_else(Instant::now);
    let Task { id, payload, .. } = queued.task;
    let kind = payload.kind();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| executor.execute(payload)));
    let elapsed = started.elapsed();

    match outcome {
        Ok(Ok(output)) => {
            tracing::debug!(
                task_id = %id,
                %kind,
                elapsed_ms = elapsed.as_millis() as u64,
                "Task succeeded."
            );
            TaskResult::success(id, output, elapsed)
        }
        Ok(Err(e)) => {
            tracing::warn!(task_id = %id, %kind, error = %e, "Task failed.");
            TaskResult::failure(id, e.to_string(), elapsed)
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(task_id = %id, %kind, panic = %message, "Task panicked.");
            TaskResult::failure(id, format!("task panicked: {message}"), elapsed)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
