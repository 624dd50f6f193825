//! FIFO task channel between the heartbeat/command callers and the worker

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Notify};

use crate::errors::AgentError;
use crate::models::action::MowerAction;
use crate::utils::generate_uuid;

/// Work requested from the worker
#[derive(Debug, Clone, PartialEq)]
pub enum TaskKind {
    Login,
    RefreshDeviceList,
    RefreshStatus,
    Action { mower_name: String, action: MowerAction },
    /// Releases the session and stops the worker
    Shutdown,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Login => f.write_str("Login"),
            TaskKind::RefreshDeviceList => f.write_str("RefreshDeviceList"),
            TaskKind::RefreshStatus => f.write_str("RefreshStatus"),
            TaskKind::Action { mower_name, action } => write!(f, "{} ({})", action, mower_name),
            TaskKind::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// A queued task with its correlation id
#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    pub kind: TaskKind,
}

impl Task {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            id: generate_uuid(),
            kind,
        }
    }
}

/// Create a connected producer/consumer pair
pub fn task_queue() -> (TaskQueue, TaskReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pending = Arc::new(AtomicUsize::new(0));
    let idle = Arc::new(Notify::new());

    (
        TaskQueue {
            tx,
            pending: pending.clone(),
            idle: idle.clone(),
        },
        TaskReceiver { rx, pending, idle },
    )
}

/// Producer side, cheap to clone
#[derive(Debug, Clone)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<Task>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl TaskQueue {
    /// Queue a task, returning its id
    pub fn enqueue(&self, kind: TaskKind) -> Result<String, AgentError> {
        let task = Task::new(kind);
        let id = task.id.clone();

        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(task).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(AgentError::ShutdownError("task worker is gone".to_string()));
        }
        Ok(id)
    }

    /// Tasks queued or being handled
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Wait until every queued task has been marked done
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Consumer side, owned by the single worker
#[derive(Debug)]
pub struct TaskReceiver {
    rx: mpsc::UnboundedReceiver<Task>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl TaskReceiver {
    /// Next task in FIFO order; `None` once every producer is dropped
    pub async fn next(&mut self) -> Option<Task> {
        self.rx.recv().await
    }

    /// Acknowledge one task taken with [`TaskReceiver::next`]
    pub fn task_done(&self) {
        let previous = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        if previous <= 1 {
            self.idle.notify_waiters();
        }
    }
}
