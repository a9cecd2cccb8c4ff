//! Background execution of jobs with a polled status store.
//!
//! Jobs run on Tokio's blocking pool. Callers receive a [`TaskId`] straight
//! away and poll [`TaskStatusStore::status`] for progress and the outcome.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::{
    ExportCommand, Progress, ProgressMeta, ProgressReporter, SYNC_RANDO_TASK, SyncRandoSettings,
    TaskHandle, TaskResult, TaskState, launch_sync_rando,
};

/// Identifier assigned to a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Polled status of a task.
///
/// Serialises as `{state, meta}` while running and `{state, result}` once
/// finished successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    /// Current lifecycle state.
    pub state: TaskState,
    /// Latest progress payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ProgressMeta>,
    /// Result of a successful task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
    /// Error message of a failed task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskStatus {
    const fn pending() -> Self {
        Self {
            state: TaskState::Pending,
            meta: None,
            result: None,
            error: None,
        }
    }
}

/// Shared, thread-safe map from task identifier to status.
#[derive(Debug, Clone, Default)]
pub struct TaskStatusStore {
    statuses: Arc<Mutex<HashMap<TaskId, TaskStatus>>>,
}

impl TaskStatusStore {
    /// Latest status of `id`, if it was ever submitted.
    pub fn status(&self, id: TaskId) -> Option<TaskStatus> {
        self.lock().get(&id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TaskId, TaskStatus>> {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, id: TaskId, status: TaskStatus) {
        self.lock().insert(id, status);
    }

    fn update(&self, id: TaskId, apply: impl FnOnce(&mut TaskStatus)) {
        if let Some(status) = self.lock().get_mut(&id)
            && !status.state.is_terminal()
        {
            apply(status);
        }
    }
}

/// Progress reporter writing into the status store for one task.
#[derive(Debug, Clone)]
struct StoreReporter {
    store: TaskStatusStore,
    id: TaskId,
}

impl ProgressReporter for StoreReporter {
    fn report(&self, stage: &str, progress: Progress, message: &str) {
        self.store.update(self.id, |status| {
            status.state = TaskState::Progress;
            status.meta = Some(ProgressMeta::new(stage, progress, message));
        });
    }
}

/// Dispatches jobs onto Tokio's blocking pool.
#[derive(Debug, Default)]
pub struct TaskRunner {
    statuses: TaskStatusStore,
    next_id: AtomicU64,
}

impl TaskRunner {
    /// Runner with an empty status store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store callers poll for task status.
    pub const fn statuses(&self) -> &TaskStatusStore {
        &self.statuses
    }

    /// Submit `job` under the registered `name`.
    ///
    /// Must be called from within a Tokio runtime. The returned join handle
    /// completes once the final status has been recorded. A panicking job is
    /// recorded as a failure carrying the panic message.
    pub fn submit<F, E>(&self, name: &str, job: F) -> (TaskId, JoinHandle<()>)
    where
        F: FnOnce(&TaskHandle) -> Result<TaskResult, E> + Send + 'static,
        E: std::error::Error + Send + 'static,
    {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.statuses.insert(id, TaskStatus::pending());
        let reporter = StoreReporter {
            store: self.statuses.clone(),
            id,
        };
        let handle = TaskHandle::new(name, Arc::new(reporter));
        let store = self.statuses.clone();
        info!("task {id} ({name}) submitted");
        let join = tokio::task::spawn_blocking(move || {
            let outcome = catch_unwind(AssertUnwindSafe(|| job(&handle)));
            store.update(id, |status| match outcome {
                Ok(Ok(result)) => {
                    info!("task {id} ({}) succeeded", handle.name());
                    status.state = TaskState::Success;
                    status.result = Some(result);
                }
                Ok(Err(err)) => {
                    warn!("task {id} ({}) failed: {err}", handle.name());
                    status.state = TaskState::Failure;
                    status.error = Some(err.to_string());
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!("task {id} ({}) panicked: {message}", handle.name());
                    status.state = TaskState::Failure;
                    status.error = Some(message);
                }
            });
        });
        (id, join)
    }

    /// Submit the "sync rando" export job.
    pub fn submit_sync_rando(
        &self,
        settings: SyncRandoSettings,
        url: Option<String>,
        command: Arc<dyn ExportCommand>,
    ) -> (TaskId, JoinHandle<()>) {
        self.submit(SYNC_RANDO_TASK, move |task| {
            launch_sync_rando(&settings, url.as_deref(), command.as_ref(), task)
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "task panicked".to_owned())
}
