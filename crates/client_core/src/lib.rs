//! Client-side synchronization engine for the task service.
//!
//! [`TaskSyncClient`] owns the authoritative local view of the task list
//! ([`TaskStore`]) and issues one HTTP round trip per user action against the
//! remote service. Every mutation is response-driven, never optimistic: the
//! local list changes only after the server confirms, so the rendered list
//! never shows a state the server did not produce. On any failure the list is
//! left in its last-known-good state and the caller retries by re-invoking
//! the same action.

use std::{collections::HashSet, fmt};

use reqwest::Client;
use shared::{
    domain::{Task, TaskId},
    protocol::CreateTaskRequest,
};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

pub mod store;

pub use store::{TaskListState, TaskStore};

/// Operation classes the controller runs against the service. Tags errors and
/// failure events so callers can tell which round trip failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LoadAll,
    Create,
    Toggle,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::LoadAll => "load_all",
            Operation::Create => "create",
            Operation::Toggle => "toggle",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Failure of a single sync operation. Transport faults and non-2xx statuses
/// collapse into [`SyncError::Request`]; finer-grained recovery is not needed
/// at this boundary.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{op} round trip failed: {source}")]
    Request {
        op: Operation,
        #[source]
        source: reqwest::Error,
    },
    #[error("{op} already in flight for task {id}")]
    MutationInFlight { op: Operation, id: TaskId },
}

/// Change notifications for the rendering layer: one event per applied store
/// mutation, plus one per failed round trip.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    LoadingChanged(bool),
    ListReplaced(Vec<Task>),
    TaskAppended(Task),
    TaskCompletionChanged { id: TaskId, completed: bool },
    TaskRemoved(TaskId),
    OperationFailed { op: Operation, message: String },
}

/// Bridges user intent to remote operations and keeps the [`TaskStore`]
/// consistent with confirmed server state.
///
/// Operations targeting different tasks may run concurrently; a duplicate
/// mutation for the same `(operation, id)` pair is refused while the first is
/// still awaiting its response. Frontends disable the matching control via
/// [`TaskSyncClient::is_mutation_in_flight`].
pub struct TaskSyncClient {
    http: Client,
    base_url: String,
    store: Mutex<TaskStore>,
    inflight_mutations: Mutex<HashSet<(Operation, TaskId)>>,
    events: broadcast::Sender<SyncEvent>,
}

impl TaskSyncClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            store: Mutex::new(TaskStore::new()),
            inflight_mutations: Mutex::new(HashSet::new()),
            events,
        }
    }

    /// Copy of the current task list state for rendering.
    pub async fn snapshot(&self) -> TaskListState {
        self.store.lock().await.state().clone()
    }

    /// True while a mutation targeting `id` is awaiting its response.
    pub async fn is_mutation_in_flight(&self, id: &TaskId) -> bool {
        let inflight = self.inflight_mutations.lock().await;
        inflight.iter().any(|(_, held)| held == id)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Replaces the local list with the server's current one. The loading
    /// flag is raised for the duration of the fetch and cleared again whether
    /// the round trip succeeds or fails.
    pub async fn load_all(&self) -> Result<(), SyncError> {
        self.set_loading(true).await;
        let result = self.fetch_list().await;
        self.set_loading(false).await;

        let tasks = result.map_err(|err| self.report_failure(Operation::LoadAll, err))?;
        self.store.lock().await.replace_all(tasks.clone());
        let _ = self.events.send(SyncEvent::ListReplaced(tasks));
        Ok(())
    }

    /// Creates a task from `title` and appends the server-returned record,
    /// with the server-assigned id and `completed = false`.
    ///
    /// Whitespace-only titles are dropped without touching the network and
    /// yield `Ok(None)`, so the caller keeps the typed text for a retry.
    pub async fn create(&self, title: &str) -> Result<Option<Task>, SyncError> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(None);
        }

        let task = self
            .post_create(title.to_string())
            .await
            .map_err(|err| self.report_failure(Operation::Create, err))?;
        self.store.lock().await.append(task.clone());
        let _ = self.events.send(SyncEvent::TaskAppended(task.clone()));
        Ok(Some(task))
    }

    /// Flips completion for `id` on the server and applies the confirmed
    /// value locally. When the 2xx response echoes the updated task, its
    /// `completed` value is assigned directly; a bare 2xx falls back to
    /// flipping the prior local value. Returns the applied value.
    pub async fn toggle(&self, id: &TaskId) -> Result<bool, SyncError> {
        self.begin_mutation(Operation::Toggle, id).await?;
        let result = self.put_toggle(id).await;
        self.finish_mutation(Operation::Toggle, id).await;

        let echoed = result.map_err(|err| self.report_failure(Operation::Toggle, err))?;
        let completed = {
            let mut store = self.store.lock().await;
            let completed = match echoed {
                Some(task) => task.completed,
                None => !store.find(id).map(|task| task.completed).unwrap_or(false),
            };
            store.update_completion(id, completed);
            completed
        };
        let _ = self.events.send(SyncEvent::TaskCompletionChanged {
            id: id.clone(),
            completed,
        });
        Ok(completed)
    }

    /// Deletes `id` on the server, then removes it locally.
    pub async fn delete(&self, id: &TaskId) -> Result<(), SyncError> {
        self.begin_mutation(Operation::Delete, id).await?;
        let result = self.send_delete(id).await;
        self.finish_mutation(Operation::Delete, id).await;

        result.map_err(|err| self.report_failure(Operation::Delete, err))?;
        self.store.lock().await.remove(id);
        let _ = self.events.send(SyncEvent::TaskRemoved(id.clone()));
        Ok(())
    }

    async fn set_loading(&self, loading: bool) {
        self.store.lock().await.set_loading(loading);
        let _ = self.events.send(SyncEvent::LoadingChanged(loading));
    }

    async fn begin_mutation(&self, op: Operation, id: &TaskId) -> Result<(), SyncError> {
        let mut inflight = self.inflight_mutations.lock().await;
        if !inflight.insert((op, id.clone())) {
            info!(%op, %id, "mutation already in flight; dropping duplicate trigger");
            return Err(SyncError::MutationInFlight { op, id: id.clone() });
        }
        Ok(())
    }

    async fn finish_mutation(&self, op: Operation, id: &TaskId) {
        self.inflight_mutations
            .lock()
            .await
            .remove(&(op, id.clone()));
    }

    fn report_failure(&self, op: Operation, source: reqwest::Error) -> SyncError {
        warn!(%op, error = %source, "task service round trip failed; local list left untouched");
        let _ = self.events.send(SyncEvent::OperationFailed {
            op,
            message: source.to_string(),
        });
        SyncError::Request { op, source }
    }

    async fn fetch_list(&self) -> Result<Vec<Task>, reqwest::Error> {
        self.http
            .get(format!("{}/todos", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    async fn post_create(&self, title: String) -> Result<Task, reqwest::Error> {
        self.http
            .post(format!("{}/todos", self.base_url))
            .json(&CreateTaskRequest { title })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    async fn put_toggle(&self, id: &TaskId) -> Result<Option<Task>, reqwest::Error> {
        let response = self
            .http
            .put(format!("{}/todos/{}", self.base_url, id))
            .send()
            .await?
            .error_for_status()?;
        // The contract only promises a 2xx here; when the service echoes the
        // updated task, the echoed completion wins over a locally computed flip.
        Ok(response.json::<Task>().await.ok())
    }

    async fn send_delete(&self, id: &TaskId) -> Result<(), reqwest::Error> {
        self.http
            .delete(format!("{}/todos/{}", self.base_url, id))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
