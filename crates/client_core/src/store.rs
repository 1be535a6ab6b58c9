use shared::domain::{Task, TaskId};

/// The task list as last confirmed by the server, plus the flag raised while
/// the initial full-list fetch is outstanding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListState {
    pub tasks: Vec<Task>,
    pub loading: bool,
}

/// Owned, single-writer holder of [`TaskListState`].
///
/// No network awareness: the sync controller is the only caller of the
/// mutation operations, and the rendering layer reads through the accessors.
/// Every mutation is synchronous and leaves the list unique by id.
#[derive(Debug, Default)]
pub struct TaskStore {
    state: TaskListState,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TaskListState {
        &self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        self.state.tasks.iter().find(|task| &task.id == id)
    }

    /// Replaces the whole list with the server-returned sequence, verbatim.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.state.tasks = tasks;
    }

    /// Appends a confirmed new task at the end. Appending an id that is
    /// already present is a programming error, not a user-facing fault.
    pub fn append(&mut self, task: Task) {
        debug_assert!(
            self.find(&task.id).is_none(),
            "duplicate task id {}",
            task.id
        );
        self.state.tasks.push(task);
    }

    /// Sets the completion flag for `id`. Unknown ids are ignored.
    pub fn update_completion(&mut self, id: &TaskId, completed: bool) {
        if let Some(task) = self.state.tasks.iter_mut().find(|task| &task.id == id) {
            task.completed = completed;
        }
    }

    /// Removes `id` in place; the remaining tasks keep their order. Unknown
    /// ids are ignored.
    pub fn remove(&mut self, id: &TaskId) {
        self.state.tasks.retain(|task| &task.id != id);
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.state.loading = loading;
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
