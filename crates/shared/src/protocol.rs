use serde::{Deserialize, Serialize};

/// Body of the create call, the only request body in the service contract.
/// The service assigns the id and returns the full task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
}
