// Typed wrappers around the endpoints the CLI uses. Each call creates a
// fresh resource right before the request so it carries the most
// recently rotated credentials.

use crate::api::{ApiClient, ApiError, ApiResponse, Payload};
use serde::Deserialize;
use serde_json::Value;

/// User record returned by the auth endpoints.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Value,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Envelope of `auth/sign_in` and `auth/validate_token`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct UserEnvelope {
    pub data: User,
}

/// A tracked task.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Value,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
}

/// Envelope of the task endpoints. `task` is null when nothing is running.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TaskEnvelope {
    #[serde(default)]
    pub task: Option<Task>,
}

fn payload<const N: usize>(entries: [(&str, Value); N]) -> Payload {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Sign in with email and password. The access layer stores the
/// credentials returned in the response headers.
pub fn login(api: &ApiClient, email: &str, password: &str) -> Result<ApiResponse<UserEnvelope>, ApiError> {
    let body = payload([("email", email.into()), ("password", password.into())]);
    api.resource("/auth/sign_in").post(Some(&body))
}

/// Check the stored session and return its user.
pub fn whoami(api: &ApiClient) -> Result<ApiResponse<UserEnvelope>, ApiError> {
    api.resource("/auth/validate_token").get(None)
}

pub fn start_task(api: &ApiClient, description: &str) -> Result<ApiResponse<TaskEnvelope>, ApiError> {
    let body = payload([("description", description.into())]);
    api.resource("/tasks/start").post(Some(&body))
}

pub fn stop_task(api: &ApiClient) -> Result<ApiResponse<TaskEnvelope>, ApiError> {
    api.resource("/tasks/stop").post(None)
}

pub fn current_task(api: &ApiClient) -> Result<ApiResponse<TaskEnvelope>, ApiError> {
    api.resource("/tasks/current").get(None)
}

/// Forget the stored credentials. Purely local.
pub fn logout(api: &ApiClient) -> Result<(), ApiError> {
    api.session().clear()?;
    Ok(())
}
