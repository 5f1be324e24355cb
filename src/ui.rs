// UI layer: interactive menu using `dialoguer`, with an `indicatif`
// spinner while a request is in flight.

use crate::api::{ApiClient, ApiError, ApiResponse};
use crate::commands::{self, Task};
use crate::session::Session;
use anyhow::Result;
use dialoguer::{Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub const NOT_LOGGED_IN: &str = "You need to be logged in order to execute this action.";

/// How a finished request is reported back to the menu.
#[derive(Debug, PartialEq)]
pub enum Outcome<T> {
    Done(T),
    /// The call failed; the menu prints the message and carries on.
    Failed(String),
    /// The stored session is stale and the user has to log in again.
    Reauth,
}

impl<T> From<Result<ApiResponse<T>, ApiError>> for Outcome<T> {
    fn from(res: Result<ApiResponse<T>, ApiError>) -> Self {
        match res {
            Ok(ApiResponse::Success(value)) => Outcome::Done(value),
            Ok(ApiResponse::Failure(err)) => Outcome::Failed(err.to_string()),
            Err(ApiError::ReauthRequired) => Outcome::Reauth,
            Err(err) => Outcome::Failed(err.to_string()),
        }
    }
}

/// Message to show instead of running a command that needs a session.
pub fn login_gate(session: &Session) -> Option<&'static str> {
    if session.is_logged_in() {
        None
    } else {
        Some(NOT_LOGGED_IN)
    }
}

/// Main interactive menu. Runs until the user chooses "Exit".
pub fn main_menu(api: &ApiClient) -> Result<()> {
    loop {
        let items = vec![
            "Login",
            "Who am I",
            "Start task",
            "Stop task",
            "Current task",
            "Logout",
            "Exit",
        ];
        let selection = Select::new().items(&items).default(0).interact()?;
        match selection {
            0 => handle_login(api)?,
            1 => {
                if let Some(user) = authenticated(api, "Checking session...", commands::whoami)? {
                    println!("Logged in as {}", user.data.email);
                }
            }
            2 => {
                if !require_login(api) {
                    continue;
                }
                let description: String =
                    Input::new().with_prompt("Task description").interact_text()?;
                let started = authenticated(api, "Starting task...", |api| {
                    commands::start_task(api, &description)
                })?;
                if let Some(envelope) = started {
                    print_task("Started task", envelope.task.as_ref());
                }
            }
            3 => {
                if let Some(envelope) = authenticated(api, "Stopping task...", commands::stop_task)? {
                    print_task("Stopped task", envelope.task.as_ref());
                }
            }
            4 => {
                if let Some(envelope) =
                    authenticated(api, "Fetching current task...", commands::current_task)?
                {
                    print_task("Current task", envelope.task.as_ref());
                }
            }
            5 => match commands::logout(api) {
                Ok(()) => println!("Logged out."),
                Err(e) => println!("Logout failed: {}", e),
            },
            6 => break,
            _ => {}
        }
    }
    Ok(())
}

/// Prompt for credentials and sign in. Only terminal I/O errors bubble up;
/// request failures are printed and the menu continues.
fn handle_login(api: &ApiClient) -> Result<()> {
    let email: String = Input::new().with_prompt("Email").interact_text()?;
    let password: String = Password::new().with_prompt("Password").interact()?;

    let spinner = spinner("Logging in...");
    let res = commands::login(api, &email, &password);
    spinner.finish_and_clear();

    match Outcome::from(res) {
        Outcome::Done(envelope) => println!("Welcome {}!", envelope.data.email),
        Outcome::Failed(msg) => println!("Login failed: {}", msg),
        Outcome::Reauth => println!("Login failed: invalid credentials"),
    }
    Ok(())
}

fn require_login(api: &ApiClient) -> bool {
    match login_gate(api.session()) {
        None => true,
        Some(msg) => {
            println!("{}", msg);
            false
        }
    }
}

/// Run a call that needs a session. Returns `None` when the user is not
/// logged in, the call failed, or the session expired (in which case the
/// login flow runs).
fn authenticated<T>(
    api: &ApiClient,
    message: &str,
    call: impl FnOnce(&ApiClient) -> Result<ApiResponse<T>, ApiError>,
) -> Result<Option<T>> {
    if !require_login(api) {
        return Ok(None);
    }

    let spinner = spinner(message);
    let res = call(api);
    spinner.finish_and_clear();

    match Outcome::from(res) {
        Outcome::Done(value) => Ok(Some(value)),
        Outcome::Failed(msg) => {
            println!("Request failed: {}", msg);
            Ok(None)
        }
        Outcome::Reauth => {
            println!("Your session has expired. Please log in again.");
            handle_login(api)?;
            Ok(None)
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_task(label: &str, task: Option<&Task>) {
    match task {
        Some(task) => {
            let since = task.started_at.as_deref().unwrap_or("unknown");
            println!("{}: {} (since {})", label, task.description, since);
        }
        None => println!("No task running."),
    }
}
