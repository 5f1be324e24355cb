// Library root
// -----------
// Client for the Labor time-tracking API. The binary (`main.rs`) drives
// these modules from an interactive menu.
//
// Module responsibilities:
// - `api`: authenticated HTTP access layer (headers, reauth detection,
//   credential rotation, JSON decoding).
// - `session`: the shared credential context handed to every client.
// - `config`: the on-disk config file holding the credentials.
// - `commands`: typed calls to the endpoints the CLI uses.
// - `ui`: terminal flows built on top of `commands`.
pub mod api;
pub mod commands;
pub mod config;
pub mod session;
pub mod ui;

pub use api::{ApiClient, ApiError, ApiResponse, BusinessError, Payload, Resource};
pub use config::{Config, ConfigError, ConfigPatch, ConfigStore, Credentials};
pub use session::Session;
