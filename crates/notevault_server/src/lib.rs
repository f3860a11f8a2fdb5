//! HTTP surface for notevault.
//!
//! Thin transport over `notevault_core`: every handler validates input,
//! delegates to the note service, and maps service errors to status codes.

pub mod config;
mod extract;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{ConfigError, ServerConfig};
pub use routes::create_router;
pub use server::{NoteServer, ServerError};
pub use state::{AppState, CallError};
