//! Application wiring for the fixbridge pipeline.
//!
//! Constructs the stores, intake buffer, session gate, transport and hub,
//! spawns the three schedulers and the ingest task on a shared cancellation
//! token, serves the API, and shuts the whole pipeline down on Ctrl-C.

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, Pipeline};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
