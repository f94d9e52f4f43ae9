pub mod app;
pub mod config;
pub mod handlers;
pub mod validation;

pub use crate::app::{build_gate, build_router, AppState};
pub use crate::config::ServiceConfig;
