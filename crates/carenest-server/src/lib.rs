//! HTTP surface of the carenest wellness API.

pub mod analytics;
pub mod bootstrap;
pub mod config;
pub mod extract;
pub mod middleware;
pub mod observability;
pub mod reminders;
pub mod search;
pub mod server;
pub mod services;
pub mod state;
pub mod validation;

pub use config::AppConfig;
pub use observability::{init_tracing, shutdown_tracing};
pub use server::{CarenestServer, ServerBuilder, build_app, build_router, build_state};
pub use state::AppState;
