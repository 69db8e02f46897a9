pub mod app;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod service;
pub mod store;

pub use app::{build_router, AppState};
