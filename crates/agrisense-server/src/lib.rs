//! AgriSense HTTP server: axum routes over the recommendation pipeline.

pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
