//! HTTP server layer
//!
//! Wires the request-plane core into actix-web: shared state, the
//! request-id and auth/admission middleware, and the proxy-plane routes.

pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{build_state, configure_routes, run};
pub use state::AppState;
