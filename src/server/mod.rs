mod auth_routes;
pub mod config;
mod content_routes;
pub mod error;
mod http_layers;
pub mod metrics;
mod search_routes;
#[allow(clippy::module_inception)]
pub mod server;
pub mod session;
pub mod state;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
pub use state::ServerState;
