//! HTTP adapter for Chatline
//!
//! Bearer-token sessions over the core `ChatService`, plus a server-sent
//! events endpoint for live alerts.

pub mod api;
pub mod error;
pub mod handlers;
pub mod server;
pub mod session;
pub mod state;
pub mod types;

pub use api::build_router;
pub use error::{ApiError, ApiResult};
pub use server::ApiServer;
pub use state::{AppState, StreamSettings};
