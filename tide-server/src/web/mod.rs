//! Web layer for the tide calendar server.
//!
//! Provides HTTP endpoints for station search and calendar downloads.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
