//! Application state for the web layer.

use std::sync::Arc;

use crate::render::Renderer;
use crate::service::TideCalendarService;

/// Shared application state.
pub struct AppState<R> {
    /// Calendar pipeline, directory and cache
    pub service: Arc<TideCalendarService<R>>,
}

impl<R: Renderer> AppState<R> {
    pub fn new(service: Arc<TideCalendarService<R>>) -> Self {
        Self { service }
    }
}

// Derived Clone would require R: Clone
impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}
