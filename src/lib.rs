pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod utils;

use std::sync::Arc;

use crate::services::bridge_platform::BridgePlatform;
use crate::session::SessionHandle;

#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
    pub bridge: Arc<BridgePlatform>,
}

impl AppState {
    pub fn new(session: SessionHandle, bridge: Arc<BridgePlatform>) -> Self {
        Self { session, bridge }
    }
}
