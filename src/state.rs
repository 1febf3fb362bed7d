use crate::config::Config;
use crate::websocket::ChatRegistry;
use sqlx::{Pool, Postgres};
use std::sync::Arc;

/// Shared per-process handles, constructed once in `main` and passed
/// into every handler. The fan-out registry travels here rather than
/// through a global, so an uninitialized registry cannot be observed.
#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Postgres>,
    pub registry: ChatRegistry,
    pub config: Arc<Config>,
}
