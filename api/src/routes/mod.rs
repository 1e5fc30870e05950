pub mod alerts;
pub mod forecast;
pub mod health;
pub mod scheduler;
pub mod summaries;
pub mod weather;

use crate::services::openweather::SharedProvider;
use crate::services::store::SharedStore;

/// Shared application state for the query endpoints.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub provider: SharedProvider,
}
