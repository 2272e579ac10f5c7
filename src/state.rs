use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{EventDirectory, ReservationManager};

/// Shared handler state. Cheap to clone; everything inside is reference
/// counted.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub events: EventDirectory,
    pub reservations: ReservationManager,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        let events = EventDirectory::new(store.clone());
        let reservations = ReservationManager::new(store.clone(), config.payment_return_url.clone());
        Self {
            config: Arc::new(config),
            store,
            events,
            reservations,
        }
    }
}
