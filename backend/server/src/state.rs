use std::sync::Arc;

use super::{config::Config, database::Store, pairing::Matchmaker};

pub struct AppState {
    pub config: Config,
    pub matchmaker: Arc<Matchmaker>,
    pub store: Store,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let matchmaker = Matchmaker::new(config.fallback.clone());
        let store = Store::new(config.log_retention_days);

        Arc::new(Self {
            config,
            matchmaker,
            store,
        })
    }
}
