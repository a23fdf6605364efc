use std::{sync::Arc, time::Instant};

use super::{config::Config, database::Database};

pub struct AppState {
    pub config: Config,
    pub database: Database,
    pub started: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let database = Database::new(config.database.clone());

        Arc::new(Self {
            config,
            database,
            started: Instant::now(),
        })
    }

    pub fn uptime(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}
