//! CLI command implementations.

pub mod campaign;
pub mod config;
pub mod serve;
pub mod turn;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use hinge_engine::{FileCampaignStore, TurnError, TurnOrchestrator};

use crate::config::Config;

/// The on-disk store and an orchestrator over it.
pub struct Session {
    pub store: Arc<FileCampaignStore>,
    pub orchestrator: TurnOrchestrator,
}

impl Session {
    pub fn open(config: &Config) -> Result<Self> {
        let store = Arc::new(FileCampaignStore::new(&config.data_dir));
        let orchestrator = TurnOrchestrator::new(store.clone(), config.engine()?);
        Ok(Self {
            store,
            orchestrator,
        })
    }
}

/// Attach the stable error code so scripts can match on it.
pub fn turn_error(err: TurnError) -> anyhow::Error {
    anyhow!("{}: {}", err.code(), err)
}
