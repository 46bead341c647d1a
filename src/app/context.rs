use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::app::error::Result;
use crate::browser::{BrowserFactory, ChromeFactory};
use crate::config::Config;
use crate::harvester::Harvester;
use crate::lesson::Credentials;
use crate::video::{Blacklist, SessionRegistry, ValidityGate};

pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub gate: Arc<ValidityGate>,
    pub registry: Arc<SessionRegistry>,
    pub factory: Arc<dyn BrowserFactory>,
}

impl AppContext {
    /// Wire the gate, registry and Chrome factory for `config`.
    pub fn new(config: Config, config_path: PathBuf) -> Result<Self> {
        let factory: Arc<dyn BrowserFactory> = Arc::new(ChromeFactory::new(config.browser.clone()));
        Self::with_parts(config, config_path, factory)
    }

    pub fn with_parts(
        config: Config,
        config_path: PathBuf,
        factory: Arc<dyn BrowserFactory>,
    ) -> Result<Self> {
        let blacklist = Self::build_blacklist(&config)?;
        let gate = Arc::new(
            ValidityGate::new(blacklist).with_min_url_length(config.extraction.min_url_length),
        );

        Ok(Self {
            config,
            config_path,
            gate,
            registry: Arc::new(SessionRegistry::new()),
            factory,
        })
    }

    /// Built-in IDs, then `[blacklist] ids`, then the persisted file.
    fn build_blacklist(config: &Config) -> Result<Blacklist> {
        let mut blacklist = Blacklist::with_defaults();
        blacklist.extend(config.blacklist.ids.iter().cloned());
        let path = config.blacklist_path()?;
        let loaded = blacklist.load_file(&path)?;
        debug!(total = blacklist.len(), persisted = loaded, "Blacklist ready");
        Ok(blacklist)
    }

    pub fn blacklist_path(&self) -> Result<PathBuf> {
        Ok(self.config.blacklist_path()?)
    }

    pub fn harvester(&self, credentials: Option<Credentials>) -> Harvester {
        Harvester::new(
            &self.config,
            self.factory.clone(),
            self.gate.clone(),
            self.registry.clone(),
        )
        .with_credentials(credentials)
    }
}
