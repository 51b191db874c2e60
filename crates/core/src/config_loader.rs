use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

use crate::config::AgentConfig;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads agent configuration by merging a TOML file with `ODTE_`-prefixed
    /// environment variables. Missing files fall through to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or if a
    /// merged value has the wrong type.
    pub fn load(path: &str) -> Result<AgentConfig> {
        let config: AgentConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("ODTE_"))
            .extract()?;

        Ok(config)
    }
}
