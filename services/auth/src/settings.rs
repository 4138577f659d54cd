//! Service settings loaded from `KITABGHAR_*` environment variables

use anyhow::Result;
use config::{Config, Environment};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSettings {
    /// Address the HTTP server listens on
    pub bind_address: String,
}

impl ServiceSettings {
    /// # Environment Variables
    /// - `KITABGHAR_AUTH_BIND_ADDRESS` (default: "0.0.0.0:3000")
    pub fn from_env() -> Result<Self> {
        let settings = Config::builder()
            .set_default("bind_address", "0.0.0.0:3000")?
            .add_source(Environment::with_prefix("KITABGHAR_AUTH"))
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }
}
