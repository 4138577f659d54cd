//! Service settings loaded from `KITABGHAR_*` environment variables

use anyhow::Result;
use config::{Config, Environment};
use serde::Deserialize;

use crate::ledger::DEFAULT_LOAN_PERIOD_DAYS;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSettings {
    /// Address the HTTP server listens on
    pub bind_address: String,
    /// Root directory for covers and PDF files
    pub upload_dir: String,
    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,
    pub loan_period_days: i64,
}

impl ServiceSettings {
    /// # Environment Variables
    /// - `KITABGHAR_BIND_ADDRESS` (default: "0.0.0.0:3001")
    /// - `KITABGHAR_UPLOAD_DIR` (default: "./uploads")
    /// - `KITABGHAR_MAX_UPLOAD_BYTES` (default: 50 MiB)
    /// - `KITABGHAR_LOAN_PERIOD_DAYS` (default: 14)
    pub fn from_env() -> Result<Self> {
        let settings: ServiceSettings = Config::builder()
            .set_default("bind_address", "0.0.0.0:3001")?
            .set_default("upload_dir", "./uploads")?
            .set_default("max_upload_bytes", 50 * 1024 * 1024)?
            .set_default("loan_period_days", DEFAULT_LOAN_PERIOD_DAYS)?
            .add_source(Environment::with_prefix("KITABGHAR").try_parsing(true))
            .build()?
            .try_deserialize()?;

        if settings.loan_period_days < 1 {
            anyhow::bail!("KITABGHAR_LOAN_PERIOD_DAYS must be at least 1");
        }

        Ok(settings)
    }
}
