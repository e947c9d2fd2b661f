//! Network-backed metadata lookup for the synchronous core.

use anyhow::{Context, Result};
use wt_core::{DurationLookup, LookupError, TitleInfo, TitleKey};
use wt_meta::Client;

use crate::Config;

/// Fetches title pages one at a time on a private runtime.
pub struct RemoteLookup {
    client: Client,
    runtime: tokio::runtime::Runtime,
}

impl RemoteLookup {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::new(config.site_base_url.clone(), &config.user_agent)
            .context("failed to create metadata client")?;
        let runtime =
            tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
        Ok(Self { client, runtime })
    }
}

impl DurationLookup for RemoteLookup {
    fn lookup(&self, key: &TitleKey) -> Result<TitleInfo, LookupError> {
        self.runtime
            .block_on(self.client.fetch_title_info(key))
            .map_err(|err| LookupError::failed(key, err))
    }
}
