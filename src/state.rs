use anyhow::{Context, Result};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

use crate::accounts::AccountStore;
use crate::client::{HttpClient, UpstreamLabels};
use crate::config::Configuration;

/// Shared application state handed to every handler.
pub(crate) struct UiState {
    pub config: Configuration,
    pub client: HttpClient,
    pub accounts: Option<AccountStore>,
    pub metrics: Registry,
}

impl UiState {
    pub async fn new(config: Configuration) -> Result<Self> {
        let mut metrics = Registry::with_prefix("registry_ui");

        let upstream_requests = Family::<UpstreamLabels, Counter>::default();
        metrics.register(
            "upstream_requests",
            "Requests issued to the registry and scanner",
            upstream_requests.clone(),
        );

        let client = HttpClient::new(upstream_requests)?;

        let accounts = config
            .accounts
            .as_ref()
            .map(|accounts| AccountStore::new(accounts.path.clone()));

        // Account management with an unreadable document is a startup error,
        // not something to discover on the first mutation.
        if let Some(store) = &accounts {
            store
                .load()
                .await
                .context("Failed to read the account file")?;
        }

        Ok(Self {
            config,
            client,
            accounts,
            metrics,
        })
    }
}
