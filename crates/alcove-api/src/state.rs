use std::sync::Arc;

use alcove_store::Store;

use crate::auth::{PlainEquality, SecretCheck, admin_token};
use crate::config::Config;

pub type AppState = Arc<AppStateInner>;

/// Shared, read-only state for every handler.
pub struct AppStateInner {
    pub config: Config,
    pub store: Store,
    pub secret_check: Box<dyn SecretCheck>,
    /// Value of the admin capability cookie, derived from the secret.
    pub admin_token: String,
}

impl AppStateInner {
    pub fn new(config: Config, store: Store) -> anyhow::Result<AppState> {
        Self::with_secret_check(config, store, Box::new(PlainEquality))
    }

    pub fn with_secret_check(
        config: Config,
        store: Store,
        secret_check: Box<dyn SecretCheck>,
    ) -> anyhow::Result<AppState> {
        let admin_token = admin_token(&config.admin_secret)?;
        Ok(Arc::new(Self {
            config,
            store,
            secret_check,
            admin_token,
        }))
    }
}
