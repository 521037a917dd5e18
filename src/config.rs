use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::service::retry::RetryPolicy;

/// Runtime configuration. Every field can be overridden by a `SUMMARY_`-prefixed
/// environment variable, e.g. `SUMMARY_DATABASE_URL`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub loglevel: String,
    pub listen_addr: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_max_lifetime_secs: u64,
    pub external_url: Url,
    pub proxy: Option<Url>,
    pub connect_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub sync_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loglevel: "info".to_string(),
            listen_addr: "0.0.0.0:8080".to_string(),
            database_url: "sqlite://summary.sqlite".to_string(),
            db_max_connections: 5,
            db_max_lifetime_secs: 30 * 60,
            external_url: Url::parse("http://127.0.0.1:8000/summarypostgres")
                .expect("default external url is valid"),
            proxy: None,
            connect_timeout_secs: 5,
            fetch_timeout_secs: 5,
            retries: 3,
            retry_delay_ms: 500,
            sync_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed("SUMMARY_"))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, Duration::from_millis(self.retry_delay_ms))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout_secs)
    }

    pub fn db_max_lifetime(&self) -> Duration {
        Duration::from_secs(self.db_max_lifetime_secs)
    }
}
