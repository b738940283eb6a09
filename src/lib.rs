pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;

use std::sync::Arc;

use crate::services::push::registry::ChannelRegistry;
use crate::services::timeout::TimeoutChecker;
use crate::storage::UserStorage;
use reqwest::Client;

#[derive(Clone)]
pub struct AppState {
    pub storage: UserStorage,
    pub checker: Arc<TimeoutChecker>,
}

impl AppState {
    pub fn new(storage: UserStorage) -> Self {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client for push channels");

        let registry = Arc::new(ChannelRegistry::with_builtin(http_client));
        let checker = Arc::new(TimeoutChecker::new(registry));

        Self { storage, checker }
    }
}
