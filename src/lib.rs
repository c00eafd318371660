//! Library catalog server
//!
//! REST JSON API over books, authors, genres and readers. Every mutable
//! entity carries a version; updates name the version they were based on
//! and are rejected when it is stale.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    pub fn new(config: AppConfig, repository: repository::Repository) -> Self {
        let services = services::Services::new(repository, config.readers.clone());
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
