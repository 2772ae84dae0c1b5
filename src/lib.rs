// src/lib.rs

use sea_orm::DatabaseConnection;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
}

pub mod entities {
    pub mod prelude;

    pub mod alerts;
    pub mod tvl_points;
}

pub mod services {
    pub mod tvl_store;
    pub mod vault_reader;
    pub mod vault_watcher;
}

pub mod handlers;
pub mod jobs;
pub mod models;
