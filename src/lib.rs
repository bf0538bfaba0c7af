pub mod application {
    pub mod auth_service;
    pub mod normalizer;
    pub mod prediction_service;
    pub mod upload_service;
}

pub mod data {
    pub mod memory;
    pub mod sqlite;
    pub mod user_repository;
}

pub mod domain {
    pub mod error;
    pub mod models;
    pub mod repository;
    pub mod user;
}

pub mod infrastructure {
    pub mod classifier;
    pub mod config;
    pub mod image_model;
    pub mod logging;
    pub mod model_store;
    pub mod scaler;
    pub mod security;
}

pub mod presentation {
    pub mod auth;
    pub mod handlers;
    pub mod middleware;
    pub mod routes;
    pub mod upload;
}
