pub mod api {
    pub mod handler {
        pub mod account_handler;
        pub mod health_handler;
        pub mod post_handler;
    }
    pub mod model;
    pub mod openapi;
    pub mod routes;
}
pub mod config;
pub mod db {
    pub mod entity;
    pub mod pool;
    pub mod repo;
}
pub mod error;
pub mod middleware;
pub mod service;
pub mod util;

// Re-export AppState for convenience
pub use crate::config::app_config::AppState;
