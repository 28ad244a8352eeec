pub mod api;
pub mod app;
pub mod auth;
pub mod chainage;
pub mod config;
pub mod db;
pub mod device;
pub mod internal_api;
pub mod model;

pub use app::{build_router, AppState};
pub use config::AppConfig;
